use crate::errors::TrackerError;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, error};

pub const SCHEMA_VERSION: u32 = 1;
const VERSION_FIELD: &str = "version";

/// Unreadable snapshots load as `T::default()`; only I/O failures are errors.
pub trait Store<T>: Send + Sync {
    /// Highest snapshot version this store reads and the version it writes.
    const SCHEMA_VERSION: u32;

    fn load(&self) -> impl Future<Output = Result<T, TrackerError>> + Send;

    fn save(&self, value: &T) -> impl Future<Output = Result<(), TrackerError>> + Send;
}

/// Decodes a snapshot, falling back to `T::default()` on anything unreadable.
pub fn decode_snapshot<T>(bytes: &[u8], supported: u32) -> T
where
    T: DeserializeOwned + Default,
{
    match try_decode(bytes, supported) {
        Ok(value) => value,
        Err(err) => {
            error!("discarding unreadable snapshot: {err}");
            T::default()
        }
    }
}

fn try_decode<T: DeserializeOwned>(bytes: &[u8], supported: u32) -> Result<T, TrackerError> {
    let mut document: Value = serde_json::from_slice(bytes)?;
    let Some(object) = document.as_object_mut() else {
        return Err(TrackerError::Parse("snapshot is not a JSON object".into()));
    };

    // unversioned documents predate the envelope and share the v1 layout
    let version = match object.remove(VERSION_FIELD) {
        None | Some(Value::Null) => 0,
        Some(raw) => raw
            .as_u64()
            .and_then(|value| u32::try_from(value).ok())
            .ok_or_else(|| TrackerError::Parse(format!("invalid snapshot version {raw}")))?,
    };
    if version > supported {
        return Err(TrackerError::Parse(format!(
            "snapshot version {version} is newer than supported version {supported}"
        )));
    }

    Ok(serde_json::from_value(document)?)
}

pub fn encode_snapshot<T: Serialize>(value: &T, version: u32) -> Result<Vec<u8>, TrackerError> {
    let mut document = serde_json::to_value(value)?;
    let Some(object) = document.as_object_mut() else {
        return Err(TrackerError::Parse("snapshot must serialize to a JSON object".into()));
    };
    object.insert(VERSION_FIELD.to_string(), Value::from(version));
    Ok(serde_json::to_vec_pretty(&document)?)
}

/// Snapshot kept in a JSON file on disk.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `<dir>/<key>.json`
    pub fn for_key(dir: &Path, key: &str) -> Self {
        Self::new(dir.join(format!("{key}.json")))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl<T> Store<T> for JsonFileStore
where
    T: Serialize + DeserializeOwned + Default + Send + Sync,
{
    const SCHEMA_VERSION: u32 = SCHEMA_VERSION;

    async fn load(&self) -> Result<T, TrackerError> {
        match fs::read(&self.path).await {
            Ok(bytes) => Ok(decode_snapshot(&bytes, <Self as Store<T>>::SCHEMA_VERSION)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                debug!("no snapshot at {}", self.path.display());
                Ok(T::default())
            }
            Err(err) => {
                error!("failed to read snapshot {}: {err}", self.path.display());
                Err(err.into())
            }
        }
    }

    async fn save(&self, value: &T) -> Result<(), TrackerError> {
        let payload = encode_snapshot(value, <Self as Store<T>>::SCHEMA_VERSION)?;
        fs::write(&self.path, payload).await?;
        Ok(())
    }
}

/// Snapshot kept in memory as encoded bytes. Clones share the same slot.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    contents: Arc<Mutex<Option<Vec<u8>>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_contents(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            contents: Arc::new(Mutex::new(Some(bytes.into()))),
        }
    }

    pub async fn contents(&self) -> Option<Vec<u8>> {
        self.contents.lock().await.clone()
    }
}

impl<T> Store<T> for MemoryStore
where
    T: Serialize + DeserializeOwned + Default + Send + Sync,
{
    const SCHEMA_VERSION: u32 = SCHEMA_VERSION;

    async fn load(&self) -> Result<T, TrackerError> {
        Ok(match self.contents.lock().await.as_deref() {
            Some(bytes) => decode_snapshot(bytes, <Self as Store<T>>::SCHEMA_VERSION),
            None => T::default(),
        })
    }

    async fn save(&self, value: &T) -> Result<(), TrackerError> {
        let payload = encode_snapshot(value, <Self as Store<T>>::SCHEMA_VERSION)?;
        *self.contents.lock().await = Some(payload);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EventId, EventRecord, PendingSync, TrackerSettings, TrackerSnapshot};
    use serde::Deserialize;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
    struct Mood {
        mood: Option<String>,
        tags: Vec<String>,
    }

    async fn load_snapshot<S: Store<TrackerSnapshot<Mood>>>(store: &S) -> TrackerSnapshot<Mood> {
        store.load().await.unwrap()
    }

    fn snapshot(count: usize) -> TrackerSnapshot<Mood> {
        TrackerSnapshot {
            events: (0..count)
                .map(|i| EventRecord {
                    id: format!("rec-{i}").into(),
                    timestamp: Some(1_717_200_000_123 + i as i64 * 86_400_000),
                    amount: (i % 2 == 0).then(|| 0.1 + i as f64 / 3.0),
                    metadata: Mood {
                        mood: Some(format!("mood {i}")),
                        tags: vec!["a".into(), format!("t{i}")],
                    },
                })
                .collect(),
            settings: TrackerSettings { goal: Some(2500.5) },
            pending: PendingSync {
                updated: (0..count).take(1).map(|i| EventId::from(format!("rec-{i}"))).collect(),
                ..PendingSync::default()
            },
        }
    }

    #[tokio::test]
    async fn snapshots_round_trip_without_loss() {
        for count in [0, 1, 7] {
            let store = MemoryStore::new();
            let original = snapshot(count);
            store.save(&original).await.unwrap();
            let loaded = load_snapshot(&store).await;
            assert_eq!(loaded, original);
        }
    }

    #[tokio::test]
    async fn saved_snapshot_carries_version() {
        let store = MemoryStore::new();
        store.save(&snapshot(1)).await.unwrap();
        let document: Value = serde_json::from_slice(&store.contents().await.unwrap()).unwrap();
        assert_eq!(
            document["version"],
            <MemoryStore as Store<TrackerSnapshot<Mood>>>::SCHEMA_VERSION
        );
        assert!(document["events"].is_array());
    }

    #[tokio::test]
    async fn corrupt_snapshot_is_treated_as_empty() {
        let store = MemoryStore::with_contents("{ not json");
        let loaded = load_snapshot(&store).await;
        assert_eq!(loaded, TrackerSnapshot::default());

        let store = MemoryStore::with_contents("[1, 2, 3]");
        let loaded = load_snapshot(&store).await;
        assert!(loaded.events.is_empty());
    }

    #[tokio::test]
    async fn newer_snapshot_version_is_not_read() {
        let store = MemoryStore::with_contents(r#"{"version": 99, "events": [{"id": "x", "timestamp": 1}]}"#);
        let loaded = load_snapshot(&store).await;
        assert!(loaded.events.is_empty());
    }

    #[tokio::test]
    async fn unversioned_snapshot_is_read() {
        let store = MemoryStore::with_contents(
            r#"{"events": [{"id": "x", "timestamp": 1717200000000, "amount": 250}], "settings": {"goal": 2000}}"#,
        );
        let loaded = load_snapshot(&store).await;
        assert_eq!(loaded.events.len(), 1);
        assert_eq!(loaded.events[0].amount, Some(250.0));
        assert_eq!(loaded.settings.goal, Some(2000.0));
    }

    #[tokio::test]
    async fn file_store_round_trips_and_tolerates_missing_file() {
        let dir = std::env::temp_dir().join(format!(
            "daily_dashboard_store_{}_{}",
            std::process::id(),
            ulid::Ulid::new()
        ));
        std::fs::create_dir_all(&dir).unwrap();
        let store = JsonFileStore::for_key(&dir, "water");
        assert_eq!(store.path(), dir.join("water.json"));

        let empty = load_snapshot(&store).await;
        assert!(empty.events.is_empty());

        let original = snapshot(3);
        store.save(&original).await.unwrap();
        let loaded = load_snapshot(&store).await;
        assert_eq!(loaded, original);

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
