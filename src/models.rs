use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use ulid::Ulid;

/// Opaque record identifier. Locally created records get a ULID; records that
/// come from the remote keep whatever id the backend assigned.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(String);

impl EventId {
    pub fn generate() -> Self {
        Self(Ulid::new().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for EventId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for EventId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One timestamped user action. `timestamp` is milliseconds since the Unix
/// epoch and may be missing in imported data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord<M> {
    pub id: EventId,
    #[serde(default)]
    pub timestamp: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,
    #[serde(default, bound(deserialize = "M: Deserialize<'de> + Default"))]
    pub metadata: M,
}

impl<M> EventRecord<M> {
    pub fn new(at: DateTime<Utc>, amount: Option<f64>, metadata: M) -> Self {
        Self {
            id: EventId::generate(),
            timestamp: Some(at.timestamp_millis()),
            amount,
            metadata,
        }
    }

    /// `None` when the timestamp is missing or outside the representable range.
    pub fn instant(&self) -> Option<DateTime<Utc>> {
        self.timestamp.and_then(DateTime::from_timestamp_millis)
    }
}

/// All records that fall on one local calendar day.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DayBucket<M> {
    pub date: NaiveDate,
    pub records: Vec<EventRecord<M>>,
    pub total: f64,
}

impl<M> DayBucket<M> {
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date,
            records: Vec::new(),
            total: 0.0,
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct StreakState {
    pub current_streak: u32,
    pub anchor_date: Option<NaiveDate>,
    pub capped: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GoalProgress {
    pub goal_amount: f64,
    pub current_amount: f64,
    pub percentage: u8,
    pub remaining: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct TrackerSettings {
    #[serde(default)]
    pub goal: Option<f64>,
}

/// Local changes the remote has not acknowledged yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct PendingSync {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub created: Vec<EventId>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub updated: Vec<EventId>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub deleted: Vec<EventId>,
}

impl PendingSync {
    pub fn is_empty(&self) -> bool {
        self.created.is_empty() && self.updated.is_empty() && self.deleted.is_empty()
    }

    pub fn is_unsynced_create(&self, id: &EventId) -> bool {
        self.created.contains(id)
    }

    pub fn record_create(&mut self, id: &EventId) {
        if !self.created.contains(id) {
            self.created.push(id.clone());
        }
    }

    /// An unsynced create already carries the latest version of the record.
    pub fn record_update(&mut self, id: &EventId) {
        if !self.created.contains(id) && !self.updated.contains(id) {
            self.updated.push(id.clone());
        }
    }

    pub fn record_delete(&mut self, id: &EventId) {
        if !self.deleted.contains(id) {
            self.deleted.push(id.clone());
        }
    }

    pub fn settle_update(&mut self, id: &EventId) {
        self.updated.retain(|pending| pending != id);
    }

    // true when the record never reached the remote
    pub fn forget(&mut self, id: &EventId) -> bool {
        let before = self.created.len();
        self.created.retain(|pending| pending != id);
        self.settle_update(id);
        self.created.len() != before
    }
}

/// Persisted state of one widget.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound(deserialize = "M: Deserialize<'de> + Default"))]
pub struct TrackerSnapshot<M> {
    #[serde(default)]
    pub events: Vec<EventRecord<M>>,
    #[serde(default)]
    pub settings: TrackerSettings,
    #[serde(default, skip_serializing_if = "PendingSync::is_empty")]
    pub pending: PendingSync,
}

impl<M> Default for TrackerSnapshot<M> {
    fn default() -> Self {
        Self {
            events: Vec::new(),
            settings: TrackerSettings::default(),
            pending: PendingSync::default(),
        }
    }
}

/// Form input for a new record. A missing timestamp means "now".
#[derive(Debug, Clone, Deserialize)]
#[serde(bound(deserialize = "M: Deserialize<'de> + Default"))]
pub struct Draft<M> {
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub amount: Option<f64>,
    #[serde(default)]
    pub metadata: M,
}

/// Partial edit; absent fields keep their current value.
#[derive(Debug, Clone, Deserialize)]
pub struct EntryPatch<M> {
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub amount: Option<f64>,
    #[serde(default)]
    pub metadata: Option<M>,
}

impl<M> Default for EntryPatch<M> {
    fn default() -> Self {
        Self {
            timestamp: None,
            amount: None,
            metadata: None,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ClearRequest {
    #[serde(default)]
    pub confirm: bool,
}

#[derive(Debug, Deserialize)]
pub struct SettingsRequest {
    pub goal: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyPoint {
    pub date: String,
    pub entries: usize,
    pub total: f64,
    pub qualified: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklyPoint {
    pub week: String,
    pub start_date: String,
    pub end_date: String,
    pub entries: usize,
    pub total: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklyAveragePoint {
    pub week: String,
    pub days_counted: u8,
    pub avg_entries: f64,
    pub avg_total: f64,
}
