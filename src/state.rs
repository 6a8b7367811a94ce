use crate::config::AppConfig;
use crate::errors::TrackerError;
use crate::panel::PanelController;
use crate::remote::RestResource;
use crate::storage::JsonFileStore;
use crate::trackers::{DeepWork, Habit, Journal, Tracker, Water};
use reqwest::Client;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard};

pub type ServedPanel<T> = PanelController<T, JsonFileStore, RestResource<<T as Tracker>::Metadata>>;

/// One widget's controller shared between request handlers.
pub struct SharedPanel<T: Tracker> {
    panel: Arc<Mutex<ServedPanel<T>>>,
    mutating: Arc<AtomicBool>,
}

impl<T: Tracker> Clone for SharedPanel<T> {
    fn clone(&self) -> Self {
        Self {
            panel: Arc::clone(&self.panel),
            mutating: Arc::clone(&self.mutating),
        }
    }
}

impl<T: Tracker> SharedPanel<T> {
    pub fn new(panel: ServedPanel<T>) -> Self {
        Self {
            panel: Arc::new(Mutex::new(panel)),
            mutating: Arc::new(AtomicBool::new(false)),
        }
    }

    pub async fn lock(&self) -> MutexGuard<'_, ServedPanel<T>> {
        self.panel.lock().await
    }

    /// Access for a mutation. Fails with [`TrackerError::Busy`] while another
    /// mutation holds the panel, instead of queueing a duplicate submit.
    pub async fn exclusive(&self) -> Result<MutationGuard<'_, T>, TrackerError> {
        if self
            .mutating
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(TrackerError::Busy);
        }
        let flag = FlagReset(&self.mutating);
        let panel = self.panel.lock().await;
        Ok(MutationGuard { panel, _flag: flag })
    }
}

struct FlagReset<'a>(&'a AtomicBool);

impl Drop for FlagReset<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct MutationGuard<'a, T: Tracker> {
    panel: MutexGuard<'a, ServedPanel<T>>,
    _flag: FlagReset<'a>,
}

impl<T: Tracker> Deref for MutationGuard<'_, T> {
    type Target = ServedPanel<T>;

    fn deref(&self) -> &Self::Target {
        &self.panel
    }
}

impl<T: Tracker> DerefMut for MutationGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.panel
    }
}

#[derive(Clone)]
pub struct AppState {
    pub water: SharedPanel<Water>,
    pub journal: SharedPanel<Journal>,
    pub deep_work: SharedPanel<DeepWork>,
    pub habits: SharedPanel<Habit>,
}

impl AppState {
    pub fn new(config: &AppConfig) -> Self {
        let client = Client::new();
        Self {
            water: served(config, &client),
            journal: served(config, &client),
            deep_work: served(config, &client),
            habits: served(config, &client),
        }
    }

    /// Closes every panel; persisted snapshots stay on disk.
    pub async fn close_all(&self) {
        self.water.lock().await.close();
        self.journal.lock().await.close();
        self.deep_work.lock().await.close();
        self.habits.lock().await.close();
    }
}

fn served<T: Tracker>(config: &AppConfig, client: &Client) -> SharedPanel<T> {
    let store = JsonFileStore::for_key(&config.data_dir, T::KEY);
    let (singular, plural) = T::RESOURCE;
    let remote = config
        .remote_url
        .as_deref()
        .map(|base| RestResource::new(client.clone(), base, singular, plural));
    SharedPanel::new(PanelController::new(store, remote))
}
