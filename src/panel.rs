use crate::bucketing::{bucket, local_date};
use crate::errors::TrackerError;
use crate::goal::{progress, validate_goal};
use crate::models::{
    DailyPoint, DayBucket, Draft, EntryPatch, EventId, EventRecord, GoalProgress, PendingSync,
    StreakState, TrackerSnapshot,
};
use crate::remote::RemoteSource;
use crate::stats::{history, weekly, WeeklySeries};
use crate::storage::Store;
use crate::streak::{compute_streak, longest_streak};
use crate::trackers::Tracker;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde::Serialize;
use std::marker::PhantomData;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "message", rename_all = "snake_case")]
pub enum PanelState {
    Unloaded,
    Loading,
    Ready,
    Mutating,
    Error(String),
    Closed,
}

/// `warning` is set when the local write or the remote sync failed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Outcome<V> {
    pub value: V,
    pub warning: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PanelView {
    pub key: &'static str,
    pub state: PanelState,
    pub today: NaiveDate,
    pub entries_today: usize,
    pub progress: Option<GoalProgress>,
    pub streak: StreakState,
    pub longest_streak: u32,
    pub last_7_days: Vec<DailyPoint>,
    pub weekly: WeeklySeries,
    pub rejected_records: usize,
    pub warning: Option<String>,
}

pub struct PanelController<T, S, R>
where
    T: Tracker,
{
    store: S,
    remote: Option<R>,
    state: PanelState,
    snapshot: TrackerSnapshot<T::Metadata>,
    warning: Option<String>,
    _tracker: PhantomData<fn() -> T>,
}

impl<T, S, R> PanelController<T, S, R>
where
    T: Tracker,
    S: Store<TrackerSnapshot<T::Metadata>>,
    R: RemoteSource<EventRecord<T::Metadata>>,
{
    pub fn new(store: S, remote: Option<R>) -> Self {
        Self {
            store,
            remote,
            state: PanelState::Unloaded,
            snapshot: TrackerSnapshot::default(),
            warning: None,
            _tracker: PhantomData,
        }
    }

    pub fn state(&self) -> &PanelState {
        &self.state
    }

    pub fn warning(&self) -> Option<&str> {
        self.warning.as_deref()
    }

    pub fn events(&self) -> Result<&[EventRecord<T::Metadata>], TrackerError> {
        self.ensure_not_closed()?;
        Ok(&self.snapshot.events)
    }

    pub fn goal(&self) -> Option<f64> {
        self.snapshot.settings.goal.or(T::DEFAULT_GOAL)
    }

    /// Loads the event log. Calling it on a ready panel is a no-op; calling it
    /// after an error retries.
    pub async fn open(&mut self) -> Result<(), TrackerError> {
        match self.state {
            PanelState::Closed => return Err(TrackerError::Closed),
            PanelState::Ready | PanelState::Mutating => return Ok(()),
            PanelState::Unloaded | PanelState::Loading | PanelState::Error(_) => {}
        }

        self.state = PanelState::Loading;
        self.warning = None;
        let local = self.store.load().await;

        let remote = match &self.remote {
            Some(remote) => Some(remote.list().await),
            None => None,
        };

        match (remote, local) {
            (Some(Ok(events)), local) => {
                let local = match local {
                    Ok(snapshot) => snapshot,
                    Err(err) => {
                        warn!("{}: local snapshot unreadable, keeping remote data: {err}", T::KEY);
                        TrackerSnapshot::default()
                    }
                };
                self.snapshot = merge_remote(events, local);
                if let Some(message) = self.push_pending().await {
                    self.note_warning(message);
                }
                if let Err(err) = self.store.save(&self.snapshot).await {
                    self.note_warning(format!("could not cache remote data locally: {err}"));
                }
                info!("{}: loaded {} records from remote", T::KEY, self.snapshot.events.len());
            }
            (remote, Ok(snapshot)) => {
                if let Some(Err(err)) = remote {
                    self.note_warning(format!("showing local data, remote unavailable: {err}"));
                }
                self.snapshot = snapshot;
                info!("{}: loaded {} local records", T::KEY, self.snapshot.events.len());
            }
            (_, Err(err)) => {
                warn!("{}: no readable data source: {err}", T::KEY);
                self.state = PanelState::Error(err.to_string());
                return Err(err);
            }
        }

        self.state = PanelState::Ready;
        Ok(())
    }

    /// Discards in-memory state. The persisted snapshot is left untouched and
    /// every later call fails with [`TrackerError::Closed`].
    pub fn close(&mut self) {
        self.snapshot = TrackerSnapshot::default();
        self.warning = None;
        self.state = PanelState::Closed;
        debug!("{}: panel closed", T::KEY);
    }

    pub async fn create(
        &mut self,
        draft: Draft<T::Metadata>,
        now: DateTime<Utc>,
    ) -> Result<Outcome<EventRecord<T::Metadata>>, TrackerError> {
        T::validate(&draft)?;
        self.begin_mutation().await?;

        let record = EventRecord::new(draft.timestamp.unwrap_or(now), draft.amount, draft.metadata);
        self.snapshot.events.push(record.clone());
        let mut warning = self.persist().await;

        let mut committed = record;
        if let Some(remote) = &self.remote {
            match remote.create(&committed).await {
                Ok(created) if created != committed => {
                    if let Some(slot) = self.snapshot.events.iter_mut().find(|r| r.id == committed.id) {
                        *slot = created.clone();
                    }
                    committed = created;
                    warning = warning.or(self.persist().await);
                }
                Ok(_) => {}
                Err(err) => {
                    self.snapshot.pending.record_create(&committed.id);
                    warning = self
                        .persist()
                        .await
                        .or(Some(format!("saved locally, sync failed: {err}")));
                }
            }
        }

        Ok(self.finish(committed, warning))
    }

    pub async fn edit(
        &mut self,
        id: &EventId,
        patch: EntryPatch<T::Metadata>,
    ) -> Result<Outcome<EventRecord<T::Metadata>>, TrackerError> {
        self.ensure_ready().await?;
        let index = self.position(id)?;

        let current = &self.snapshot.events[index];
        let merged = Draft {
            timestamp: patch.timestamp.or_else(|| current.instant()),
            amount: patch.amount.or(current.amount),
            metadata: patch.metadata.unwrap_or_else(|| current.metadata.clone()),
        };
        T::validate(&merged)?;

        self.begin_mutation().await?;
        let updated = {
            let record = &mut self.snapshot.events[index];
            if let Some(at) = merged.timestamp {
                record.timestamp = Some(at.timestamp_millis());
            }
            record.amount = merged.amount;
            record.metadata = merged.metadata;
            record.clone()
        };
        let mut warning = self.persist().await;

        if let Some(remote) = &self.remote {
            if !self.snapshot.pending.is_unsynced_create(id) {
                match remote.update(id, &updated).await {
                    Ok(()) => self.snapshot.pending.settle_update(id),
                    Err(err) => {
                        self.snapshot.pending.record_update(id);
                        warning = self
                            .persist()
                            .await
                            .or(Some(format!("saved locally, sync failed: {err}")));
                    }
                }
            }
        }

        Ok(self.finish(updated, warning))
    }

    pub async fn delete(&mut self, id: &EventId) -> Result<Outcome<EventRecord<T::Metadata>>, TrackerError> {
        self.ensure_ready().await?;
        let index = self.position(id)?;

        self.begin_mutation().await?;
        let removed = self.snapshot.events.remove(index);
        let unsynced = self.snapshot.pending.forget(id);
        let mut warning = self.persist().await;

        if let Some(remote) = &self.remote {
            if !unsynced {
                if let Err(err) = remote.delete(id).await {
                    self.snapshot.pending.record_delete(id);
                    warning = self
                        .persist()
                        .await
                        .or(Some(format!("removed locally, sync failed: {err}")));
                }
            }
        }

        Ok(self.finish(removed, warning))
    }

    pub async fn clear(&mut self, confirmed: bool) -> Result<Outcome<usize>, TrackerError> {
        if !confirmed {
            return Err(TrackerError::validation("clearing history requires confirmation"));
        }
        self.begin_mutation().await?;

        let removed = std::mem::take(&mut self.snapshot.events);
        let synced: Vec<EventId> = removed
            .iter()
            .filter(|record| !self.snapshot.pending.forget(&record.id))
            .map(|record| record.id.clone())
            .collect();
        let mut warning = self.persist().await;

        if let Some(remote) = &self.remote {
            let mut failed = 0usize;
            for id in &synced {
                if let Err(err) = remote.delete(id).await {
                    debug!("{}: remote delete of {id} failed: {err}", T::KEY);
                    self.snapshot.pending.record_delete(id);
                    failed += 1;
                }
            }
            if failed > 0 {
                warning = self
                    .persist()
                    .await
                    .or(Some(format!("cleared locally, {failed} remote deletes failed")));
            }
        }

        info!("{}: cleared {} records", T::KEY, removed.len());
        Ok(self.finish(removed.len(), warning))
    }

    pub async fn set_goal(&mut self, goal: f64) -> Result<Outcome<f64>, TrackerError> {
        if T::DEFAULT_GOAL.is_none() {
            return Err(TrackerError::configuration(format!(
                "{} does not track a daily goal",
                T::KEY
            )));
        }
        validate_goal(goal)?;
        self.begin_mutation().await?;

        self.snapshot.settings.goal = Some(goal);
        let warning = self.persist().await;
        Ok(self.finish(goal, warning))
    }

    pub fn view<Tz: TimeZone>(&self, zone: &Tz, now: DateTime<Utc>) -> Result<PanelView, TrackerError> {
        self.ensure_not_closed()?;
        let today = local_date(now, zone)
            .ok_or_else(|| TrackerError::validation(format!("{now} has no local date")))?;
        let goal = self.snapshot.settings.goal;
        let qualifies = |day: &DayBucket<T::Metadata>| T::qualifies(day, goal);

        let bucketed = bucket(&self.snapshot.events, zone);
        let today_bucket = bucketed.get(today);
        let goal_progress = match self.goal() {
            Some(goal) => Some(progress(today_bucket, goal)?),
            None => None,
        };

        Ok(PanelView {
            key: T::KEY,
            state: self.state.clone(),
            today,
            entries_today: today_bucket.map_or(0, |day| day.len()),
            progress: goal_progress,
            streak: compute_streak(&bucketed.days, qualifies, today),
            longest_streak: longest_streak(&bucketed.days, qualifies),
            last_7_days: history(&bucketed.days, today, qualifies),
            weekly: weekly(&bucketed.days, today),
            rejected_records: bucketed.rejected.len(),
            warning: self.warning.clone(),
        })
    }

    fn ensure_not_closed(&self) -> Result<(), TrackerError> {
        if self.state == PanelState::Closed {
            return Err(TrackerError::Closed);
        }
        Ok(())
    }

    async fn ensure_ready(&mut self) -> Result<(), TrackerError> {
        match self.state {
            PanelState::Ready | PanelState::Mutating => Ok(()),
            _ => self.open().await,
        }
    }

    async fn begin_mutation(&mut self) -> Result<(), TrackerError> {
        self.ensure_ready().await?;
        if self.state == PanelState::Mutating {
            // only reachable when an earlier mutation future was dropped
            // after committing locally
            debug!("{}: resuming after abandoned mutation", T::KEY);
        }
        self.state = PanelState::Mutating;
        Ok(())
    }

    fn finish<V>(&mut self, value: V, warning: Option<String>) -> Outcome<V> {
        if let Some(message) = &warning {
            self.note_warning(message.clone());
        }
        self.state = PanelState::Ready;
        Outcome { value, warning }
    }

    async fn push_pending(&mut self) -> Option<String> {
        let Some(remote) = &self.remote else {
            return None;
        };
        let pending = std::mem::take(&mut self.snapshot.pending);
        let mut left = PendingSync::default();

        for id in pending.created {
            let Some(index) = self.snapshot.events.iter().position(|record| record.id == id) else {
                continue;
            };
            match remote.create(&self.snapshot.events[index]).await {
                Ok(created) => self.snapshot.events[index] = created,
                Err(err) => {
                    debug!("{}: replaying create of {id} failed: {err}", T::KEY);
                    left.created.push(id);
                }
            }
        }
        for id in pending.updated {
            let Some(record) = self.snapshot.events.iter().find(|record| record.id == id) else {
                continue;
            };
            let result = remote.update(&id, record).await;
            if let Err(err) = result {
                debug!("{}: replaying update of {id} failed: {err}", T::KEY);
                left.updated.push(id);
            }
        }
        for id in pending.deleted {
            let result = remote.delete(&id).await;
            if let Err(err) = result {
                debug!("{}: replaying delete of {id} failed: {err}", T::KEY);
                left.deleted.push(id);
            }
        }

        let unsynced = left.created.len() + left.updated.len() + left.deleted.len();
        self.snapshot.pending = left;
        (unsynced > 0).then(|| format!("{unsynced} local changes are not synced yet"))
    }

    async fn persist(&self) -> Option<String> {
        match self.store.save(&self.snapshot).await {
            Ok(()) => None,
            Err(err) => Some(format!("could not save locally: {err}")),
        }
    }

    fn note_warning(&mut self, message: String) {
        warn!("{}: {message}", T::KEY);
        self.warning = Some(message);
    }

    fn position(&self, id: &EventId) -> Result<usize, TrackerError> {
        self.snapshot
            .events
            .iter()
            .position(|record| &record.id == id)
            .ok_or_else(|| TrackerError::NotFound(id.to_string()))
    }
}

/// Remote list plus local changes the remote has not seen. Pending deletes
/// hide remote records, pending edits win over the remote copy and pending
/// creates are appended. An edit to a record deleted remotely is dropped.
fn merge_remote<M: Clone>(
    remote: Vec<EventRecord<M>>,
    local: TrackerSnapshot<M>,
) -> TrackerSnapshot<M> {
    let TrackerSnapshot {
        events: local_events,
        settings,
        mut pending,
    } = local;

    let mut events: Vec<EventRecord<M>> = remote
        .into_iter()
        .filter(|record| !pending.deleted.contains(&record.id))
        .map(|record| {
            if pending.updated.contains(&record.id) {
                if let Some(edited) = find(&local_events, &record.id) {
                    return edited.clone();
                }
            }
            record
        })
        .collect();

    pending
        .updated
        .retain(|id| events.iter().any(|record| &record.id == id));
    pending
        .created
        .retain(|id| find(&events, id).is_none() && find(&local_events, id).is_some());
    for id in &pending.created {
        if let Some(record) = find(&local_events, id) {
            events.push(record.clone());
        }
    }

    TrackerSnapshot {
        events,
        settings,
        pending,
    }
}

fn find<'a, M>(events: &'a [EventRecord<M>], id: &EventId) -> Option<&'a EventRecord<M>> {
    events.iter().find(|record| &record.id == id)
}
