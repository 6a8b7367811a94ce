use crate::errors::AppError;
use crate::models::{ClearRequest, Draft, EntryPatch, EventId, EventRecord, SettingsRequest};
use crate::panel::{Outcome, PanelState, PanelView};
use crate::state::{ServedPanel, SharedPanel};
use crate::trackers::{DeepWork, Habit, Journal, Tracker, Water};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{Local, Utc};

type Entry<T> = EventRecord<<T as Tracker>::Metadata>;

pub async fn widgets() -> Json<Vec<&'static str>> {
    Json(vec![Water::KEY, Journal::KEY, DeepWork::KEY, Habit::KEY])
}

pub async fn view<T: Tracker>(State(panel): State<SharedPanel<T>>) -> Result<Json<PanelView>, AppError> {
    let mut panel = panel.lock().await;
    ensure_open(&mut panel).await?;
    Ok(Json(panel.view(&Local, Utc::now())?))
}

pub async fn list_entries<T: Tracker>(
    State(panel): State<SharedPanel<T>>,
) -> Result<Json<Vec<Entry<T>>>, AppError> {
    let mut panel = panel.lock().await;
    ensure_open(&mut panel).await?;
    Ok(Json(panel.events()?.to_vec()))
}

pub async fn create_entry<T: Tracker>(
    State(panel): State<SharedPanel<T>>,
    Json(draft): Json<Draft<T::Metadata>>,
) -> Result<(StatusCode, Json<Outcome<Entry<T>>>), AppError> {
    let mut panel = panel.exclusive().await?;
    let outcome = panel.create(draft, Utc::now()).await?;
    Ok((StatusCode::CREATED, Json(outcome)))
}

pub async fn edit_entry<T: Tracker>(
    State(panel): State<SharedPanel<T>>,
    Path(id): Path<String>,
    Json(patch): Json<EntryPatch<T::Metadata>>,
) -> Result<Json<Outcome<Entry<T>>>, AppError> {
    let mut panel = panel.exclusive().await?;
    Ok(Json(panel.edit(&EventId::from(id), patch).await?))
}

pub async fn delete_entry<T: Tracker>(
    State(panel): State<SharedPanel<T>>,
    Path(id): Path<String>,
) -> Result<Json<Outcome<Entry<T>>>, AppError> {
    let mut panel = panel.exclusive().await?;
    Ok(Json(panel.delete(&EventId::from(id)).await?))
}

pub async fn clear_entries<T: Tracker>(
    State(panel): State<SharedPanel<T>>,
    Json(request): Json<ClearRequest>,
) -> Result<Json<Outcome<usize>>, AppError> {
    let mut panel = panel.exclusive().await?;
    Ok(Json(panel.clear(request.confirm).await?))
}

pub async fn update_settings<T: Tracker>(
    State(panel): State<SharedPanel<T>>,
    Json(request): Json<SettingsRequest>,
) -> Result<Json<Outcome<f64>>, AppError> {
    let mut panel = panel.exclusive().await?;
    Ok(Json(panel.set_goal(request.goal).await?))
}

/// Opens the panel on first use and retries after a failed load.
async fn ensure_open<T: Tracker>(panel: &mut ServedPanel<T>) -> Result<(), AppError> {
    if matches!(panel.state(), PanelState::Unloaded | PanelState::Error(_)) {
        panel.open().await?;
    }
    Ok(())
}
