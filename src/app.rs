use crate::handlers;
use crate::state::{AppState, SharedPanel};
use crate::trackers::Tracker;
use axum::{
    routing::{get, patch, post, put},
    Router,
};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/widgets", get(handlers::widgets))
        .merge(tracker_routes(state.water))
        .merge(tracker_routes(state.journal))
        .merge(tracker_routes(state.deep_work))
        .merge(tracker_routes(state.habits))
}

fn tracker_routes<T: Tracker>(panel: SharedPanel<T>) -> Router {
    let base = format!("/api/{}", T::KEY);
    Router::new()
        .route(&base, get(handlers::view::<T>))
        .route(
            &format!("{base}/entries"),
            get(handlers::list_entries::<T>).post(handlers::create_entry::<T>),
        )
        .route(
            &format!("{base}/entries/:id"),
            patch(handlers::edit_entry::<T>).delete(handlers::delete_entry::<T>),
        )
        .route(&format!("{base}/clear"), post(handlers::clear_entries::<T>))
        .route(&format!("{base}/settings"), put(handlers::update_settings::<T>))
        .with_state(panel)
}
