pub mod app;
pub mod bucketing;
pub mod config;
pub mod errors;
pub mod goal;
pub mod handlers;
pub mod models;
pub mod panel;
pub mod remote;
pub mod state;
pub mod stats;
pub mod storage;
pub mod streak;
pub mod trackers;

pub use app::router;
pub use bucketing::{bucket, Bucketed};
pub use config::AppConfig;
pub use errors::TrackerError;
pub use goal::progress;
pub use panel::{PanelController, PanelState, PanelView};
pub use state::AppState;
pub use storage::{JsonFileStore, MemoryStore, Store};
pub use streak::compute_streak;
