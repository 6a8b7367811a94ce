use std::env;
use std::path::PathBuf;

const DEFAULT_DATA_DIR: &str = "data";
const DEFAULT_PORT: u16 = 8080;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// Directory holding one snapshot file per widget.
    pub data_dir: PathBuf,
    pub port: u16,
    /// Base URL of the REST backend. Widgets stay local-only without it.
    pub remote_url: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let data_dir = lookup("APP_DATA_DIR")
            .filter(|value| !value.trim().is_empty())
            .map_or_else(|| PathBuf::from(DEFAULT_DATA_DIR), PathBuf::from);

        let port = lookup("PORT")
            .and_then(|value| value.parse::<u16>().ok())
            .unwrap_or(DEFAULT_PORT);

        let remote_url = lookup("APP_REMOTE_URL")
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty());

        Self {
            data_dir,
            port,
            remote_url,
        }
    }
}
