use axum::http::StatusCode;
use thiserror::Error;

/// Failures raised by the tracker core and the panel controller.
#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("parse error: {0}")]
    Parse(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("storage error: {0}")]
    Storage(#[from] std::io::Error),

    #[error("entry not found: {0}")]
    NotFound(String),

    #[error("a change is already in progress")]
    Busy,

    #[error("panel is closed")]
    Closed,
}

impl TrackerError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }
}

impl From<serde_json::Error> for TrackerError {
    fn from(err: serde_json::Error) -> Self {
        Self::Parse(err.to_string())
    }
}

impl From<reqwest::Error> for TrackerError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Parse(err.to_string())
        } else {
            Self::Network(err.to_string())
        }
    }
}

#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
}

impl From<TrackerError> for AppError {
    fn from(err: TrackerError) -> Self {
        let status = match &err {
            TrackerError::Validation(_) => StatusCode::BAD_REQUEST,
            TrackerError::Configuration(_) => StatusCode::UNPROCESSABLE_ENTITY,
            TrackerError::NotFound(_) => StatusCode::NOT_FOUND,
            TrackerError::Busy => StatusCode::CONFLICT,
            TrackerError::Closed => StatusCode::GONE,
            TrackerError::Parse(_) | TrackerError::Network(_) | TrackerError::Storage(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        Self {
            status,
            message: err.to_string(),
        }
    }
}

impl axum::response::IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        (self.status, self.message).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracker_errors_map_to_http_statuses() {
        let cases = [
            (TrackerError::validation("title is required"), StatusCode::BAD_REQUEST),
            (TrackerError::configuration("goal must be positive"), StatusCode::UNPROCESSABLE_ENTITY),
            (TrackerError::NotFound("abc".into()), StatusCode::NOT_FOUND),
            (TrackerError::Busy, StatusCode::CONFLICT),
            (TrackerError::Closed, StatusCode::GONE),
            (TrackerError::Network("down".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(AppError::from(err).status, status);
        }
    }
}
