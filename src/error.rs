use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;

use crate::types::reminders::SlotKey;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid time '{value}' for slot {slot_key}; expected HH:MM (24-hour)")]
pub struct TimeFormatError {
    pub slot_key: SlotKey,
    pub value: String,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("lock poisoned: {0}")]
    Lock(String),

    #[error("invalid stored value in {column}: {value}")]
    InvalidValue { column: &'static str, value: String },
}

#[derive(Debug, Error)]
pub enum ReminderError {
    #[error("failed to read reminder state: {0}")]
    Store(#[from] StoreError),

    #[error("reminder state read did not complete: {0}")]
    Join(#[from] tokio::task::JoinError),
}

#[derive(Debug, Error)]
pub enum ServeError {
    #[error("failed to open database: {0}")]
    Store(#[from] StoreError),

    #[error("failed to bind or serve: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("Push notifications are not configured.")]
    PushUnavailable,

    #[error("storage error: {0}")]
    Store(#[from] StoreError),
}

#[derive(Serialize)]
pub(crate) struct ErrorResponse {
    pub(crate) error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::PushUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Store(err) => {
                tracing::error!(error = %err, "request failed on storage");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        let error = match &self {
            ApiError::Store(_) => "Internal server error.".to_string(),
            other => other.to_string(),
        };

        (status, Json(ErrorResponse { error })).into_response()
    }
}
