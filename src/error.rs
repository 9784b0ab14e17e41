use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Why a webhook delivery could not be turned into a record.
#[derive(Debug, Error)]
pub enum NormalizeError {
    #[error("Invalid event type: {0}")]
    InvalidEventType(String),

    /// A required field is missing or has the wrong shape.
    #[error("{0}")]
    MalformedPayload(String),
}

impl From<serde_json::Error> for NormalizeError {
    fn from(err: serde_json::Error) -> Self {
        Self::MalformedPayload(err.to_string())
    }
}

/// Errors from the event store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    /// A stored row no longer maps onto a valid record.
    #[error("invalid stored event: {0}")]
    InvalidState(String),
}

/// Errors surfaced by the HTTP handlers.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Invalid event type")]
    InvalidEventType,

    #[error("{0}")]
    MalformedPayload(String),

    #[error("Missing signature")]
    MissingSignature,

    #[error("Invalid signature")]
    InvalidSignature,

    #[error(transparent)]
    Storage(#[from] StoreError),
}

impl From<NormalizeError> for AppError {
    fn from(err: NormalizeError) -> Self {
        match err {
            NormalizeError::InvalidEventType(_) => Self::InvalidEventType,
            NormalizeError::MalformedPayload(msg) => Self::MalformedPayload(msg),
        }
    }
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidEventType | Self::MalformedPayload(_) => StatusCode::BAD_REQUEST,
            Self::MissingSignature | Self::InvalidSignature => StatusCode::UNAUTHORIZED,
            Self::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("Request failed: {}", self);
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
