//! API errors and their JSON bodies.

use axum::extract::multipart::{MultipartError, MultipartRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

/// Everything a handler can fail with.
///
/// Only [`ApiError::NotFound`] has its own status; every other failure is a
/// 500 carrying the error message.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Deck(#[from] deckfix_core::Error),

    #[error("Invalid upload: {0}")]
    Upload(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("File not found")]
    NotFound,
}

impl From<MultipartRejection> for ApiError {
    fn from(rejection: MultipartRejection) -> Self {
        ApiError::Upload(rejection.body_text())
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        ApiError::Upload(err.body_text())
    }
}

#[derive(Debug, Serialize)]
pub struct JsonError {
    error: String,
}

impl JsonError {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self {
            ApiError::NotFound => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            log::error!("Request failed: {}", self);
        }
        (status, Json(JsonError::new(self.to_string()))).into_response()
    }
}
