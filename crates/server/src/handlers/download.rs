//! Download endpoint: serves corrected decks from the output directory.

use axum::body::Body;
use axum::extract::rejection::PathRejection;
use axum::extract::{Path, State};
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use axum::http::HeaderValue;
use axum::response::{IntoResponse, Response};
use tokio_util::io::ReaderStream;

use crate::error::ApiError;
use crate::state::AppState;
use crate::storage::{self, PPTX_MIME};

/// `GET /api/download/{filename}`: stream a corrected deck.
pub async fn download(
    State(state): State<AppState>,
    filename: Result<Path<String>, PathRejection>,
) -> Result<Response, ApiError> {
    // A name that does not even decode cannot name a produced file.
    let Path(filename) = filename.map_err(|rejection| {
        log::debug!("Rejected download path: {}", rejection);
        ApiError::NotFound
    })?;

    let Some(path) = storage::find_output(&state.output_dir, &filename).await else {
        log::debug!("Download of unknown file {:?}", filename);
        return Err(ApiError::NotFound);
    };

    let file = tokio::fs::File::open(&path).await.map_err(|e| {
        log::warn!("Failed to open {}: {}", path.display(), e);
        ApiError::NotFound
    })?;
    let body = Body::from_stream(ReaderStream::new(file));

    Ok((
        [
            (CONTENT_TYPE, HeaderValue::from_static(PPTX_MIME)),
            (CONTENT_DISPOSITION, attachment(&filename)),
        ],
        body,
    )
        .into_response())
}

/// `Content-Disposition` value with an ASCII fallback name plus the exact
/// name in RFC 5987 form.
fn attachment(filename: &str) -> HeaderValue {
    let fallback: String = filename
        .chars()
        .map(|c| match c {
            ' '..='~' if c != '"' && c != '\\' => c,
            _ => '_',
        })
        .collect();
    let value = format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        fallback,
        urlencoding::encode(filename)
    );
    HeaderValue::from_str(&value).unwrap_or_else(|_| HeaderValue::from_static("attachment"))
}
