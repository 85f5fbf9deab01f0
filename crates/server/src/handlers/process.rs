//! Processing endpoint: stage an upload, correct it, save the copy.

use axum::body::Bytes;
use axum::extract::multipart::MultipartRejection;
use axum::extract::{Multipart, State};
use axum::Json;
use deckfix_core::proofread;
use deckfix_pptx::PptxDocument;
use serde::Serialize;
use std::io::BufReader;

use crate::error::ApiError;
use crate::state::AppState;
use crate::storage;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessResponse {
    pub amended_slides_count: usize,
    pub file_url: String,
}

/// The multipart form posted by the client.
///
/// `report` and `options` are required but not interpreted.
struct UploadForm {
    filename: String,
    data: Bytes,
    report: String,
    options: String,
}

async fn read_form(mut multipart: Multipart) -> Result<UploadForm, ApiError> {
    let mut file = None;
    let mut report = None;
    let mut options = None;

    while let Some(field) = multipart.next_field().await? {
        match field.name() {
            Some("file") => {
                let filename = field.file_name().unwrap_or_default().to_string();
                let data = field.bytes().await?;
                file = Some((filename, data));
            }
            Some("report") => report = Some(field.text().await?),
            Some("options") => options = Some(field.text().await?),
            other => log::debug!("Ignoring form field {:?}", other),
        }
    }

    let missing = |name: &str| ApiError::Upload(format!("missing form field '{}'", name));
    let (filename, data) = file.ok_or_else(|| missing("file"))?;

    Ok(UploadForm {
        filename,
        data,
        report: report.ok_or_else(|| missing("report"))?,
        options: options.ok_or_else(|| missing("options"))?,
    })
}

/// `POST /api/process-ppt`: correct every text shape and hand back a link to
/// the corrected deck.
pub async fn process_ppt(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<ProcessResponse>, ApiError> {
    let form = read_form(multipart?).await?;
    let original = storage::sanitize_filename(&form.filename);
    log::info!(
        "Processing {} ({} bytes, report {:?}, options {:?})",
        original,
        form.data.len(),
        form.report,
        form.options
    );

    let staged = storage::stage_upload(&state.upload_dir, &original, &form.data).await?;

    let name = original.clone();
    let mut document = tokio::task::spawn_blocking(move || -> deckfix_core::Result<PptxDocument> {
        let file = std::fs::File::open(&staged)?;
        PptxDocument::from_reader(BufReader::new(file), &name)
    })
    .await??;

    let report = proofread(document.presentation_mut(), state.corrector.as_ref()).await?;

    let output_name = storage::output_name(&original);
    let output_path = state.output_dir.join(&output_name);
    tokio::task::spawn_blocking(move || document.save(&output_path)).await??;

    log::info!(
        "Saved {} with {} amended shape(s) out of {}",
        output_name,
        report.amended(),
        report.examined
    );

    Ok(Json(ProcessResponse {
        amended_slides_count: report.amended(),
        file_url: storage::download_url(&output_name),
    }))
}
