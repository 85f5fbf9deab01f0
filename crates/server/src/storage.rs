//! Where uploads are staged and corrected decks are kept.

use std::io;
use std::path::{Path, PathBuf};

pub const PPTX_MIME: &str =
    "application/vnd.openxmlformats-officedocument.presentationml.presentation";

/// Prefix put in front of the uploaded name for the corrected copy.
pub const OUTPUT_PREFIX: &str = "corrected_";

const FALLBACK_NAME: &str = "presentation.pptx";

/// Reduce a client supplied filename to a bare file name.
///
/// Directory components from either path convention are dropped, so the
/// result can be joined onto a storage directory safely.
pub fn sanitize_filename(name: &str) -> String {
    let base = name
        .rsplit(|c: char| c == '/' || c == '\\')
        .next()
        .unwrap_or_default()
        .trim();

    if base.is_empty() || base == "." || base == ".." {
        FALLBACK_NAME.to_string()
    } else {
        base.to_string()
    }
}

/// Name of the corrected copy of `original`.
pub fn output_name(original: &str) -> String {
    format!("{}{}", OUTPUT_PREFIX, original)
}

/// URL the corrected copy can be downloaded from.
pub fn download_url(output_name: &str) -> String {
    format!("/api/download/{}", urlencoding::encode(output_name))
}

/// Write the upload under a unique name so concurrent uploads of the same
/// file never touch each other.
pub async fn stage_upload(dir: &Path, filename: &str, data: &[u8]) -> io::Result<PathBuf> {
    let path = dir.join(format!("{}_{}", uuid::Uuid::new_v4(), filename));
    tokio::fs::write(&path, data).await?;
    log::debug!("Staged {} bytes at {}", data.len(), path.display());
    Ok(path)
}

/// Resolve a requested download to a file in `dir`.
///
/// Names that could leave the directory, or that point at hidden files
/// such as in-progress saves, resolve to nothing.
pub async fn find_output(dir: &Path, filename: &str) -> Option<PathBuf> {
    if filename.is_empty()
        || filename.starts_with('.')
        || filename.contains(['/', '\\', '\0'])
    {
        return None;
    }

    let path = dir.join(filename);
    match tokio::fs::metadata(&path).await {
        Ok(meta) if meta.is_file() => Some(path),
        _ => None,
    }
}
