//! Shared request state.

use deckfix_core::Corrector;
use std::path::PathBuf;
use std::sync::Arc;

use crate::config::ServerConfig;

/// State shared by every request.
#[derive(Clone)]
pub struct AppState {
    /// Built once at startup, shared read-only.
    pub corrector: Arc<dyn Corrector>,
    pub upload_dir: PathBuf,
    pub output_dir: PathBuf,
}

impl AppState {
    pub fn new(corrector: Arc<dyn Corrector>, config: &ServerConfig) -> Self {
        Self {
            corrector,
            upload_dir: config.upload_dir.clone(),
            output_dir: config.output_dir.clone(),
        }
    }

    /// Create the upload and output directories if they are missing.
    pub async fn ensure_dirs(&self) -> std::io::Result<()> {
        tokio::fs::create_dir_all(&self.upload_dir).await?;
        tokio::fs::create_dir_all(&self.output_dir).await?;
        Ok(())
    }
}
