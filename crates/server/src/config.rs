//! Runtime configuration for the HTTP service.

use clap::Args;
use std::path::PathBuf;

#[derive(Args, Debug, Clone)]
pub struct ServerConfig {
    /// Address to serve the API on
    #[arg(long, env = "DECKFIX_ADDRESS", default_value = "127.0.0.1:8000")]
    pub address: String,

    /// Directory receiving uploaded decks
    #[arg(long, env = "DECKFIX_UPLOAD_DIR", default_value = "uploads")]
    pub upload_dir: PathBuf,

    /// Directory holding corrected decks served for download
    #[arg(long, env = "DECKFIX_OUTPUT_DIR", default_value = "output")]
    pub output_dir: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1:8000".to_string(),
            upload_dir: PathBuf::from("uploads"),
            output_dir: PathBuf::from("output"),
        }
    }
}
