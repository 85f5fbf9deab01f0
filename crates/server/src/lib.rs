//! HTTP service: upload a deck, get its text corrected, download the result.

pub mod app;
pub mod config;
pub mod error;
pub mod handlers;
pub mod state;
pub mod storage;

pub use app::{AppBuilder, Server};
pub use config::ServerConfig;
pub use error::{ApiError, JsonError};
pub use state::AppState;
