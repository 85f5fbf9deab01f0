//! Request handlers for the two API routes.

mod download;
mod process;

pub use download::download;
pub use process::{process_ppt, ProcessResponse};
