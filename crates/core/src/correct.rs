//! The correction seam between the proofreading walk and its back-ends.

use async_trait::async_trait;

use crate::Result;

/// A grammar/spelling correction function.
///
/// One instance is built at startup and shared across all requests, so
/// implementations must tolerate concurrent calls.
#[async_trait]
pub trait Corrector: Send + Sync {
    /// Return the corrected form of `text`. Returning `text` unchanged means
    /// nothing needed fixing.
    async fn correct(&self, text: &str) -> Result<String>;
}

/// A corrector that never changes anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct Identity;

#[async_trait]
impl Corrector for Identity {
    async fn correct(&self, text: &str) -> Result<String> {
        Ok(text.to_string())
    }
}
