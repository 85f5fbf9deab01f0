//! PPTX (Office Open XML) backend for deckfix.
//!
//! Opens .pptx files (ZIP archives of XML parts), exposes their slides and
//! shapes, and writes corrected text back into the package.

pub mod document;
mod rewrite;
mod slide;
mod xml;

#[cfg(any(test, feature = "fixtures"))]
pub mod fixtures;

pub use document::PptxDocument;
