//! Core domain types, the correction trait, and the proofreading walk
//! for slide decks.

pub mod correct;
pub mod error;
pub mod proofread;
pub mod types;

pub use correct::{Corrector, Identity};
pub use error::{Error, Result};
pub use proofread::{proofread, Amendment, ProofreadReport};
pub use types::{
    GraphicKind, Presentation, PresentationFormat, Shape, ShapeKind, Slide, TextFrame,
    LINE_BREAK, PARAGRAPH_SEPARATOR,
};
