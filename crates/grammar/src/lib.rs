//! Grammar and spelling correction back-ends.
//!
//! [`LanguageToolCorrector`] talks to a LanguageTool server;
//! [`ReplacementCorrector`] applies a fixed word list offline.

pub mod languagetool;
pub mod matches;
pub mod replacements;

pub use languagetool::{LanguageToolConfig, LanguageToolCorrector};
pub use matches::{apply_matches, Replacement, Rule, RuleMatch};
pub use replacements::ReplacementCorrector;
