//! Offline corrector driven by a fixed list of word replacements.

use async_trait::async_trait;
use deckfix_core::{Corrector, Error, Result};
use regex::Regex;
use std::collections::HashMap;
use std::path::Path;

/// Replaces whole words from a list, case-sensitively.
#[derive(Debug, Clone)]
pub struct ReplacementCorrector {
    replacements: HashMap<String, String>,
    pattern: Option<Regex>,
}

impl ReplacementCorrector {
    /// Build from `wrong -> right` pairs. An empty map corrects nothing.
    pub fn new(replacements: HashMap<String, String>) -> Result<Self> {
        let mut words: Vec<&String> = replacements.keys().filter(|w| !w.is_empty()).collect();
        // Longest first so that multi-word entries win over their prefixes.
        words.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));

        let pattern = if words.is_empty() {
            None
        } else {
            let alternation = words
                .iter()
                .map(|w| regex::escape(w))
                .collect::<Vec<_>>()
                .join("|");
            let regex = Regex::new(&format!(r"\b(?:{})\b", alternation))
                .map_err(|e| Error::CorrectionError(format!("Invalid replacement list: {}", e)))?;
            Some(regex)
        };

        Ok(Self {
            replacements,
            pattern,
        })
    }

    /// Parse a list with one `wrong = right` or `wrong<TAB>right` pair per
    /// line. Blank lines and lines starting with `#` are ignored.
    pub fn parse(list: &str) -> Result<Self> {
        let mut replacements = HashMap::new();

        for (idx, raw) in list.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let (wrong, right) = line
                .split_once('\t')
                .or_else(|| line.split_once('='))
                .ok_or_else(|| {
                    Error::CorrectionError(format!(
                        "Replacement list line {}: expected 'wrong = right', got {:?}",
                        idx + 1,
                        raw
                    ))
                })?;

            let wrong = wrong.trim();
            if wrong.is_empty() {
                return Err(Error::CorrectionError(format!(
                    "Replacement list line {}: empty word",
                    idx + 1
                )));
            }
            replacements.insert(wrong.to_string(), right.trim().to_string());
        }

        Self::new(replacements)
    }

    /// Load a replacement list from disk.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let list = std::fs::read_to_string(path)?;
        let corrector = Self::parse(&list)?;
        log::info!(
            "Loaded {} replacement(s) from {}",
            corrector.len(),
            path.display()
        );
        Ok(corrector)
    }

    pub fn len(&self) -> usize {
        self.replacements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.replacements.is_empty()
    }

    fn apply(&self, text: &str) -> String {
        match &self.pattern {
            Some(pattern) => pattern
                .replace_all(text, |caps: &regex::Captures<'_>| {
                    self.replacements
                        .get(&caps[0])
                        .cloned()
                        .unwrap_or_else(|| caps[0].to_string())
                })
                .into_owned(),
            None => text.to_string(),
        }
    }
}

#[async_trait]
impl Corrector for ReplacementCorrector {
    async fn correct(&self, text: &str) -> Result<String> {
        Ok(self.apply(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn corrector(pairs: &[(&str, &str)]) -> ReplacementCorrector {
        ReplacementCorrector::new(
            pairs
                .iter()
                .map(|(w, r)| (w.to_string(), r.to_string()))
                .collect(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_replaces_whole_words_only() {
        let c = corrector(&[("teh", "the"), ("recieve", "receive")]);
        assert_eq!(
            c.correct("teh tehran office will recieve it").await.unwrap(),
            "the tehran office will receive it"
        );
    }

    #[tokio::test]
    async fn test_is_case_sensitive() {
        let c = corrector(&[("teh", "the")]);
        assert_eq!(c.correct("Teh end").await.unwrap(), "Teh end");
    }

    #[tokio::test]
    async fn test_longest_entry_wins() {
        let c = corrector(&[("alot", "a lot"), ("alot of", "a lot of")]);
        assert_eq!(c.correct("alot of work").await.unwrap(), "a lot of work");
    }

    #[tokio::test]
    async fn test_empty_list_is_identity() {
        let c = ReplacementCorrector::new(HashMap::new()).unwrap();
        assert!(c.is_empty());
        assert_eq!(c.correct("teh").await.unwrap(), "teh");
    }

    #[test]
    fn test_parse_list() {
        let c = ReplacementCorrector::parse("# typos\nteh = the\n\nrecieve\treceive\n").unwrap();
        assert_eq!(c.len(), 2);
        assert_eq!(c.apply("teh recieve"), "the receive");
    }

    #[test]
    fn test_parse_rejects_malformed_line() {
        let err = ReplacementCorrector::parse("teh the").unwrap_err();
        assert!(err.to_string().contains("line 1"));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "wrld = world").unwrap();
        let c = ReplacementCorrector::from_file(file.path()).unwrap();
        assert_eq!(c.apply("hello wrld"), "hello world");
    }
}
