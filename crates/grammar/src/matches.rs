//! Rule matches reported by a checker and how to apply them.

use serde::Deserialize;

/// A single issue found by the checker.
///
/// `offset` and `length` count UTF-16 code units, which is how LanguageTool
/// reports positions.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RuleMatch {
    #[serde(default)]
    pub message: String,
    pub offset: usize,
    pub length: usize,
    #[serde(default)]
    pub replacements: Vec<Replacement>,
    #[serde(default)]
    pub rule: Option<Rule>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Replacement {
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Rule {
    pub id: String,
}

/// Apply the first suggested replacement of each match.
///
/// Matches without suggestions, matches outside the text, and matches that
/// overlap an earlier applied match are skipped.
pub fn apply_matches(text: &str, matches: &[RuleMatch]) -> String {
    let mut ordered: Vec<&RuleMatch> = matches.iter().collect();
    ordered.sort_by_key(|m| m.offset);

    let mut out = String::with_capacity(text.len());
    let mut cursor = 0usize; // byte offset into `text`

    for m in ordered {
        let Some(replacement) = m.replacements.first() else {
            continue;
        };
        let (Some(start), Some(end)) = (
            byte_index(text, m.offset),
            m.offset
                .checked_add(m.length)
                .and_then(|units| byte_index(text, units)),
        ) else {
            log::debug!("Skipping match outside text at {}+{}", m.offset, m.length);
            continue;
        };
        if start < cursor {
            continue;
        }

        out.push_str(&text[cursor..start]);
        out.push_str(&replacement.value);
        cursor = end;
    }

    out.push_str(&text[cursor..]);
    out
}

/// Byte index of the UTF-16 position `units`, if it falls on a char boundary
/// within `text`.
fn byte_index(text: &str, units: usize) -> Option<usize> {
    let mut seen = 0usize;
    for (idx, ch) in text.char_indices() {
        if seen == units {
            return Some(idx);
        }
        if seen > units {
            return None;
        }
        seen += ch.len_utf16();
    }
    (seen == units).then_some(text.len())
}
