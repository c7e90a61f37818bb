// WHY: Normalization is the single source of truth for sentence text and hashes
// Both the splitter and the request encoder go through these functions

use serde::Serialize;
use std::fmt;

/// Rule that altered the input during normalization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NormalizationChange {
    TrimmedWhitespace,
    CollapsedSpaces,
    NormalizedNewlines,
}

impl fmt::Display for NormalizationChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::TrimmedWhitespace => "Trimmed leading/trailing whitespace",
            Self::CollapsedSpaces => "Collapsed multiple spaces",
            Self::NormalizedNewlines => "Normalized newlines to \\n",
        };
        f.write_str(text)
    }
}

/// Normalize text: trim, collapse runs of ASCII spaces, CRLF/CR to LF
/// Case, punctuation, diacritics, `€` and `%` are left untouched
pub fn normalize_text(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    normalize_text_into(text, &mut result);
    result
}

/// Normalize into supplied buffer to avoid allocation
pub fn normalize_text_into(text: &str, buffer: &mut String) {
    buffer.clear();
    let trimmed = text.trim();
    buffer.reserve(trimmed.len());

    let mut chars = trimmed.chars().peekable();
    let mut prev_was_space = false;

    while let Some(ch) = chars.next() {
        match ch {
            ' ' => {
                if !prev_was_space {
                    buffer.push(' ');
                }
                prev_was_space = true;
            }
            '\r' => {
                // \r\n collapses to a single \n
                if chars.peek() == Some(&'\n') {
                    chars.next();
                }
                buffer.push('\n');
                prev_was_space = false;
            }
            _ => {
                buffer.push(ch);
                prev_was_space = false;
            }
        }
    }
}

/// Normalize and report which rules changed the text
pub fn normalize_with_changes(text: &str) -> (String, Vec<NormalizationChange>) {
    let mut changes = Vec::new();
    let trimmed = text.trim();

    if trimmed.len() != text.len() {
        changes.push(NormalizationChange::TrimmedWhitespace);
    }
    if trimmed.contains("  ") {
        changes.push(NormalizationChange::CollapsedSpaces);
    }
    if trimmed.contains('\r') {
        changes.push(NormalizationChange::NormalizedNewlines);
    }

    (normalize_text(text), changes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_normalize_basic() {
        let input = "  Deposit   now\r\nand win.  ";
        assert_eq!(normalize_text(input), "Deposit now\nand win.");
    }

    #[test]
    fn test_normalize_into_buffer_reuse() {
        let mut buffer = String::new();

        normalize_text_into("One  two.", &mut buffer);
        assert_eq!(buffer, "One two.");

        normalize_text_into("Three\rfour.", &mut buffer);
        assert_eq!(buffer, "Three\nfour.");
    }

    #[test]
    fn test_normalize_preserves_symbols_and_case() {
        let input = "Saat 100 % BONUKSEN jopa 200€ asti – äläkä unohda ehtoja!";
        assert_eq!(normalize_text(input), input);
    }

    #[test]
    fn test_normalize_keeps_tabs_and_newlines() {
        // Only ASCII space runs collapse; other whitespace is kept verbatim
        let input = "Line one.\n\nLine\ttwo.";
        assert_eq!(normalize_text(input), input);
    }

    #[test]
    fn test_normalize_empty() {
        assert_eq!(normalize_text(""), "");
        assert_eq!(normalize_text(" \r\n\t "), "");
    }

    #[test]
    fn test_normalize_with_changes_reports_rules() {
        let (text, changes) = normalize_with_changes(" a  b\r\nc ");
        assert_eq!(text, "a b\nc");
        assert_eq!(
            changes,
            vec![
                NormalizationChange::TrimmedWhitespace,
                NormalizationChange::CollapsedSpaces,
                NormalizationChange::NormalizedNewlines,
            ]
        );

        let (_, changes) = normalize_with_changes("Already clean.");
        assert!(changes.is_empty());
    }

    proptest! {
        #[test]
        fn normalize_is_idempotent(input in "[ a-zA-Z0-9.%€\r\n\t]{0,64}") {
            let once = normalize_text(&input);
            prop_assert_eq!(normalize_text(&once), once);
        }
    }
}
