// WHY: Centralized abbreviation handling for sentence boundary detection
// Entries are lowercase with trailing dots removed; interior dots are kept ("e.g")

use std::collections::HashSet;

/// Abbreviations that must not close a sentence when followed by a capital or digit
pub const ABBREVIATIONS: &[&str] = &[
    // Titles and common English short forms
    "dr", "mr", "mrs", "ms", "prof", "inc", "ltd", "corp", "co", "etc", "vs", "e.g", "i.e",
    "jr", "sr", "st", "ave", "blvd", "dept", "govt", "min", "max", "approx", "est",
    // Business and legal suffixes
    "gmbh", "llc", "plc", "sa", "bv", "nv", "ag", "kg", "oy", "ab", "as",
    // Contact and reference forms
    "tel", "fax", "www", "http", "https", "ftp", "no", "ref", "fig", "vol", "ed",
    // Months, weekdays, time of day
    "jan", "feb", "mar", "apr", "jun", "jul", "aug", "sep", "oct", "nov", "dec",
    "mon", "tue", "wed", "thu", "fri", "sat", "sun", "am", "pm",
];

/// Efficient abbreviation lookup using HashSet for O(1) performance
#[derive(Debug, Clone)]
pub struct AbbreviationChecker {
    abbreviations: HashSet<&'static str>,
}

impl AbbreviationChecker {
    pub fn new() -> Self {
        Self {
            abbreviations: ABBREVIATIONS.iter().copied().collect(),
        }
    }

    /// Check a single word, case-insensitively and ignoring trailing dots
    pub fn is_abbreviation(&self, word: &str) -> bool {
        let clean = word.trim_end_matches('.').to_lowercase();
        self.abbreviations.contains(clean.as_str())
    }

    /// Check whether the last word of `text` is an abbreviation
    /// Surrounding quotes and an opening parenthesis are stripped first
    pub fn ends_with_abbreviation(&self, text: &str) -> bool {
        match text.split_whitespace().last() {
            Some(last_word) => {
                let clean_word = last_word.trim_matches(|c: char| {
                    matches!(c, '"' | '\'' | '(' | '\u{201C}' | '\u{201D}' | '\u{2018}' | '\u{2019}')
                });
                self.is_abbreviation(clean_word)
            }
            None => false,
        }
    }
}

impl Default for AbbreviationChecker {
    fn default() -> Self {
        Self::new()
    }
}
