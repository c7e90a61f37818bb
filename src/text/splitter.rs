// WHY: Narrow regex splitter tuned for marketing copy, not general-purpose NLP
// Boundary candidates come from a meta regex; exception rules run as post-processing

use anyhow::Result;
use regex_automata::meta::Regex;
use tracing::debug;

use super::{content_hash, normalize_text_into, AbbreviationChecker, Sentence};

/// Sentence-ending punctuation run, whitespace, then an ASCII capital or digit
const BOUNDARY_PATTERN: &str = r"[.!?]+\s+[A-Z0-9]";

/// Digit(s), optional whitespace, percent sign at the very end of the preceding text
const PERCENTAGE_PATTERN: &str = r"\d\s*%\s*$";

/// Why a candidate boundary was merged into the current sentence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MergeReason {
    Decimal,
    Abbreviation,
    Percentage,
}

pub struct SentenceSplitter {
    boundary: Regex,
    percentage: Regex,
    abbreviations: AbbreviationChecker,
}

impl SentenceSplitter {
    pub fn new() -> Result<Self> {
        let boundary = Regex::new(BOUNDARY_PATTERN)?;
        let percentage = Regex::new(PERCENTAGE_PATTERN)?;
        debug!("Compiled sentence boundary pattern: {}", BOUNDARY_PATTERN);

        Ok(Self {
            boundary,
            percentage,
            abbreviations: AbbreviationChecker::new(),
        })
    }

    /// Split normalized text into sentences
    /// Total: text without boundaries yields one sentence, empty text yields none
    pub fn split(&self, text: &str) -> Vec<Sentence> {
        let mut sentences = Vec::new();
        let mut buffer = String::new();
        let mut sentence_start = 0usize;

        for mat in self.boundary.find_iter(text) {
            let punct_start = mat.start();
            let punct_len = text[punct_start..]
                .bytes()
                .take_while(|b| matches!(b, b'.' | b'!' | b'?'))
                .count();
            let punct_end = punct_start + punct_len;
            // The trailing [A-Z0-9] is always a single ASCII byte
            let next_start = mat.end() - 1;

            let current = &text[sentence_start..punct_start];
            let ending = &text[punct_start..punct_end];
            let next_byte = text.as_bytes()[next_start];

            if let Some(reason) = self.merge_reason(current, ending, next_byte) {
                debug!(?reason, offset = punct_start, "Rejected candidate boundary");
                continue;
            }

            push_sentence(&mut sentences, &text[sentence_start..punct_end], &mut buffer);
            sentence_start = next_start;
        }

        push_sentence(&mut sentences, &text[sentence_start..], &mut buffer);

        debug!("Split {} characters into {} sentences", text.len(), sentences.len());
        sentences
    }

    /// Reason to keep a candidate boundary inside the current sentence, if any
    /// A trailing percentage only merges when the next sentence also opens with a digit
    fn merge_reason(&self, current: &str, ending: &str, next_byte: u8) -> Option<MergeReason> {
        let single_dot = ending == ".";

        if single_dot && current.chars().last().is_some_and(|c| c.is_ascii_digit()) {
            return Some(MergeReason::Decimal);
        }

        if self.abbreviations.ends_with_abbreviation(current) {
            return Some(MergeReason::Abbreviation);
        }

        // "5 %. 10 % next year" is one run of figures, "100 %. Stay tuned" is two sentences
        if single_dot && next_byte.is_ascii_digit() && self.percentage.is_match(current) {
            return Some(MergeReason::Percentage);
        }

        None
    }
}

fn push_sentence(sentences: &mut Vec<Sentence>, segment: &str, buffer: &mut String) {
    let trimmed = segment.trim();
    if trimmed.is_empty() {
        return;
    }

    // WHY: re-normalize so the hash matches no matter what the caller passed in
    normalize_text_into(trimmed, buffer);
    sentences.push(Sentence {
        index: sentences.len(),
        text: buffer.clone(),
        hash: content_hash(buffer),
    });
}
