// WHY: Coverage validation gates both Stage 2 acceptance and structural rendering
// All-or-nothing: a span set either tiles the sentence exactly or is rejected

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::label::Label;

/// Half-open character range `[start, end)` within one sentence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    pub label: Label,
}

impl Span {
    pub fn new(start: usize, end: usize, label: Label) -> Self {
        Self { start, end, label }
    }

    /// Length in characters
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Borrow the covered text; offsets beyond the end clamp to the text length
    pub fn slice<'a>(&self, text: &'a str) -> &'a str {
        let start = char_to_byte(text, self.start);
        let end = char_to_byte(text, self.end).max(start);
        &text[start..end]
    }
}

fn char_to_byte(text: &str, char_idx: usize) -> usize {
    text.char_indices()
        .nth(char_idx)
        .map_or(text.len(), |(byte_idx, _)| byte_idx)
}

/// First condition a span set violated
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoverageError {
    #[error("no spans supplied")]
    Empty,
    #[error("span {start}..{end} is empty or reversed")]
    Degenerate { start: usize, end: usize },
    #[error("span {start}..{end} exceeds sentence length {len}")]
    OutOfBounds { start: usize, end: usize, len: usize },
    #[error("first span starts at {0}, expected 0")]
    UncoveredStart(usize),
    #[error("last span ends at {end}, expected {len}")]
    UncoveredEnd { end: usize, len: usize },
    #[error("gap between {end} and {next_start}")]
    Gap { end: usize, next_start: usize },
    #[error("span ending at {end} overlaps span starting at {next_start}")]
    Overlap { end: usize, next_start: usize },
}

/// Check that `spans` exactly partition `text` (character offsets)
pub fn check_coverage(text: &str, spans: &[Span]) -> Result<(), CoverageError> {
    if spans.is_empty() {
        return Err(CoverageError::Empty);
    }

    let len = text.chars().count();
    let mut sorted = spans.to_vec();
    sorted.sort_by_key(|span| span.start);

    for span in &sorted {
        if span.start >= span.end {
            return Err(CoverageError::Degenerate {
                start: span.start,
                end: span.end,
            });
        }
        if span.end > len {
            return Err(CoverageError::OutOfBounds {
                start: span.start,
                end: span.end,
                len,
            });
        }
    }

    if sorted[0].start != 0 {
        return Err(CoverageError::UncoveredStart(sorted[0].start));
    }

    let last_end = sorted[sorted.len() - 1].end;
    if last_end != len {
        return Err(CoverageError::UncoveredEnd { end: last_end, len });
    }

    // A single equality check per pair rules out both gaps and overlaps
    for pair in sorted.windows(2) {
        let (end, next_start) = (pair[0].end, pair[1].start);
        if end < next_start {
            return Err(CoverageError::Gap { end, next_start });
        }
        if end > next_start {
            return Err(CoverageError::Overlap { end, next_start });
        }
    }

    Ok(())
}

/// Boolean form of [`check_coverage`]
pub fn validate_coverage(text: &str, spans: &[Span]) -> bool {
    check_coverage(text, spans).is_ok()
}
