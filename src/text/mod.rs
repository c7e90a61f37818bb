// WHY: Text preparation shared by the classifier and the request encoder
// Sentences carry the content hash that correlates model responses back to them

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

pub mod abbreviations;
pub mod normalization;
pub mod splitter;

pub use abbreviations::AbbreviationChecker;
pub use normalization::{normalize_text, normalize_text_into, normalize_with_changes, NormalizationChange};
pub use splitter::SentenceSplitter;

/// Number of hex characters kept from the SHA-256 digest
pub const HASH_HEX_LEN: usize = 16;

/// Rough cost model used for batching: 4 characters per token
pub const CHARS_PER_TOKEN: usize = 4;

/// One sentence of a document, immutable once emitted by the splitter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sentence {
    /// Stable 0-based position in the document
    pub index: usize,
    /// Normalized, trimmed sentence text
    pub text: String,
    /// Fingerprint of the normalized text, echoed back by the model
    pub hash: String,
}

impl Sentence {
    /// Build a sentence from arbitrary text; text is re-normalized before hashing
    pub fn new(index: usize, text: &str) -> Self {
        let normalized = normalize_text(text);
        let hash = content_hash(&normalized);
        Self {
            index,
            text: normalized,
            hash,
        }
    }

    /// Length in characters, the unit span offsets are measured in
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}

/// Hash already-normalized text
pub fn content_hash(normalized: &str) -> String {
    let digest = Sha256::digest(normalized.as_bytes());
    let mut hash = hex::encode(digest);
    hash.truncate(HASH_HEX_LEN);
    hash
}

/// Approximate token count for batching decisions
pub fn estimate_tokens(text: &str) -> usize {
    text.chars().count() / CHARS_PER_TOKEN
}
