// WHY: Strict typed boundary for model responses
// Items are deserialized into concrete structs; no optimistic key lookups downstream

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::label::Label;
use crate::span::Span;
use crate::text::Sentence;

/// Request item sent to the model for both stages
#[derive(Debug, Clone, Serialize)]
pub struct RequestItem<'a> {
    pub hash: &'a str,
    pub text: &'a str,
}

/// Sentence-level label for one sentence
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stage1Result {
    pub hash: String,
    pub label: Label,
    #[serde(default)]
    pub needs_phrase_level: bool,
}

impl Stage1Result {
    /// Safe default used when a batch could not be classified
    pub fn fallback(sentence: &Sentence) -> Self {
        Self {
            hash: sentence.hash.clone(),
            label: Label::Info,
            needs_phrase_level: false,
        }
    }
}

/// Phrase-level spans for one sentence
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stage2Result {
    pub hash: String,
    pub spans: Vec<Span>,
}

/// Response did not satisfy the batch contract
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("no JSON array found in model response")]
    NoJsonArray,
    #[error("model response is not valid JSON: {0}")]
    Malformed(#[source] serde_json::Error),
    #[error("model response top-level value is not a list")]
    NotAList,
    #[error("response length ({got}) doesn't match input length ({expected})")]
    LengthMismatch { expected: usize, got: usize },
    #[error("result {index} is invalid: {source}")]
    InvalidItem {
        index: usize,
        #[source]
        source: serde_json::Error,
    },
    #[error("result {index} hash mismatch: expected {expected}, got {got}")]
    HashMismatch {
        index: usize,
        expected: String,
        got: String,
    },
}

/// Serialize a batch as a JSON array of `{hash, text}`
pub fn encode_request(sentences: &[Sentence]) -> Result<String, serde_json::Error> {
    let items: Vec<RequestItem<'_>> = sentences
        .iter()
        .map(|s| RequestItem {
            hash: &s.hash,
            text: &s.text,
        })
        .collect();
    serde_json::to_string(&items)
}

/// Find the first balanced `[...]` in a response that may carry prose around it
/// Brackets inside JSON string literals are ignored
pub fn extract_json_array(text: &str) -> Option<&str> {
    let start = text.find('[')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '[' => depth += 1,
            ']' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }

    None
}

pub fn parse_stage1_response(
    response: &str,
    sentences: &[Sentence],
) -> Result<Vec<Stage1Result>, SchemaError> {
    parse_batch(response, sentences)
}

pub fn parse_stage2_response(
    response: &str,
    sentences: &[Sentence],
) -> Result<Vec<Stage2Result>, SchemaError> {
    parse_batch(response, sentences)
}

/// Response item that echoes the hash of the sentence it answers
trait Correlated {
    fn hash(&self) -> &str;
}

impl Correlated for Stage1Result {
    fn hash(&self) -> &str {
        &self.hash
    }
}

impl Correlated for Stage2Result {
    fn hash(&self) -> &str {
        &self.hash
    }
}

fn parse_batch<T>(response: &str, sentences: &[Sentence]) -> Result<Vec<T>, SchemaError>
where
    T: DeserializeOwned + Correlated,
{
    let json = extract_json_array(response).ok_or(SchemaError::NoJsonArray)?;
    let value: serde_json::Value = serde_json::from_str(json).map_err(SchemaError::Malformed)?;
    let serde_json::Value::Array(items) = value else {
        return Err(SchemaError::NotAList);
    };

    if items.len() != sentences.len() {
        return Err(SchemaError::LengthMismatch {
            expected: sentences.len(),
            got: items.len(),
        });
    }

    let mut results = Vec::with_capacity(items.len());
    for (index, (item, sentence)) in items.into_iter().zip(sentences).enumerate() {
        let result: T =
            serde_json::from_value(item).map_err(|source| SchemaError::InvalidItem { index, source })?;
        if result.hash() != sentence.hash {
            return Err(SchemaError::HashMismatch {
                index,
                expected: sentence.hash.clone(),
                got: result.hash().to_string(),
            });
        }
        results.push(result);
    }

    Ok(results)
}
