// WHY: Keep each request under the token budget so responses are not truncated
// Batches are consecutive index ranges; concatenating results restores input order

use std::ops::Range;

use crate::config::BatchConfig;
use crate::text::{estimate_tokens, Sentence};

/// Sentences per batch for this input under `config`
pub fn batch_size(sentences: &[Sentence], config: &BatchConfig) -> usize {
    if sentences.is_empty() {
        return 0;
    }

    let count = sentences.len();
    let total_tokens: usize = sentences.iter().map(|s| estimate_tokens(&s.text)).sum();
    let target = config.target_tokens_per_batch.max(1);

    let mut size = if total_tokens <= target {
        count
    } else {
        let avg_tokens_per_sentence = total_tokens as f64 / count as f64;
        ((target as f64 / avg_tokens_per_sentence) as usize).max(1)
    };

    // Large inputs get smaller batches; long responses truncate more often
    if count > config.max_sentences_per_batch {
        size = size.min(config.max_sentences_per_batch.max(1));
    }

    size
}

/// Consecutive index ranges covering every sentence exactly once
pub fn plan_batches(sentences: &[Sentence], config: &BatchConfig) -> Vec<Range<usize>> {
    let size = batch_size(sentences, config);
    if size == 0 {
        return Vec::new();
    }

    (0..sentences.len())
        .step_by(size)
        .map(|start| start..(start + size).min(sentences.len()))
        .collect()
}
