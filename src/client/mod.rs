// WHY: Model invocation contract for both classification stages
// Transport failures are retried; schema violations fail the batch immediately

use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, info, warn};

pub mod batching;
pub mod offline;
pub mod openai;
pub mod schema;

pub use batching::{batch_size, plan_batches};
pub use offline::OfflineBackend;
pub use openai::OpenAiCompatBackend;
pub use schema::{extract_json_array, SchemaError, Stage1Result, Stage2Result};

use crate::config::RetryConfig;
use crate::span::{check_coverage, CoverageError};
use crate::text::Sentence;

/// Which classification pass a request belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Sentence-level labels plus the model's phrase-level flag
    Stage1,
    /// Character spans for flagged sentences
    Stage2,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Stage1 => f.write_str("stage1"),
            Stage::Stage2 => f.write_str("stage2"),
        }
    }
}

/// Failure to get any text back from the model
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    #[error("request to model endpoint failed: {0}")]
    Request(String),
    #[error("model endpoint returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("model call timed out after {0:?}")]
    Timeout(Duration),
    #[error("model returned an empty completion")]
    EmptyCompletion,
}

/// Batch-level failure handed to the orchestrator
#[derive(Debug, Error)]
pub enum ClassifyError {
    #[error("model call failed after {attempts} attempts: {last}")]
    RetriesExhausted { attempts: u32, last: TransportError },
    #[error("schema validation failed: {0}")]
    Schema(#[from] SchemaError),
    #[error("failed to encode request: {0}")]
    Encode(#[source] serde_json::Error),
}

/// Submit a batch payload, receive the model's raw text
#[async_trait]
pub trait ModelBackend: Send + Sync {
    async fn complete(&self, stage: Stage, payload: &str) -> Result<String, TransportError>;

    fn name(&self) -> &str;
}

#[async_trait]
impl<T: ModelBackend + ?Sized> ModelBackend for Arc<T> {
    async fn complete(&self, stage: Stage, payload: &str) -> Result<String, TransportError> {
        (**self).complete(stage, payload).await
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

#[async_trait]
impl<T: ModelBackend + ?Sized> ModelBackend for Box<T> {
    async fn complete(&self, stage: Stage, payload: &str) -> Result<String, TransportError> {
        (**self).complete(stage, payload).await
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

/// Per-sentence verdict on a schema-valid Stage 2 result
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stage2Outcome {
    Accepted(Stage2Result),
    Rejected {
        result: Stage2Result,
        reason: CoverageError,
    },
}

impl Stage2Outcome {
    pub fn hash(&self) -> &str {
        match self {
            Stage2Outcome::Accepted(result) => &result.hash,
            Stage2Outcome::Rejected { result, .. } => &result.hash,
        }
    }

    pub fn is_accepted(&self) -> bool {
        matches!(self, Stage2Outcome::Accepted(_))
    }
}

pub struct ClassificationClient<B> {
    backend: B,
    retry: RetryConfig,
}

impl<B: ModelBackend> ClassificationClient<B> {
    pub fn new(backend: B, retry: RetryConfig) -> Self {
        Self { backend, retry }
    }

    /// Sentence-level labels; same length and hash order as `sentences`
    pub async fn classify_stage1(&self, sentences: &[Sentence]) -> Result<Vec<Stage1Result>, ClassifyError> {
        if sentences.is_empty() {
            return Ok(Vec::new());
        }

        let payload = schema::encode_request(sentences).map_err(ClassifyError::Encode)?;
        info!(sentences = sentences.len(), "Sending stage 1 batch");

        let response = self.call_with_retry(Stage::Stage1, &payload).await?;
        let results = schema::parse_stage1_response(&response, sentences).map_err(|e| {
            error!(error = %e, "Stage 1 response failed validation");
            debug!("Stage 1 response text: {}", preview(&response));
            e
        })?;

        Ok(results)
    }

    /// Phrase-level spans; coverage failures are reported per sentence, not per batch
    pub async fn classify_stage2(&self, sentences: &[Sentence]) -> Result<Vec<Stage2Outcome>, ClassifyError> {
        if sentences.is_empty() {
            return Ok(Vec::new());
        }

        let payload = schema::encode_request(sentences).map_err(ClassifyError::Encode)?;
        info!(sentences = sentences.len(), "Sending stage 2 batch");

        let response = self.call_with_retry(Stage::Stage2, &payload).await?;
        let results = schema::parse_stage2_response(&response, sentences).map_err(|e| {
            error!(error = %e, "Stage 2 response failed validation");
            debug!("Stage 2 response text: {}", preview(&response));
            e
        })?;

        let outcomes = results
            .into_iter()
            .zip(sentences)
            .map(|(mut result, sentence)| {
                // Consumers walk spans in document order
                result.spans.sort_by_key(|span| span.start);
                match check_coverage(&sentence.text, &result.spans) {
                    Ok(()) => Stage2Outcome::Accepted(result),
                    Err(reason) => {
                        warn!(hash = %sentence.hash, %reason, "Stage 2 spans rejected");
                        Stage2Outcome::Rejected { result, reason }
                    }
                }
            })
            .collect();

        Ok(outcomes)
    }

    async fn call_with_retry(&self, stage: Stage, payload: &str) -> Result<String, ClassifyError> {
        let attempts = self.retry.max_attempts.max(1);
        let mut attempt = 0u32;

        loop {
            match self.backend.complete(stage, payload).await {
                Ok(text) => {
                    debug!(%stage, chars = text.len(), "Model response received");
                    return Ok(text);
                }
                Err(e) => {
                    attempt += 1;
                    if attempt >= attempts {
                        error!(%stage, attempts, error = %e, "Model call failed, retries exhausted");
                        return Err(ClassifyError::RetriesExhausted { attempts, last: e });
                    }

                    let delay = self.retry.delay_for(attempt - 1);
                    warn!(%stage, attempt, ?delay, error = %e, "Model call failed, retrying");
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}

fn preview(text: &str) -> String {
    text.chars().take(500).collect()
}
