pub mod classifier;
pub mod client;
pub mod config;
pub mod heuristics;
pub mod input;
pub mod label;
pub mod render;
pub mod span;
pub mod text;

// Re-export main types for convenient access
pub use classifier::{
    select_candidates, Candidate, ClassificationResult, ContentClassifier, PipelineIssue, PipelineStage, Resolution,
};
pub use client::{
    ClassificationClient, ClassifyError, ModelBackend, OfflineBackend, OpenAiCompatBackend, SchemaError, Stage,
    Stage1Result, Stage2Outcome, Stage2Result, TransportError,
};
pub use config::{BatchConfig, ClassifierConfig, ConfigError, ModelConfig, RetryConfig};
pub use heuristics::{GateDecision, GateRule, HeuristicGate};
pub use input::ExtractedPage;
pub use label::Label;
pub use render::{HtmlRenderer, JsonRenderer, Renderer};
pub use span::{check_coverage, validate_coverage, CoverageError, Span};
pub use text::{normalize_text, Sentence, SentenceSplitter};
