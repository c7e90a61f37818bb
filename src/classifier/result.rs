// WHY: Read-only aggregate handed to renderers
// Resolution and statistics are computed once at construction

use serde::Serialize;
use std::collections::HashMap;

use crate::client::{Stage1Result, Stage2Result};
use crate::heuristics::GateRule;
use crate::label::Label;
use crate::span::Span;
use crate::text::{NormalizationChange, Sentence};

/// Pipeline position, used to report where a run stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    #[default]
    Start,
    Normalized,
    Split,
    Stage1Complete,
    CandidatesSelected,
    Stage2Complete,
    Resolved,
}

/// Degradation recorded during a run; the result is still complete
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PipelineIssue {
    /// Stage 1 batch failed; its sentences were labelled `info`
    Stage1BatchFallback { batch: usize, sentences: usize, error: String },
    /// Stage 2 batch failed; its sentences keep their Stage 1 labels
    Stage2BatchDropped { batch: usize, sentences: usize, error: String },
    /// Stage 2 spans did not tile the sentence
    SpansRejected { hash: String, reason: String },
    /// The pipeline stopped early; the result holds what was captured before
    Aborted { stage: PipelineStage, message: String },
}

/// Final classification of one sentence
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Resolution {
    PhraseLevel { spans: Vec<Span> },
    SentenceLevel { label: Label },
}

/// Character counts per label across the document
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LabelStatistics {
    pub info_chars: usize,
    pub promo_chars: usize,
    pub risk_chars: usize,
    pub total_chars: usize,
    pub phrase_level_sentences: usize,
}

impl LabelStatistics {
    pub fn chars(&self, label: Label) -> usize {
        match label {
            Label::Info => self.info_chars,
            Label::Promo => self.promo_chars,
            Label::Risk => self.risk_chars,
        }
    }

    /// Share of characters carrying `label`, 0.0..=100.0
    pub fn percentage(&self, label: Label) -> f64 {
        if self.total_chars == 0 {
            return 0.0;
        }
        self.chars(label) as f64 * 100.0 / self.total_chars as f64
    }

    fn add(&mut self, label: Label, chars: usize) {
        match label {
            Label::Info => self.info_chars += chars,
            Label::Promo => self.promo_chars += chars,
            Label::Risk => self.risk_chars += chars,
        }
        self.total_chars += chars;
    }
}

/// Why a sentence went to Stage 2
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CandidateTrace {
    pub index: usize,
    pub hash: String,
    pub model_flagged: bool,
    pub heuristic_rules: Vec<GateRule>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DebugTrace {
    pub raw_input: String,
    pub normalized_text: String,
    pub normalization_changes: Vec<NormalizationChange>,
    pub candidates: Vec<CandidateTrace>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClassificationResult {
    sentences: Vec<Sentence>,
    resolutions: Vec<Resolution>,
    stage1_results: Vec<Stage1Result>,
    stage2_results: Vec<Stage2Result>,
    statistics: LabelStatistics,
    issues: Vec<PipelineIssue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    debug: Option<DebugTrace>,
    #[serde(skip)]
    stage1_map: HashMap<String, usize>,
    #[serde(skip)]
    stage2_map: HashMap<String, usize>,
}

impl ClassificationResult {
    pub fn new(
        sentences: Vec<Sentence>,
        stage1_results: Vec<Stage1Result>,
        stage2_results: Vec<Stage2Result>,
        issues: Vec<PipelineIssue>,
        debug: Option<DebugTrace>,
    ) -> Self {
        let mut stage1_map = HashMap::with_capacity(stage1_results.len());
        for (i, result) in stage1_results.iter().enumerate() {
            stage1_map.entry(result.hash.clone()).or_insert(i);
        }
        let mut stage2_map = HashMap::with_capacity(stage2_results.len());
        for (i, result) in stage2_results.iter().enumerate() {
            stage2_map.entry(result.hash.clone()).or_insert(i);
        }

        let mut result = Self {
            sentences,
            resolutions: Vec::new(),
            stage1_results,
            stage2_results,
            statistics: LabelStatistics::default(),
            issues,
            debug,
            stage1_map,
            stage2_map,
        };

        let mut statistics = LabelStatistics::default();
        let resolutions: Vec<Resolution> = result
            .sentences
            .iter()
            .map(|sentence| {
                let resolution = result.classification(&sentence.hash);
                match &resolution {
                    Resolution::PhraseLevel { spans } => {
                        statistics.phrase_level_sentences += 1;
                        for span in spans {
                            statistics.add(span.label, span.len());
                        }
                    }
                    Resolution::SentenceLevel { label } => statistics.add(*label, sentence.char_len()),
                }
                resolution
            })
            .collect();

        result.resolutions = resolutions;
        result.statistics = statistics;
        result
    }

    /// Resolve by hash: Stage 2 spans, else Stage 1 label, else `info`
    pub fn classification(&self, hash: &str) -> Resolution {
        if let Some(&i) = self.stage2_map.get(hash) {
            return Resolution::PhraseLevel {
                spans: self.stage2_results[i].spans.clone(),
            };
        }
        if let Some(&i) = self.stage1_map.get(hash) {
            return Resolution::SentenceLevel {
                label: self.stage1_results[i].label,
            };
        }
        Resolution::SentenceLevel { label: Label::Info }
    }

    /// Sentences paired with their resolved classification, in document order
    pub fn resolved(&self) -> impl Iterator<Item = (&Sentence, &Resolution)> {
        self.sentences.iter().zip(&self.resolutions)
    }

    pub fn sentences(&self) -> &[Sentence] {
        &self.sentences
    }

    pub fn stage1_results(&self) -> &[Stage1Result] {
        &self.stage1_results
    }

    pub fn stage2_results(&self) -> &[Stage2Result] {
        &self.stage2_results
    }

    pub fn statistics(&self) -> &LabelStatistics {
        &self.statistics
    }

    pub fn issues(&self) -> &[PipelineIssue] {
        &self.issues
    }

    pub fn debug(&self) -> Option<&DebugTrace> {
        self.debug.as_ref()
    }

    pub fn is_empty(&self) -> bool {
        self.sentences.is_empty()
    }

    /// True when any stage had to fall back or stop early
    pub fn is_degraded(&self) -> bool {
        !self.issues.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stage1(sentence: &Sentence, label: Label) -> Stage1Result {
        Stage1Result {
            hash: sentence.hash.clone(),
            label,
            needs_phrase_level: false,
        }
    }

    #[test]
    fn test_resolution_precedence_and_default() {
        let a = Sentence::new(0, "Win big!");
        let b = Sentence::new(1, "Terms apply.");
        let c = Sentence::new(2, "Unseen sentence.");

        let result = ClassificationResult::new(
            vec![a.clone(), b.clone(), c.clone()],
            vec![stage1(&a, Label::Promo), stage1(&b, Label::Risk)],
            vec![Stage2Result {
                hash: b.hash.clone(),
                spans: vec![Span::new(0, 5, Label::Risk), Span::new(5, 12, Label::Info)],
            }],
            Vec::new(),
            None,
        );

        assert_eq!(result.classification(&a.hash), Resolution::SentenceLevel { label: Label::Promo });
        assert!(matches!(result.classification(&b.hash), Resolution::PhraseLevel { .. }));
        assert_eq!(result.classification(&c.hash), Resolution::SentenceLevel { label: Label::Info });
        assert_eq!(result.classification("unknown"), Resolution::SentenceLevel { label: Label::Info });
    }

    #[test]
    fn test_statistics_count_characters() {
        let a = Sentence::new(0, "Win big!");
        let b = Sentence::new(1, "Terms apply.");
        let result = ClassificationResult::new(
            vec![a.clone(), b.clone()],
            vec![stage1(&a, Label::Promo), stage1(&b, Label::Info)],
            vec![Stage2Result {
                hash: b.hash.clone(),
                spans: vec![Span::new(0, 5, Label::Risk), Span::new(5, 12, Label::Info)],
            }],
            Vec::new(),
            None,
        );

        let stats = result.statistics();
        assert_eq!(stats.promo_chars, 8);
        assert_eq!(stats.risk_chars, 5);
        assert_eq!(stats.info_chars, 7);
        assert_eq!(stats.total_chars, 20);
        assert_eq!(stats.phrase_level_sentences, 1);
        assert!((stats.percentage(Label::Promo) - 40.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_result() {
        let result = ClassificationResult::new(Vec::new(), Vec::new(), Vec::new(), Vec::new(), None);
        assert!(result.is_empty());
        assert!(!result.is_degraded());
        assert_eq!(result.statistics().total_chars, 0);
        assert_eq!(result.statistics().percentage(Label::Info), 0.0);
    }

    #[test]
    fn test_serialized_resolution_tags() {
        let value = serde_json::to_value(Resolution::SentenceLevel { label: Label::Risk }).unwrap();
        assert_eq!(value["type"], "sentence_level");
        assert_eq!(value["label"], "risk");
    }
}
