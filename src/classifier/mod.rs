// WHY: Orchestrates one document through normalize → split → Stage 1 → gate → Stage 2
// Never fails: batch errors degrade to defaults and panics yield a partial result

use anyhow::Result;
use futures::stream::{self, StreamExt};
use futures::FutureExt;
use indicatif::ProgressBar;
use std::any::Any;
use std::collections::BTreeMap;
use std::panic::AssertUnwindSafe;
use std::sync::{Mutex, PoisonError};
use tracing::{error, info, warn};

pub mod result;

pub use result::{
    CandidateTrace, ClassificationResult, DebugTrace, LabelStatistics, PipelineIssue, PipelineStage,
    Resolution,
};

use crate::client::{plan_batches, ClassificationClient, ModelBackend, Stage1Result, Stage2Outcome, Stage2Result};
use crate::config::{BatchConfig, ClassifierConfig};
use crate::heuristics::{GateRule, HeuristicGate};
use crate::label::Label;
use crate::text::{estimate_tokens, normalize_with_changes, Sentence, SentenceSplitter};

/// Sentence selected for phrase-level analysis and the reasons it was picked
#[derive(Debug, Clone)]
pub struct Candidate {
    pub sentence: Sentence,
    pub model_flagged: bool,
    pub heuristic_rules: Vec<GateRule>,
}

/// Union of the model's flag and the heuristic gate
/// `stage1` is aligned with `sentences` by position
pub fn select_candidates(gate: &HeuristicGate, sentences: &[Sentence], stage1: &[Stage1Result]) -> Vec<Candidate> {
    let mut candidates = Vec::new();
    let mut model_flagged = 0usize;
    let mut heuristic_only = 0usize;

    for (i, sentence) in sentences.iter().enumerate() {
        let flagged = stage1.get(i).is_some_and(|r| r.needs_phrase_level);
        let decision = gate.evaluate(&sentence.text);

        if flagged || decision.needs_phrase_level() {
            if flagged {
                model_flagged += 1;
            } else {
                heuristic_only += 1;
            }
            candidates.push(Candidate {
                sentence: sentence.clone(),
                model_flagged: flagged,
                heuristic_rules: decision.rules,
            });
        }
    }

    if candidates.is_empty() {
        info!("Stage 2: No candidates selected");
    } else {
        info!(
            candidates = candidates.len(),
            model_flagged, heuristic_only, "Stage 2: candidates selected"
        );
    }
    candidates
}

/// Stage outputs captured so far; survives a panic inside the pipeline
#[derive(Debug, Default)]
struct RunState {
    stage: PipelineStage,
    sentences: Vec<Sentence>,
    stage1: Vec<Stage1Result>,
    stage2: Vec<Stage2Result>,
    issues: Vec<PipelineIssue>,
    debug: Option<DebugTrace>,
}

impl RunState {
    fn into_result(self) -> ClassificationResult {
        ClassificationResult::new(self.sentences, self.stage1, self.stage2, self.issues, self.debug)
    }
}

fn record(state: &Mutex<RunState>, update: impl FnOnce(&mut RunState)) {
    let mut guard = state.lock().unwrap_or_else(PoisonError::into_inner);
    update(&mut guard);
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

pub struct ContentClassifier<B> {
    splitter: SentenceSplitter,
    gate: HeuristicGate,
    client: ClassificationClient<B>,
    batching: BatchConfig,
    debug: bool,
    progress: ProgressBar,
}

impl<B: ModelBackend> ContentClassifier<B> {
    pub fn new(backend: B, config: &ClassifierConfig) -> Result<Self> {
        Ok(Self {
            splitter: SentenceSplitter::new()?,
            gate: HeuristicGate::new()?,
            client: ClassificationClient::new(backend, config.retry.clone()),
            batching: config.batching.clone(),
            debug: config.debug,
            progress: ProgressBar::hidden(),
        })
    }

    /// Report batch progress on `bar`; hidden by default
    pub fn with_progress(mut self, bar: ProgressBar) -> Self {
        self.progress = bar;
        self
    }

    /// Classify one document; always returns a renderable result
    pub async fn classify(&self, raw: &str) -> ClassificationResult {
        let state = Mutex::new(RunState::default());

        let outcome = AssertUnwindSafe(self.run_pipeline(raw, &state)).catch_unwind().await;

        let mut state = state.into_inner().unwrap_or_else(PoisonError::into_inner);
        if let Err(payload) = outcome {
            let message = panic_message(payload.as_ref());
            error!(stage = ?state.stage, %message, "Classification aborted, returning partial result");
            state.issues.push(PipelineIssue::Aborted {
                stage: state.stage,
                message,
            });
        }
        self.progress.finish_and_clear();
        state.into_result()
    }

    async fn run_pipeline(&self, raw: &str, state: &Mutex<RunState>) {
        let (normalized, changes) = normalize_with_changes(raw);
        record(state, |s| {
            s.stage = PipelineStage::Normalized;
            if self.debug {
                s.debug = Some(DebugTrace {
                    raw_input: raw.to_string(),
                    normalized_text: normalized.clone(),
                    normalization_changes: changes,
                    candidates: Vec::new(),
                });
            }
        });

        let sentences = self.splitter.split(&normalized);
        record(state, |s| {
            s.stage = PipelineStage::Split;
            s.sentences = sentences.clone();
        });
        if sentences.is_empty() {
            info!("No sentences found, nothing to classify");
            record(state, |s| s.stage = PipelineStage::Resolved);
            return;
        }

        let stage1 = self.run_stage1(&sentences, state).await;
        record(state, |s| s.stage = PipelineStage::Stage1Complete);

        let candidates = select_candidates(&self.gate, &sentences, &stage1);
        record(state, |s| {
            s.stage = PipelineStage::CandidatesSelected;
            if let Some(debug) = s.debug.as_mut() {
                debug.candidates = candidates
                    .iter()
                    .map(|c| CandidateTrace {
                        index: c.sentence.index,
                        hash: c.sentence.hash.clone(),
                        model_flagged: c.model_flagged,
                        heuristic_rules: c.heuristic_rules.clone(),
                    })
                    .collect();
            }
        });

        if !candidates.is_empty() {
            let candidate_sentences: Vec<Sentence> = candidates.into_iter().map(|c| c.sentence).collect();
            self.run_stage2(&candidate_sentences, state).await;
        }
        record(state, |s| s.stage = PipelineStage::Stage2Complete);

        record(state, |s| s.stage = PipelineStage::Resolved);
    }

    async fn run_stage1(&self, sentences: &[Sentence], state: &Mutex<RunState>) -> Vec<Stage1Result> {
        let batches = plan_batches(sentences, &self.batching);
        let total_tokens: usize = sentences.iter().map(|s| estimate_tokens(&s.text)).sum();
        info!(
            sentences = sentences.len(),
            batches = batches.len(),
            tokens = total_tokens,
            "Stage 1: dispatching"
        );
        self.start_progress("stage 1", batches.len());

        let client = &self.client;
        let mut responses = stream::iter(batches.into_iter().enumerate())
            .map(move |(n, range)| {
                let batch = &sentences[range];
                async move { (n, batch, client.classify_stage1(batch).await) }
            })
            .buffered(self.batching.max_concurrent_batches.max(1));

        let mut results = Vec::with_capacity(sentences.len());
        while let Some((n, batch, outcome)) = responses.next().await {
            let batch_results = match outcome {
                Ok(batch_results) => batch_results,
                Err(e) => {
                    warn!(batch = n + 1, sentences = batch.len(), error = %e, "Stage 1 batch failed, labelling as info");
                    record(state, |s| {
                        s.issues.push(PipelineIssue::Stage1BatchFallback {
                            batch: n,
                            sentences: batch.len(),
                            error: e.to_string(),
                        })
                    });
                    batch.iter().map(Stage1Result::fallback).collect()
                }
            };
            record(state, |s| s.stage1.extend(batch_results.iter().cloned()));
            results.extend(batch_results);
            self.progress.inc(1);
        }

        log_label_counts(&results);
        results
    }

    async fn run_stage2(&self, candidates: &[Sentence], state: &Mutex<RunState>) {
        let batches = plan_batches(candidates, &self.batching);
        info!(candidates = candidates.len(), batches = batches.len(), "Stage 2: dispatching");
        self.start_progress("stage 2", batches.len());

        let client = &self.client;
        let mut responses = stream::iter(batches.into_iter().enumerate())
            .map(move |(n, range)| {
                let batch = &candidates[range];
                async move { (n, batch, client.classify_stage2(batch).await) }
            })
            .buffered(self.batching.max_concurrent_batches.max(1));

        let mut accepted = 0usize;
        let mut rejected = 0usize;
        while let Some((n, batch, outcome)) = responses.next().await {
            match outcome {
                Ok(outcomes) => {
                    for outcome in outcomes {
                        match outcome {
                            Stage2Outcome::Accepted(result) => {
                                accepted += 1;
                                record(state, |s| s.stage2.push(result));
                            }
                            Stage2Outcome::Rejected { result, reason } => {
                                rejected += 1;
                                record(state, |s| {
                                    s.issues.push(PipelineIssue::SpansRejected {
                                        hash: result.hash,
                                        reason: reason.to_string(),
                                    })
                                });
                            }
                        }
                    }
                }
                Err(e) => {
                    warn!(batch = n + 1, sentences = batch.len(), error = %e, "Stage 2 batch failed, keeping stage 1 labels");
                    record(state, |s| {
                        s.issues.push(PipelineIssue::Stage2BatchDropped {
                            batch: n,
                            sentences: batch.len(),
                            error: e.to_string(),
                        })
                    });
                }
            }
            self.progress.inc(1);
        }

        info!(accepted, rejected, "Stage 2 complete");
    }

    fn start_progress(&self, stage: &'static str, batches: usize) {
        self.progress.reset();
        self.progress.set_length(batches as u64);
        self.progress.set_message(stage);
    }
}

fn log_label_counts(results: &[Stage1Result]) {
    let mut counts: BTreeMap<Label, usize> = BTreeMap::new();
    for result in results {
        *counts.entry(result.label).or_default() += 1;
    }
    let flagged = results.iter().filter(|r| r.needs_phrase_level).count();

    info!(
        info = counts.get(&Label::Info).copied().unwrap_or(0),
        promo = counts.get(&Label::Promo).copied().unwrap_or(0),
        risk = counts.get(&Label::Risk).copied().unwrap_or(0),
        flagged,
        "Stage 1 complete"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stage1_for(sentences: &[Sentence], flags: &[bool]) -> Vec<Stage1Result> {
        sentences
            .iter()
            .zip(flags)
            .map(|(s, &flag)| Stage1Result {
                hash: s.hash.clone(),
                label: Label::Info,
                needs_phrase_level: flag,
            })
            .collect()
    }

    #[test]
    fn test_candidates_are_a_union() {
        let gate = HeuristicGate::new().unwrap();
        let sentences = vec![
            Sentence::new(0, "The cat sat on the mat."),
            Sentence::new(1, "The dog slept by the door."),
            Sentence::new(2, "Deposit 100€ and get 50 free spins."),
        ];
        assert!(!gate.needs_phrase_level(&sentences[0].text));
        assert!(!gate.needs_phrase_level(&sentences[1].text));
        assert!(gate.needs_phrase_level(&sentences[2].text));

        // Model flags sentence 1 only; the gate adds sentence 2
        let stage1 = stage1_for(&sentences, &[false, true, false]);
        let candidates = select_candidates(&gate, &sentences, &stage1);
        let indices: Vec<usize> = candidates.iter().map(|c| c.sentence.index).collect();
        assert_eq!(indices, vec![1, 2]);

        assert!(candidates[0].model_flagged);
        assert!(candidates[0].heuristic_rules.is_empty());
        assert!(!candidates[1].model_flagged);
        assert!(candidates[1].heuristic_rules.contains(&GateRule::NumbersWithActions));
    }

    #[test]
    fn test_no_candidates_when_nothing_flags() {
        let gate = HeuristicGate::new().unwrap();
        let sentences = vec![Sentence::new(0, "The cat sat on the mat.")];
        let stage1 = stage1_for(&sentences, &[false]);
        assert!(select_candidates(&gate, &sentences, &stage1).is_empty());
    }

    #[test]
    fn test_panic_message_extraction() {
        let payload: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(payload.as_ref()), "boom");
        let payload: Box<dyn Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(payload.as_ref()), "bang");
        let payload: Box<dyn Any + Send> = Box::new(42u8);
        assert_eq!(panic_message(payload.as_ref()), "unknown panic");
    }
}
