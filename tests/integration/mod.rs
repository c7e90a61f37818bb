// Integration test utilities and common code
// WHY: Centralized scripted backend avoids duplicating response plumbing across tests

#![allow(dead_code)]

use async_trait::async_trait;
use promoscan::{ClassifierConfig, Label, ModelBackend, Stage, TransportError};
use serde::Deserialize;
use serde_json::json;
use std::sync::Mutex;

/// One `{hash, text}` item as sent to the model
#[derive(Debug, Clone, Deserialize)]
pub struct Item {
    pub hash: String,
    pub text: String,
}

type Responder = Box<dyn Fn(Stage, &[Item]) -> Result<String, TransportError> + Send + Sync>;

/// Backend answering from a closure and recording every request
pub struct ScriptedBackend {
    respond: Responder,
    calls: Mutex<Vec<(Stage, Vec<Item>)>>,
}

impl ScriptedBackend {
    pub fn new<F>(respond: F) -> Self
    where
        F: Fn(Stage, &[Item]) -> Result<String, TransportError> + Send + Sync + 'static,
    {
        Self {
            respond: Box::new(respond),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Number of calls made for `stage`, retries included
    pub fn call_count(&self, stage: Stage) -> usize {
        self.calls.lock().unwrap().iter().filter(|(s, _)| *s == stage).count()
    }

    /// Texts sent for `stage`, one Vec per call
    pub fn batches(&self, stage: Stage) -> Vec<Vec<String>> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(s, _)| *s == stage)
            .map(|(_, items)| items.iter().map(|i| i.text.clone()).collect())
            .collect()
    }
}

#[async_trait]
impl ModelBackend for ScriptedBackend {
    async fn complete(&self, stage: Stage, payload: &str) -> Result<String, TransportError> {
        let items: Vec<Item> = serde_json::from_str(payload).expect("payload should be a JSON item array");
        self.calls.lock().unwrap().push((stage, items.clone()));
        (self.respond)(stage, &items)
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// Stage 1 answer; `classify` maps sentence text to label and phrase-level flag
pub fn stage1_response(items: &[Item], classify: impl Fn(&str) -> (Label, bool)) -> String {
    let results: Vec<_> = items
        .iter()
        .map(|item| {
            let (label, flag) = classify(&item.text);
            json!({ "hash": item.hash, "label": label, "needs_phrase_level": flag })
        })
        .collect();
    serde_json::Value::Array(results).to_string()
}

/// Stage 2 answer; `spans` maps sentence text to `(start, end, label)` triples
pub fn stage2_response(items: &[Item], spans: impl Fn(&str) -> Vec<(usize, usize, Label)>) -> String {
    let results: Vec<_> = items
        .iter()
        .map(|item| {
            let spans: Vec<_> = spans(&item.text)
                .into_iter()
                .map(|(start, end, label)| json!({ "start": start, "end": end, "label": label }))
                .collect();
            json!({ "hash": item.hash, "spans": spans })
        })
        .collect();
    serde_json::Value::Array(results).to_string()
}

/// Single span covering the whole sentence
pub fn whole(text: &str, label: Label) -> Vec<(usize, usize, Label)> {
    vec![(0, text.chars().count(), label)]
}

/// Defaults with millisecond retry delays
pub fn fast_config() -> ClassifierConfig {
    let mut config = ClassifierConfig::default();
    config.retry.base_delay_ms = 1;
    config.retry.max_delay_ms = 2;
    config
}

pub fn transport_failure() -> TransportError {
    TransportError::Status {
        status: 503,
        body: "upstream unavailable".to_string(),
    }
}
