// WHY: Model-free backend for --dry-run and local inspection of splitting and gating
// Answers every request with schema-valid, all-info results

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use super::{ModelBackend, Stage, TransportError};

#[derive(Debug, Deserialize)]
struct EchoItem {
    hash: String,
    text: String,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineBackend;

#[async_trait]
impl ModelBackend for OfflineBackend {
    async fn complete(&self, stage: Stage, payload: &str) -> Result<String, TransportError> {
        let items: Vec<EchoItem> = serde_json::from_str(payload)
            .map_err(|e| TransportError::Request(format!("offline backend got unreadable payload: {e}")))?;

        let response: Vec<serde_json::Value> = items
            .into_iter()
            .map(|item| match stage {
                Stage::Stage1 => json!({
                    "hash": item.hash,
                    "label": "info",
                    "needs_phrase_level": false,
                }),
                Stage::Stage2 => json!({
                    "hash": item.hash,
                    "spans": [{ "start": 0, "end": item.text.chars().count(), "label": "info" }],
                }),
            })
            .collect();

        Ok(serde_json::Value::Array(response).to_string())
    }

    fn name(&self) -> &str {
        "offline"
    }
}
