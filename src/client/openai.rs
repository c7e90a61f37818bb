use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{ModelBackend, Stage, TransportError};
use crate::config::ModelConfig;

const STAGE1_INSTRUCTIONS: &str = "You classify marketing and editorial sentences. \
The user message is a JSON array of objects {\"hash\", \"text\"}. \
Answer with a JSON array of the same length and order. Each element must be \
{\"hash\": <the input hash, unchanged>, \"label\": \"info\" | \"promo\" | \"risk\", \
\"needs_phrase_level\": <true if the sentence mixes categories, else false>}. \
info = neutral information, promo = promotional or persuasive content, \
risk = risk warnings, responsible-gambling or legal notices. Output only the JSON array.";

const STAGE2_INSTRUCTIONS: &str = "You split sentences into labelled character spans. \
The user message is a JSON array of objects {\"hash\", \"text\"}. \
Answer with a JSON array of the same length and order. Each element must be \
{\"hash\": <the input hash, unchanged>, \"spans\": [{\"start\": int, \"end\": int, \
\"label\": \"info\" | \"promo\" | \"risk\"}]}. Offsets count Unicode characters, \
are 0-based and half-open. Spans must be sorted, start at 0, end at the text length \
and leave no gaps or overlaps. Output only the JSON array.";

fn instructions(stage: Stage) -> &'static str {
    match stage {
        Stage::Stage1 => STAGE1_INSTRUCTIONS,
        Stage::Stage2 => STAGE2_INSTRUCTIONS,
    }
}

/// Chat-completions backend for any OpenAI-compatible endpoint
#[derive(Debug, Clone)]
pub struct OpenAiCompatBackend {
    client: reqwest::Client,
    config: ModelConfig,
}

impl OpenAiCompatBackend {
    pub fn new(client: reqwest::Client, config: ModelConfig) -> Self {
        Self { client, config }
    }

    fn endpoint_chat_completions(&self) -> String {
        format!("{}/v1/chat/completions", self.config.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl ModelBackend for OpenAiCompatBackend {
    async fn complete(&self, stage: Stage, payload: &str) -> Result<String, TransportError> {
        let req = ChatCompletionsRequest {
            model: &self.config.model,
            messages: vec![
                Message {
                    role: "system",
                    content: instructions(stage),
                },
                Message {
                    role: "user",
                    content: payload,
                },
            ],
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
            top_p: self.config.top_p,
            stream: false,
        };

        let timeout = self.config.timeout();
        let mut rb = self
            .client
            .post(self.endpoint_chat_completions())
            .timeout(timeout)
            .json(&req);
        if let Some(key) = &self.config.api_key {
            rb = rb.bearer_auth(key);
        }

        let resp = rb.send().await.map_err(|e| map_reqwest_error(e, timeout))?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(TransportError::Status {
                status: status.as_u16(),
                body: body.chars().take(300).collect(),
            });
        }

        let parsed: ChatCompletionsResponse = resp
            .json()
            .await
            .map_err(|e| map_reqwest_error(e, timeout))?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or(TransportError::EmptyCompletion)?;

        debug!(%stage, chars = content.len(), "Chat completion received");
        Ok(content)
    }

    fn name(&self) -> &str {
        "openai_compat"
    }
}

fn map_reqwest_error(e: reqwest::Error, timeout: std::time::Duration) -> TransportError {
    if e.is_timeout() {
        TransportError::Timeout(timeout)
    } else {
        TransportError::Request(e.to_string())
    }
}

#[derive(Debug, Serialize)]
struct ChatCompletionsRequest<'a> {
    model: &'a str,
    messages: Vec<Message<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u64>,
    temperature: f64,
    top_p: f64,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionsResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_trims_trailing_slash() {
        let backend = OpenAiCompatBackend::new(
            reqwest::Client::new(),
            ModelConfig {
                base_url: "http://localhost:8080/".to_string(),
                ..ModelConfig::default()
            },
        );
        assert_eq!(backend.endpoint_chat_completions(), "http://localhost:8080/v1/chat/completions");
    }

    #[test]
    fn test_request_shape() {
        let req = ChatCompletionsRequest {
            model: "m",
            messages: vec![Message {
                role: "user",
                content: "[]",
            }],
            max_tokens: None,
            temperature: 0.0,
            top_p: 1.0,
            stream: false,
        };
        let value = serde_json::to_value(&req).unwrap();
        assert_eq!(value["model"], "m");
        assert!(value.get("max_tokens").is_none());
        assert_eq!(value["messages"][0]["content"], "[]");
    }
}
