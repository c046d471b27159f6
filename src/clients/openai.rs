use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use super::traits::{ChatMessage, CompletionClient, CompletionRequest};
use crate::config::CompletionConfig;
use crate::error::{PipelineError, Result};

/// Client for an OpenAI-compatible `/chat/completions` endpoint
pub struct OpenAiClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    timeout_ms: u64,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    max_tokens: u32,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<Value>,
}

impl OpenAiClient {
    pub fn new(api_key: String, config: &CompletionConfig) -> Result<Self> {
        if api_key.trim().is_empty() {
            return Err(PipelineError::Config {
                message: "OPENAI_API_KEY not set".to_string(),
            });
        }
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| PipelineError::Config {
                message: format!("Failed to build reqwest client: {}", e),
            })?;
        Ok(Self {
            client,
            api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            timeout_ms: config.timeout_ms,
        })
    }

    fn map_send_error(&self, err: reqwest::Error) -> PipelineError {
        if err.is_timeout() {
            PipelineError::Timeout {
                operation: "chat completion".to_string(),
                timeout_ms: self.timeout_ms,
            }
        } else {
            err.into()
        }
    }
}

#[async_trait]
impl CompletionClient for OpenAiClient {
    async fn complete(&self, request: CompletionRequest) -> Result<String> {
        debug!(
            "Chat completion (model={}, messages={}, json_mode={})",
            request.model,
            request.messages.len(),
            request.json_mode
        );
        let body = ChatRequest {
            model: &request.model,
            messages: &request.messages,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            response_format: request
                .json_mode
                .then(|| serde_json::json!({"type": "json_object"})),
        };
        let url = format!("{}/chat/completions", self.base_url);
        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(PipelineError::Completion {
                message: format!("completion service returned {}: {}", status, text),
            });
        }

        let v: Value = resp.json().await.map_err(|e| self.map_send_error(e))?;
        extract_content(&v)
    }
}

/// Text of the first choice; a null content (e.g. refusal) reads as empty.
fn extract_content(v: &Value) -> Result<String> {
    let message = v
        .get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("message"))
        .ok_or_else(|| PipelineError::Completion {
            message: "completion response had no choices".to_string(),
        })?;
    Ok(message
        .get("content")
        .and_then(|c| c.as_str())
        .unwrap_or_default()
        .to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::ContentPart;

    #[test]
    fn request_body_carries_json_mode_and_image_parts() {
        let messages = vec![
            ChatMessage::system("sys"),
            ChatMessage::user_parts(vec![
                ContentPart::text("look"),
                ContentPart::image("https://cdn.example.com/a.jpg"),
            ]),
        ];
        let body = ChatRequest {
            model: "gpt-4o",
            messages: &messages,
            max_tokens: 100,
            temperature: 0.3,
            response_format: Some(serde_json::json!({"type": "json_object"})),
        };
        let v = serde_json::to_value(&body).unwrap();
        assert_eq!(v["response_format"]["type"], "json_object");
        assert_eq!(v["messages"][0]["content"], "sys");
        assert_eq!(v["messages"][1]["content"][1]["type"], "image_url");
        assert_eq!(
            v["messages"][1]["content"][1]["image_url"]["url"],
            "https://cdn.example.com/a.jpg"
        );
    }

    #[test]
    fn content_extraction() {
        let ok = serde_json::json!({"choices":[{"message":{"content":"{\"a\":1}"}}]});
        assert_eq!(extract_content(&ok).unwrap(), "{\"a\":1}");
        let null = serde_json::json!({"choices":[{"message":{"content":null}}]});
        assert_eq!(extract_content(&null).unwrap(), "");
        let empty = serde_json::json!({"choices":[]});
        assert!(matches!(
            extract_content(&empty),
            Err(PipelineError::Completion { .. })
        ));
    }

    #[test]
    fn missing_key_is_config_error() {
        let err = OpenAiClient::new(" ".into(), &CompletionConfig::default())
            .err()
            .unwrap();
        assert_eq!(err.label(), "config");
    }
}
