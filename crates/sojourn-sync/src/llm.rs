//! OpenAI-compatible chat completion client.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sojourn_core::LanguageModel;
use tracing::debug;

use crate::error::{SyncError, ensure_success};

pub const DEFAULT_CHAT_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4o";

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    #[serde(default)]
    content: Option<String>,
}

/// One user message per call, no conversation history.
pub struct ChatClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
    temperature: f32,
}

impl ChatClient {
    /// `base_url` includes the version segment, e.g. `https://api.openai.com/v1`.
    pub fn new(base_url: String, model: String, api_key: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            model,
            temperature: 0.0,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub async fn chat(&self, prompt: &str) -> Result<String, SyncError> {
        let url = format!("{}/chat/completions", self.base_url);
        let request = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: self.temperature,
        };

        debug!(
            url = %url,
            model = %self.model,
            prompt_len = prompt.len(),
            "sending chat completion"
        );
        let mut builder = self.client.post(&url).json(&request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }
        let body = ensure_success(builder.send().await?).await?.text().await?;
        extract_content(&body)
    }
}

/// Text of the first choice.
fn extract_content(body: &str) -> Result<String, SyncError> {
    let parsed: ChatResponse = serde_json::from_str(body)?;
    parsed
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .ok_or_else(|| SyncError::Unexpected("chat completion without content".into()))
}

#[async_trait]
impl LanguageModel for ChatClient {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, prompt: &str) -> anyhow::Result<String> {
        Ok(self.chat(prompt).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_shape() {
        let request = ChatRequest {
            model: "gpt-4o",
            messages: vec![ChatMessage {
                role: "user",
                content: "hello",
            }],
            temperature: 0.0,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["model"], "gpt-4o");
        assert_eq!(json["messages"][0]["role"], "user");
        assert_eq!(json["messages"][0]["content"], "hello");
    }

    #[test]
    fn extracts_first_choice() {
        let body = r#"{
            "id": "chatcmpl-1",
            "choices": [
                {"index": 0, "message": {"role": "assistant",
                 "content": "Place: Migros Type: Shopping Reasoning: supermarket"}},
                {"index": 1, "message": {"role": "assistant", "content": "other"}}
            ]
        }"#;
        assert_eq!(
            extract_content(body).unwrap(),
            "Place: Migros Type: Shopping Reasoning: supermarket"
        );
    }

    #[test]
    fn no_choices_is_unexpected() {
        let err = extract_content(r#"{"choices": []}"#).unwrap_err();
        assert!(matches!(err, SyncError::Unexpected(_)));
        let err = extract_content(r#"{"choices": [{"message": {"content": null}}]}"#).unwrap_err();
        assert!(matches!(err, SyncError::Unexpected(_)));
    }

    #[test]
    fn model_name_is_reported() {
        let client = ChatClient::new(DEFAULT_CHAT_URL.into(), DEFAULT_MODEL.into(), None);
        assert_eq!(client.model_name(), "gpt-4o");
        assert_eq!(client.base_url, "https://api.openai.com/v1");
        assert_eq!(client.temperature, 0.0);
        assert_eq!(client.with_temperature(0.3).temperature, 0.3);
    }
}
