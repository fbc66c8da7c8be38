use std::time::Duration;

use serde::Deserialize;
use serde_json::{json, Value};

use crate::config::OpenAiConfig;

const CHAT_COMPLETIONS_URL: &str = "https://api.openai.com/v1/chat/completions";
const REQUEST_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, thiserror::Error)]
pub enum OpenAiError {
    #[error("openai request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("openai api error {status}: {body}")]
    Api { status: u16, body: String },
    #[error("openai returned no choices")]
    EmptyResponse,
}

/// Thin chat-completions client shared by extraction and the compliance advisor.
#[derive(Clone)]
pub struct OpenAiChat {
    client: reqwest::Client,
    config: OpenAiConfig,
}

impl OpenAiChat {
    pub fn new(config: OpenAiConfig) -> Result<Self, OpenAiError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;
        Ok(Self { client, config })
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    /// Send `messages` and return the first choice's content.
    pub async fn complete(&self, messages: Value, json_mode: bool) -> Result<String, OpenAiError> {
        let mut body = json!({
            "model": &self.config.model,
            "messages": messages,
            "temperature": 0.1,
        });
        if json_mode {
            body["response_format"] = json!({ "type": "json_object" });
        }

        let response = self
            .client
            .post(CHAT_COMPLETIONS_URL)
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(OpenAiError::Api { status, body });
        }

        #[derive(Deserialize)]
        struct Message {
            content: Option<String>,
        }
        #[derive(Deserialize)]
        struct Choice {
            message: Message,
        }
        #[derive(Deserialize)]
        struct ChatResponse {
            choices: Vec<Choice>,
        }

        let payload: ChatResponse = response.json().await?;
        payload
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or(OpenAiError::EmptyResponse)
    }
}
