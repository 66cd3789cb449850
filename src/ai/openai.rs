//! OpenAI-compatible chat-completions client.

use crate::ai::{Message, ReasoningBackend};
use async_trait::async_trait;
use reqwest::{Client, header};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// The ReAct grammar stops each completion before the model invents
/// an observation of its own.
const STOP_SEQUENCES: &[&str] = &["\nObservation:", "\n\tObservation:"];

#[derive(Debug, Clone)]
pub struct OpenAIClient {
    client: Client,
    endpoint: String,
    model: String,
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ApiMessage>,
    temperature: f32,
    stop: Vec<String>,
}

#[derive(Debug, Serialize)]
struct ApiMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
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

#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    error: ApiError,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
}

impl OpenAIClient {
    pub fn new(api_key: &str, base_url: Option<&str>, model: Option<&str>) -> Result<Self, String> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/json"),
        );
        let auth_value = header::HeaderValue::from_str(&format!("Bearer {}", api_key))
            .map_err(|e| format!("Invalid API key format: {}", e))?;
        headers.insert(header::AUTHORIZATION, auth_value);

        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|e| format!("Failed to create HTTP client: {}", e))?;

        let base = base_url
            .unwrap_or(crate::config::defaults::OPENAI_BASE_URL)
            .trim_end_matches('/')
            .to_string();

        Ok(Self {
            client,
            endpoint: format!("{}/chat/completions", base),
            model: model
                .unwrap_or(crate::config::defaults::OPENAI_MODEL)
                .to_string(),
        })
    }

    /// Build a client from environment configuration
    pub fn from_env() -> Result<Self, String> {
        let api_key = std::env::var(crate::config::env_vars::OPENAI_API_KEY)
            .map_err(|_| "OPENAI_API_KEY is required".to_string())?;
        let base_url = std::env::var(crate::config::env_vars::OPENAI_BASE_URL).ok();
        let model = crate::config::openai_model();
        Self::new(&api_key, base_url.as_deref(), Some(&model))
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl ReasoningBackend for OpenAIClient {
    async fn complete(&self, messages: Vec<Message>) -> Result<String, String> {
        let api_messages = messages
            .into_iter()
            .map(|m| ApiMessage {
                role: m.role.as_str().to_string(),
                content: m.content,
            })
            .collect();

        let request = ChatCompletionRequest {
            model: self.model.clone(),
            messages: api_messages,
            temperature: 0.0,
            stop: STOP_SEQUENCES.iter().map(|s| s.to_string()).collect(),
        };

        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| format!("completion request failed: {}", e))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            if let Ok(parsed) = serde_json::from_str::<ApiErrorResponse>(&error_text) {
                return Err(format!("completion API error: {}", parsed.error.message));
            }
            return Err(format!(
                "completion API returned status {}: {}",
                status, error_text
            ));
        }

        let body: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| format!("failed to parse completion response: {}", e))?;

        body.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.is_empty())
            .ok_or_else(|| "completion API returned no content".to_string())
    }
}
