//! Gemini provider implementation
//!
//! Implements `ChatModel` against the Gemini `generateContent` REST API.
//! System messages are folded into the request's system instruction; user
//! and tool-result messages map to `user` turns, assistant messages to
//! `model` turns.

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::providers::{ChatMessage, ChatModel, ProviderError, Role};

/// Public Gemini API endpoint prefix
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Default model when none is configured
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

/// Request timeout for a single chat call
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Sampling temperature; kept low for stable JSON output
const TEMPERATURE: f64 = 0.2;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiContent>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiPart {
    text: String,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: f64,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiContent>,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorBody {
    error: GeminiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorDetail {
    message: String,
}

/// Chat model backed by the Gemini `generateContent` API
pub struct GeminiModel {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiModel {
    /// Creates a provider for the given API key and model
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Result<Self, ProviderError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(ProviderError::NotConfigured(
                "GEMINI_API_KEY is empty".to_string(),
            ));
        }

        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            api_key,
            model: model.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
        })
    }

    /// Overrides the API base URL (tests, proxies)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn build_request(&self, messages: &[ChatMessage]) -> GeminiRequest {
        let mut system_parts = Vec::new();
        let mut contents = Vec::new();

        for message in messages {
            match message.role {
                Role::System => system_parts.push(GeminiPart {
                    text: message.content.clone(),
                }),
                role => contents.push(GeminiContent {
                    role: Some(gemini_role(role).to_string()),
                    parts: vec![GeminiPart {
                        text: message.content.clone(),
                    }],
                }),
            }
        }

        GeminiRequest {
            contents,
            system_instruction: (!system_parts.is_empty()).then_some(GeminiContent {
                role: None,
                parts: system_parts,
            }),
            generation_config: GenerationConfig {
                temperature: TEMPERATURE,
            },
        }
    }
}

/// Maps transcript roles onto Gemini's two-role scheme
fn gemini_role(role: Role) -> &'static str {
    match role {
        Role::Assistant => "model",
        // Tool results go back as user turns; Gemini has no tool role here.
        Role::System | Role::User | Role::Tool => "user",
    }
}

#[async_trait::async_trait]
impl ChatModel for GeminiModel {
    async fn chat(&self, messages: &[ChatMessage]) -> Result<String, ProviderError> {
        let url = format!(
            "{}/models/{}:generateContent",
            self.base_url, self.model
        );
        let request = self.build_request(messages);

        tracing::debug!(model = %self.model, turns = request.contents.len(), "sending chat request");

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<GeminiErrorBody>(&body)
                .map(|b| b.error.message)
                .unwrap_or(body);
            tracing::error!(status = status.as_u16(), %message, "chat request rejected");
            return Err(ProviderError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body: GeminiResponse = response.json().await?;
        let text: String = body
            .candidates
            .first()
            .and_then(|candidate| candidate.content.as_ref())
            .map(|content| {
                content
                    .parts
                    .iter()
                    .map(|part| part.text.as_str())
                    .collect()
            })
            .unwrap_or_default();

        if text.is_empty() {
            return Err(ProviderError::EmptyCompletion);
        }
        Ok(text)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
