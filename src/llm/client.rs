// src/llm/client.rs
use std::time::Duration;
use reqwest::header;
use crate::llm::models::{Content, GenerateContentRequest, GenerateContentResponse, GenerationConfig};
use crate::llm::{InferenceClient, Prompt};
use crate::utils::error::InferenceError;

const USER_AGENT: &str = concat!("oiv_extractor/", env!("CARGO_PKG_VERSION"));
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
// Linear backoff between attempts: 500ms, 1000ms, ...
pub const DEFAULT_RETRY_BACKOFF: Duration = Duration::from_millis(500);

/// Connection settings for the Gemini API.
#[derive(Debug, Clone)]
pub struct GeminiSettings {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub timeout: Duration,
    /// Extra attempts after the first one.
    pub max_retries: u32,
    /// Base pause before a retry, multiplied by the attempt number.
    pub retry_backoff: Duration,
}

/// Gemini `generateContent` client with deterministic decoding.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    settings: GeminiSettings,
}

impl GeminiClient {
    pub fn new(settings: GeminiSettings) -> Result<Self, InferenceError> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(settings.timeout)
            .build()?;
        Ok(Self { http, settings })
    }

    fn endpoint(&self) -> String {
        let model = self.settings.model.trim_start_matches("models/");
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.settings.base_url.trim_end_matches('/'),
            model
        )
    }

    fn build_request(prompt: &Prompt) -> GenerateContentRequest {
        GenerateContentRequest {
            system_instruction: Some(Content::system(&prompt.system)),
            contents: vec![Content::user(&prompt.user)],
            generation_config: Some(GenerationConfig {
                temperature: 0.0,
                response_mime_type: Some("application/json".to_string()),
            }),
        }
    }

    /// One HTTP round trip, no retries.
    async fn send_once(&self, request: &GenerateContentRequest) -> Result<String, InferenceError> {
        let response = self
            .http
            .post(self.endpoint())
            .header("x-goog-api-key", &self.settings.api_key)
            .header(header::ACCEPT, "application/json")
            .json(request)
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                tracing::warn!("Received 429 Too Many Requests from Gemini");
                return Err(InferenceError::RateLimited);
            }
            tracing::error!("Gemini HTTP error status: {}", status);
            return Err(InferenceError::Http { status, body });
        }

        let parsed: GenerateContentResponse = response.json().await.map_err(map_transport_error)?;
        if let Some(reason) = parsed.block_reason() {
            return Err(InferenceError::Blocked(reason.to_string()));
        }
        if let Some(candidate) = parsed.candidates.first() {
            tracing::debug!("Gemini finish reason: {:?}", candidate.finish_reason);
        }
        parsed.text().ok_or(InferenceError::EmptyResponse)
    }
}

impl InferenceClient for GeminiClient {
    async fn generate(&self, prompt: &Prompt) -> Result<String, InferenceError> {
        let request = Self::build_request(prompt);
        tracing::debug!(
            "Sending prompt to {} ({} chars)",
            self.settings.model,
            prompt.system.len() + prompt.user.len()
        );

        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            match self.send_once(&request).await {
                Ok(text) => {
                    tracing::debug!("Gemini answered with {} chars on attempt {}", text.len(), attempt);
                    return Ok(text);
                }
                Err(e) if e.is_transient() && attempt <= self.settings.max_retries => {
                    tracing::warn!("Gemini attempt {} failed ({}), retrying", attempt, e);
                    tokio::time::sleep(self.settings.retry_backoff * attempt).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

fn map_transport_error(e: reqwest::Error) -> InferenceError {
    if e.is_timeout() {
        InferenceError::Timeout
    } else {
        InferenceError::Network(e)
    }
}
