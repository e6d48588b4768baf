//! HttpTextGenerator -- concrete [`TextGenerator`] implementation for the
//! bundled inference sidecar.
//!
//! The sidecar exposes a single `POST /generate` endpoint taking the prompt
//! and sampling parameters and returning `{"response": "..."}`. The caller's
//! deadline is applied as a per-request timeout; the connect timeout comes
//! from configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{Instrument, info_span};

use parlance_core::generate::TextGenerator;
use parlance_observe::genai_attrs::{
    GEN_AI_OPERATION_NAME, GEN_AI_PROVIDER_NAME, GEN_AI_REQUEST_MAX_TOKENS,
    GEN_AI_REQUEST_TEMPERATURE, GEN_AI_REQUEST_TOP_K, OP_CHAT, PROVIDER_LOCAL,
};
use parlance_types::chat::GenerationParams;
use parlance_types::config::GenerationConfig;
use parlance_types::error::GenerateError;

/// HTTP client for the generation sidecar.
pub struct HttpTextGenerator {
    client: reqwest::Client,
    base_url: String,
}

/// Wire request for `POST /generate`.
#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    prompt: &'a str,
    temperature: f32,
    max_new_tokens: u32,
    top_k: u32,
}

/// Wire response from `POST /generate`.
#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}

impl HttpTextGenerator {
    /// Create a new generator client for the configured endpoint.
    pub fn new(config: &GenerationConfig) -> Self {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .build()
            .expect("failed to create reqwest client");

        Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Override the base URL (useful for testing or proxies).
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    /// Build the full URL for a given path.
    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn request_generation(
        &self,
        prompt: &str,
        params: &GenerationParams,
        deadline: Duration,
    ) -> Result<String, GenerateError> {
        let body = GenerateRequest {
            prompt,
            temperature: params.temperature,
            max_new_tokens: params.max_new_tokens,
            top_k: params.top_k,
        };
        let url = self.url("/generate");

        let response = self
            .client
            .post(&url)
            .json(&body)
            .timeout(deadline)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    GenerateError::Timeout
                } else {
                    GenerateError::Transport(format!("HTTP request failed: {e}"))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(GenerateError::Remote {
                status: status.as_u16(),
                message: error_body,
            });
        }

        let generated: GenerateResponse = response.json().await.map_err(|e| {
            if e.is_timeout() {
                GenerateError::Timeout
            } else if e.is_decode() {
                GenerateError::InvalidResponse(e.to_string())
            } else {
                GenerateError::Transport(e.to_string())
            }
        })?;

        Ok(generated.response)
    }
}

impl TextGenerator for HttpTextGenerator {
    async fn generate(
        &self,
        prompt: &str,
        params: &GenerationParams,
        deadline: Duration,
    ) -> Result<String, GenerateError> {
        let span = info_span!(
            "generate",
            { GEN_AI_OPERATION_NAME } = OP_CHAT,
            { GEN_AI_PROVIDER_NAME } = PROVIDER_LOCAL,
            { GEN_AI_REQUEST_TEMPERATURE } = params.temperature as f64,
            { GEN_AI_REQUEST_MAX_TOKENS } = params.max_new_tokens,
            { GEN_AI_REQUEST_TOP_K } = params.top_k,
        );
        self.request_generation(prompt, params, deadline)
            .instrument(span)
            .await
    }
}
