// Copyright 2025 Promptshift Contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Text generation clients used to translate prompt content.
//!
//! The adapter only needs "text in, text out"; there is no process-wide
//! default client. Callers construct one explicitly and pass it into
//! every adaptation.

use async_trait::async_trait;
use thiserror::Error;

/// Errors from text generation clients.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("API error: {0}")]
    ApiError(String),

    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    #[error("Empty response from model")]
    EmptyResponse,

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Any capability that turns a text request into generated text.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Send a request and return the generated text.
    async fn generate(&self, request: &str) -> Result<String, GenerationError>;

    /// Model identifier, for logging.
    fn model_name(&self) -> &str;
}

/// Client for OpenAI-compatible chat completion endpoints.
pub struct OpenAiGenerator {
    api_key: String,
    model: String,
    base_url: String,
    client: reqwest::Client,
}

impl OpenAiGenerator {
    pub fn new(api_key: String, model: String) -> Self {
        Self {
            api_key,
            model,
            base_url: "https://api.openai.com/v1".to_string(),
            client: reqwest::Client::new(),
        }
    }

    /// Point at a different OpenAI-compatible endpoint (Azure, managed
    /// cloud deployments, local servers).
    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }
}

#[async_trait]
impl TextGenerator for OpenAiGenerator {
    async fn generate(&self, request: &str) -> Result<String, GenerationError> {
        let body = serde_json::json!({
            "model": self.model,
            "messages": [
                {
                    "role": "user",
                    "content": request
                }
            ],
            "temperature": 0.0
        });

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await?;
            if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                return Err(GenerationError::RateLimitExceeded);
            }
            return Err(GenerationError::ApiError(error_text));
        }

        let response_data: serde_json::Value = response.json().await?;

        let content = response_data["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| GenerationError::MalformedResponse("missing content".to_string()))?;

        if content.trim().is_empty() {
            return Err(GenerationError::EmptyResponse);
        }

        Ok(content.to_string())
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// Client for the Anthropic messages endpoint.
pub struct AnthropicGenerator {
    api_key: String,
    model: String,
    base_url: String,
    client: reqwest::Client,
}

impl AnthropicGenerator {
    pub fn new(api_key: String, model: String) -> Self {
        Self {
            api_key,
            model,
            base_url: "https://api.anthropic.com/v1".to_string(),
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl TextGenerator for AnthropicGenerator {
    async fn generate(&self, request: &str) -> Result<String, GenerationError> {
        let body = serde_json::json!({
            "model": self.model,
            "max_tokens": 4096,
            "messages": [
                {
                    "role": "user",
                    "content": request
                }
            ],
            "temperature": 0.0
        });

        let response = self
            .client
            .post(format!("{}/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await?;
            if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                return Err(GenerationError::RateLimitExceeded);
            }
            return Err(GenerationError::ApiError(error_text));
        }

        let response_data: serde_json::Value = response.json().await?;

        let content = response_data["content"][0]["text"]
            .as_str()
            .ok_or_else(|| GenerationError::MalformedResponse("missing content".to_string()))?;

        if content.trim().is_empty() {
            return Err(GenerationError::EmptyResponse);
        }

        Ok(content.to_string())
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
