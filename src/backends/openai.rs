//! OpenAI Images API backend
//!
//! Talks to `POST {base_url}/images/generations` with a bearer token.

use crate::config::ApiConfig;
use crate::error::{GenerationError, Result};
use crate::generation::{GeneratedImage, GenerationRequest, ImageBackend};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// HTTP backend for the OpenAI Images API
pub struct OpenAiBackend {
    client: Client,
    base_url: String,
    api_key: String,
    timeout: Duration,
}

impl std::fmt::Debug for OpenAiBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiBackend")
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

/// Request body for `/images/generations`
#[derive(Debug, Serialize)]
struct ImagesRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    n: u32,
    size: &'a str,
    quality: &'a str,
    response_format: &'a str,
}

/// Response body from `/images/generations`
#[derive(Debug, Deserialize)]
struct ImagesResponse {
    data: Vec<ImageData>,
}

#[derive(Debug, Deserialize)]
struct ImageData {
    url: Option<String>,
    b64_json: Option<String>,
    revised_prompt: Option<String>,
}

/// Error body, e.g. `{"error": {"message": "...", "type": "..."}}`
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

impl OpenAiBackend {
    /// Create a backend from API settings
    ///
    /// # Errors
    /// - No API key configured
    /// - Failed to create HTTP client
    pub fn new(api: &ApiConfig) -> Result<Self> {
        let api_key = api
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .ok_or_else(|| {
                GenerationError::config(
                    "No API key configured. Set the OPENAI_API_KEY environment variable",
                )
            })?
            .to_string();

        let client = Client::builder()
            .timeout(api.timeout)
            .build()
            .map_err(|e| GenerationError::network_error("Failed to create HTTP client", e))?;

        Ok(Self {
            client,
            base_url: api.base_url.trim_end_matches('/').to_string(),
            api_key,
            timeout: api.timeout,
        })
    }

    /// Full URL of the generations endpoint
    #[must_use]
    pub fn endpoint(&self) -> String {
        format!("{}/images/generations", self.base_url)
    }
}

#[async_trait]
impl ImageBackend for OpenAiBackend {
    async fn generate(&self, request: &GenerationRequest) -> Result<Vec<GeneratedImage>> {
        let url = self.endpoint();
        let body = ImagesRequest {
            model: &request.model,
            prompt: &request.prompt,
            n: request.n,
            size: &request.size,
            quality: &request.quality,
            response_format: request.response_format.as_str(),
        };

        tracing::debug!(url = %url, n = request.n, model = %request.model, "Requesting images");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    GenerationError::Network(format!(
                        "Request to {} timed out after {}s",
                        url,
                        self.timeout.as_secs()
                    ))
                } else {
                    GenerationError::network_error(format!("Failed to reach {}", url), e)
                }
            })?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| GenerationError::network_error("Failed to read API response", e))?;

        if !status.is_success() {
            return Err(GenerationError::api(
                status.as_u16(),
                parse_error_message(&text),
            ));
        }

        parse_images_response(&text)
    }

    fn name(&self) -> &str {
        "openai"
    }
}

/// Map a successful response body to generated images
fn parse_images_response(body: &str) -> Result<Vec<GeneratedImage>> {
    let parsed: ImagesResponse = serde_json::from_str(body)
        .map_err(|e| GenerationError::response_parsing(format!("Invalid images response: {}", e)))?;

    parsed
        .data
        .into_iter()
        .enumerate()
        .map(|(index, item)| {
            if let Some(revised) = &item.revised_prompt {
                tracing::debug!(index, revised_prompt = %revised, "Prompt revised by API");
            }
            match (item.url, item.b64_json) {
                (Some(url), _) => Ok(GeneratedImage::Url(url)),
                (None, Some(data)) => Ok(GeneratedImage::Base64(data)),
                (None, None) => Err(GenerationError::response_parsing(format!(
                    "Image {} in response has neither 'url' nor 'b64_json'",
                    index
                ))),
            }
        })
        .collect()
}

/// Extract a readable message from an error body, falling back to the raw text
fn parse_error_message(body: &str) -> String {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) => envelope.error.message,
        Err(_) if body.trim().is_empty() => "empty response body".to_string(),
        Err(_) => body.trim().to_string(),
    }
}
