//! Image generation backend abstraction

use crate::config::{GeneratorConfig, ResponseFormat};
use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A single request for `n` images of one prompt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub prompt: String,
    pub model: String,
    pub size: String,
    pub quality: String,
    pub n: u32,
    pub response_format: ResponseFormat,
}

impl GenerationRequest {
    /// Build a request for `n` images using the model settings from `config`
    #[must_use]
    pub fn from_config(config: &GeneratorConfig, prompt: &str, n: u32) -> Self {
        Self {
            prompt: prompt.to_string(),
            model: config.model.clone(),
            size: config.size.clone(),
            quality: config.quality.clone(),
            n,
            response_format: config.response_format,
        }
    }
}

/// An image returned by a backend, not yet persisted
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GeneratedImage {
    /// Temporary URL to download the image from
    Url(String),
    /// Base64 encoded image bytes
    Base64(String),
}

/// Trait for image generation backends
#[async_trait]
pub trait ImageBackend: Send + Sync {
    /// Generate images for a request
    ///
    /// A backend may return fewer images than requested.
    ///
    /// # Errors
    /// - Transport failures
    /// - Error responses from the service
    /// - Responses that cannot be interpreted
    async fn generate(&self, request: &GenerationRequest) -> Result<Vec<GeneratedImage>>;

    /// Short backend name for logs
    fn name(&self) -> &str;
}
