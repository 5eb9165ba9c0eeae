//! Configuration types for batch image generation

use crate::error::{GenerationError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Largest number of images requested in a single API call
pub const MAX_BATCH_SIZE: u32 = 5;

/// Default pause between consecutive API calls
pub const DEFAULT_SLEEP_SECS: u64 = 60;

/// Default OpenAI API endpoint
pub const DEFAULT_API_BASE_URL: &str = "https://api.openai.com/v1";

/// Default HTTP request timeout (5 minutes)
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// How the API should hand back generated images
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ResponseFormat {
    /// Temporary URLs that are downloaded afterwards
    #[default]
    Url,
    /// Base64 encoded image data inline in the response
    B64Json,
}

impl ResponseFormat {
    /// Wire value expected by the API
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Url => "url",
            Self::B64Json => "b64_json",
        }
    }
}

impl std::fmt::Display for ResponseFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Connection settings for the image API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL, e.g. `https://api.openai.com/v1`
    pub base_url: String,

    /// Bearer token (never serialized)
    #[serde(skip)]
    pub api_key: Option<String>,

    /// Per-request timeout
    pub timeout: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_BASE_URL.to_string(),
            api_key: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

/// Configuration for a generation run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratorConfig {
    /// Root directory holding one subdirectory per category
    pub images_dir: PathBuf,

    /// Image model name
    pub model: String,

    /// Image size as `<width>x<height>`
    pub size: String,

    /// Quality setting passed through to the API
    pub quality: String,

    /// Whether images come back as URLs or inline base64
    pub response_format: ResponseFormat,

    /// Images per API call (1-5)
    pub max_batch_size: u32,

    /// Fixed pause between consecutive API calls
    pub sleep_interval: Duration,

    /// Plan and report only, without calling the API
    pub dry_run: bool,

    /// API connection settings
    pub api: ApiConfig,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            images_dir: PathBuf::from("images"),
            model: "dall-e-2".to_string(),
            size: "512x512".to_string(),
            quality: "standard".to_string(),
            response_format: ResponseFormat::default(),
            max_batch_size: MAX_BATCH_SIZE,
            sleep_interval: Duration::from_secs(DEFAULT_SLEEP_SECS),
            dry_run: false,
            api: ApiConfig::default(),
        }
    }
}

impl GeneratorConfig {
    /// Create a new configuration builder
    ///
    /// # Examples
    /// ```rust
    /// use batch_imagegen::GeneratorConfig;
    /// use std::time::Duration;
    ///
    /// let config = GeneratorConfig::builder()
    ///     .images_dir("out")
    ///     .max_batch_size(3)
    ///     .sleep_interval(Duration::from_secs(10))
    ///     .build()
    ///     .unwrap();
    /// assert_eq!(config.max_batch_size, 3);
    /// ```
    #[must_use]
    pub fn builder() -> GeneratorConfigBuilder {
        GeneratorConfigBuilder::default()
    }

    /// Validate all configuration parameters
    ///
    /// # Errors
    /// - Empty model or quality
    /// - Size not of the form `<width>x<height>`
    /// - Batch size outside 1-5
    /// - Empty API base URL
    pub fn validate(&self) -> Result<()> {
        if self.model.trim().is_empty() {
            return Err(GenerationError::config("Model name cannot be empty"));
        }

        if self.quality.trim().is_empty() {
            return Err(GenerationError::config("Quality cannot be empty"));
        }

        if !is_valid_size(&self.size) {
            return Err(GenerationError::config(format!(
                "Invalid image size '{}'. Expected <width>x<height>, e.g. 512x512",
                self.size
            )));
        }

        if self.max_batch_size == 0 || self.max_batch_size > MAX_BATCH_SIZE {
            return Err(GenerationError::config_value_error(
                "batch size",
                self.max_batch_size,
                "1-5",
                Some(MAX_BATCH_SIZE),
            ));
        }

        if self.api.base_url.trim().is_empty() {
            return Err(GenerationError::config("API base URL cannot be empty"));
        }

        Ok(())
    }
}

fn is_valid_size(size: &str) -> bool {
    match size.split_once('x') {
        Some((w, h)) => {
            !w.is_empty()
                && !h.is_empty()
                && w.chars().all(|c| c.is_ascii_digit())
                && h.chars().all(|c| c.is_ascii_digit())
        },
        None => false,
    }
}

/// Builder for `GeneratorConfig`
#[derive(Debug, Default)]
pub struct GeneratorConfigBuilder {
    config: GeneratorConfig,
}

impl GeneratorConfigBuilder {
    /// Set images root directory
    #[must_use]
    pub fn images_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.config.images_dir = dir.into();
        self
    }

    /// Set model name
    #[must_use]
    pub fn model<S: Into<String>>(mut self, model: S) -> Self {
        self.config.model = model.into();
        self
    }

    /// Set image size
    #[must_use]
    pub fn size<S: Into<String>>(mut self, size: S) -> Self {
        self.config.size = size.into();
        self
    }

    /// Set quality
    #[must_use]
    pub fn quality<S: Into<String>>(mut self, quality: S) -> Self {
        self.config.quality = quality.into();
        self
    }

    /// Set response format
    #[must_use]
    pub fn response_format(mut self, format: ResponseFormat) -> Self {
        self.config.response_format = format;
        self
    }

    /// Set images per API call
    #[must_use]
    pub fn max_batch_size(mut self, size: u32) -> Self {
        self.config.max_batch_size = size;
        self
    }

    /// Set pause between API calls
    #[must_use]
    pub fn sleep_interval(mut self, interval: Duration) -> Self {
        self.config.sleep_interval = interval;
        self
    }

    /// Enable or disable dry-run mode
    #[must_use]
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.config.dry_run = dry_run;
        self
    }

    /// Set API base URL
    #[must_use]
    pub fn api_base_url<S: Into<String>>(mut self, url: S) -> Self {
        self.config.api.base_url = url.into();
        self
    }

    /// Set API key
    #[must_use]
    pub fn api_key(mut self, key: Option<String>) -> Self {
        self.config.api.api_key = key;
        self
    }

    /// Set HTTP request timeout
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.api.timeout = timeout;
        self
    }

    /// Build and validate the configuration
    ///
    /// # Errors
    /// Returns the first validation failure, see [`GeneratorConfig::validate`]
    pub fn build(self) -> Result<GeneratorConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
