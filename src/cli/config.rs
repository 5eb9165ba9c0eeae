//! Configuration conversion utilities for CLI arguments

use crate::cli::main_impl::{Cli, CliResponseFormat};
use crate::config::{GeneratorConfig, ResponseFormat, DEFAULT_API_BASE_URL};
use anyhow::{Context, Result};
use std::time::Duration;

/// Environment variable holding the API key
pub(crate) const API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Environment variable overriding the default API base URL
pub(crate) const BASE_URL_ENV: &str = "OPENAI_BASE_URL";

/// Convert CLI arguments to a `GeneratorConfig`
pub(crate) struct CliConfigBuilder;

impl CliConfigBuilder {
    /// Build the configuration from CLI arguments and the process environment
    pub(crate) fn from_cli(cli: &Cli) -> Result<GeneratorConfig> {
        Self::from_cli_with_env(cli, |name| std::env::var(name).ok())
    }

    /// Build the configuration with an explicit environment lookup
    pub(crate) fn from_cli_with_env<F>(cli: &Cli, env: F) -> Result<GeneratorConfig>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = env(API_KEY_ENV).filter(|key| !key.trim().is_empty());
        if api_key.is_none() && !cli.dry_run {
            anyhow::bail!(
                "{} is not set. Export your API key or use --dry-run to preview the plan",
                API_KEY_ENV
            );
        }

        let base_url = match &cli.api_base_url {
            Some(url) => url.clone(),
            None => env(BASE_URL_ENV)
                .filter(|url| !url.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string()),
        };

        GeneratorConfig::builder()
            .images_dir(&cli.images_dir)
            .model(&cli.model)
            .size(&cli.size)
            .quality(&cli.quality)
            .response_format(Self::convert_response_format(cli.response_format))
            .max_batch_size(cli.batch_size)
            .sleep_interval(Duration::from_secs(cli.sleep_secs))
            .dry_run(cli.dry_run)
            .api_base_url(base_url)
            .api_key(api_key)
            .timeout(Duration::from_secs(cli.timeout_secs))
            .build()
            .context("Invalid configuration")
    }

    fn convert_response_format(format: CliResponseFormat) -> ResponseFormat {
        match format {
            CliResponseFormat::Url => ResponseFormat::Url,
            CliResponseFormat::B64Json => ResponseFormat::B64Json,
        }
    }
}
