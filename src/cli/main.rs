//! Batch image generation CLI
//!
//! Reads a prompts CSV, counts the images already on disk and requests the
//! missing ones from the image API.

use super::config::CliConfigBuilder;
use crate::{
    backends::{MockBackend, OpenAiBackend},
    config::{GeneratorConfig, DEFAULT_SLEEP_SECS, DEFAULT_TIMEOUT_SECS, MAX_BATCH_SIZE},
    generation::ImageBackend,
    processor::{BatchGenerator, RunSummary},
    services::create_cli_progress_reporter,
    tracing_config::init_cli_tracing,
};
use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use tracing::{debug, info};

/// Generate images for every row of a prompts CSV
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(name = "batch-imagegen")]
pub struct Cli {
    /// CSV file with Category, Prompt, ID and Count columns
    #[arg(value_name = "PROMPTS_CSV")]
    pub prompts_file: PathBuf,

    /// Root directory for generated images (one subdirectory per category)
    #[arg(long, value_name = "DIR", default_value = "images")]
    pub images_dir: PathBuf,

    /// Image model
    #[arg(long, default_value = "dall-e-2")]
    pub model: String,

    /// Image size as <width>x<height>
    #[arg(long, default_value = "512x512")]
    pub size: String,

    /// Image quality
    #[arg(long, default_value = "standard")]
    pub quality: String,

    /// How the API returns images
    #[arg(long, value_enum, default_value_t = CliResponseFormat::Url)]
    pub response_format: CliResponseFormat,

    /// Images per API call
    #[arg(long, default_value_t = MAX_BATCH_SIZE, value_parser = clap::value_parser!(u32).range(1..=i64::from(MAX_BATCH_SIZE)))]
    pub batch_size: u32,

    /// Seconds to wait between API calls
    #[arg(long, default_value_t = DEFAULT_SLEEP_SECS)]
    pub sleep_secs: u64,

    /// API base URL [default: $OPENAI_BASE_URL or https://api.openai.com/v1]
    #[arg(long, value_name = "URL")]
    pub api_base_url: Option<String>,

    /// Per-request timeout in seconds
    #[arg(long, default_value_t = DEFAULT_TIMEOUT_SECS)]
    pub timeout_secs: u64,

    /// Show what would be generated without calling the API
    #[arg(long)]
    pub dry_run: bool,

    /// Show a progress bar while saving each image
    #[arg(long)]
    pub progress: bool,

    /// Enable verbose logging (-v: DEBUG, -vv: TRACE)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum, Debug)]
pub enum CliResponseFormat {
    Url,
    B64Json,
}

pub async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_cli_tracing(cli.verbose).context("Failed to initialize tracing")?;

    let config = CliConfigBuilder::from_cli(&cli).context("Failed to build configuration")?;

    info!(
        prompts_file = %cli.prompts_file.display(),
        images_dir = %config.images_dir.display(),
        model = %config.model,
        dry_run = config.dry_run,
        "Starting batch image generation"
    );

    let summary = if config.dry_run {
        // Dry runs never reach the backend.
        run_with_backend(&cli, config, MockBackend::new()).await?
    } else {
        let backend = OpenAiBackend::new(&config.api).context("Failed to create API client")?;
        debug!(endpoint = %backend.endpoint(), "Using image API");
        run_with_backend(&cli, config, backend).await?
    };

    debug!(?summary, "Run summary");
    Ok(())
}

async fn run_with_backend<B: ImageBackend>(
    cli: &Cli,
    config: GeneratorConfig,
    backend: B,
) -> Result<RunSummary> {
    let verbose_plan = cli.verbose > 0 || config.dry_run;
    let generator = BatchGenerator::new(config, backend)
        .context("Failed to create generator")?
        .with_reporter(create_cli_progress_reporter(verbose_plan))
        .with_save_progress(cli.progress);

    generator
        .run(&cli.prompts_file)
        .await
        .with_context(|| format!("Generation failed for {}", cli.prompts_file.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_prompts_file_is_required() {
        assert!(Cli::try_parse_from(["batch-imagegen"]).is_err());
    }

    #[test]
    fn test_batch_size_range() {
        for ok in ["1", "5"] {
            let cli =
                Cli::try_parse_from(["batch-imagegen", "p.csv", "--batch-size", ok]).unwrap();
            assert_eq!(cli.batch_size.to_string(), ok);
        }
        for bad in ["0", "6", "-1"] {
            assert!(Cli::try_parse_from(["batch-imagegen", "p.csv", "--batch-size", bad]).is_err());
        }
    }

    #[test]
    fn test_verbose_counts_and_flags() {
        let cli = Cli::try_parse_from([
            "batch-imagegen",
            "p.csv",
            "-vv",
            "--dry-run",
            "--progress",
            "--response-format",
            "b64-json",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        assert!(cli.dry_run);
        assert!(cli.progress);
        assert_eq!(cli.response_format, CliResponseFormat::B64Json);
    }

    #[test]
    fn test_unknown_response_format_is_rejected() {
        assert!(
            Cli::try_parse_from(["batch-imagegen", "p.csv", "--response-format", "jpeg"]).is_err()
        );
    }
}
