#![allow(clippy::too_many_lines)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::uninlined_format_args)]

//! # Batch Image Generation Library
//!
//! Generate images for every row of a prompts CSV with an image generation
//! API, saving them under one directory per category. Runs are resumable:
//! images already on disk are counted before anything is requested, so an
//! interrupted run picks up where it stopped.
//!
//! ## Features
//!
//! - **CSV Prompts**: `Category`, `Prompt`, `ID` and `Count` columns, validated up front
//! - **Resumable**: existing `image_<ID>_<timestamp>.png` files count towards each target
//! - **Rate Limiting**: at most five images per request and a fixed pause between requests
//! - **Pluggable Backends**: OpenAI Images API, plus an in-memory mock for tests
//! - **CLI Integration**: Optional command-line interface (enable with `cli` feature)
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use batch_imagegen::{BatchGenerator, GeneratorConfig, OpenAiBackend};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = GeneratorConfig::builder()
//!     .images_dir("images")
//!     .api_key(std::env::var("OPENAI_API_KEY").ok())
//!     .build()?;
//!
//! let backend = OpenAiBackend::new(&config.api)?;
//! let generator = BatchGenerator::new(config, backend)?;
//! let summary = generator.run("prompts.csv").await?;
//! println!("saved {} images", summary.images_saved);
//! # Ok(())
//! # }
//! ```
//!
//! ### Feature Flags
//!
//! - `cli` (default): Command-line interface, progress bars and tracing subscriber setup
//! - `tracing-json`: JSON log output for the CLI
//!
//! To use only as a library without CLI dependencies:
//!
//! ```toml
//! [dependencies]
//! batch-imagegen = { version = "0.1", default-features = false }
//! ```

pub mod backends;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod download;
pub mod error;
pub mod generation;
pub mod inventory;
pub mod processor;
pub mod prompts;
pub mod services;
pub mod tracing_config;

use std::path::Path;

// Public API exports
pub use backends::{MockBackend, OpenAiBackend};
pub use config::{ApiConfig, GeneratorConfig, GeneratorConfigBuilder, ResponseFormat};
pub use download::ImageDownloader;
pub use error::{GenerationError, Result};
pub use generation::{GeneratedImage, GenerationRequest, ImageBackend};
pub use inventory::{image_file_name, parse_image_id, reconcile, scan_generated_counts};
pub use processor::{BatchGenerator, BatchUpdate, GenerationPlan, RunSummary, WorkItem};
pub use prompts::{create_category_directories, load_prompts, read_prompts, PromptRow};
pub use services::{ConsoleProgressReporter, NoOpProgressReporter, ProgressReporter};

#[cfg(feature = "cli")]
pub use tracing_config::{init_cli_tracing, TracingConfig, TracingFormat};

/// Generate all missing images for a prompts file with the OpenAI backend
///
/// Convenience wrapper around [`BatchGenerator`] for the common case. The
/// configuration must carry an API key unless `dry_run` is set.
///
/// # Examples
/// ```rust,no_run
/// use batch_imagegen::{generate_from_csv, GeneratorConfig};
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = GeneratorConfig::builder()
///     .api_key(Some("sk-...".to_string()))
///     .build()?;
/// let summary = generate_from_csv("prompts.csv", config).await?;
/// assert_eq!(summary.rows_pending, summary.rows_completed);
/// # Ok(())
/// # }
/// ```
pub async fn generate_from_csv<P: AsRef<Path>>(
    prompts_file: P,
    config: GeneratorConfig,
) -> Result<RunSummary> {
    if config.dry_run {
        return BatchGenerator::new(config, MockBackend::new())?
            .run(prompts_file)
            .await;
    }

    let backend = OpenAiBackend::new(&config.api)?;
    BatchGenerator::new(config, backend)?.run(prompts_file).await
}
