//! Generation pipeline
//!
//! Load prompts, reconcile counts against the images already on disk, then
//! request the missing images batch by batch with a fixed pause between API
//! calls. Everything runs sequentially on the calling task.

use crate::config::GeneratorConfig;
use crate::download::ImageDownloader;
use crate::error::{GenerationError, Result};
use crate::generation::{GenerationRequest, ImageBackend};
use crate::inventory::{reconcile, scan_generated_counts};
use crate::prompts::{create_category_directories, load_prompts, PromptRow};
use crate::services::progress::{NoOpProgressReporter, ProgressReporter};
use crate::tracing_config::spans;
use serde::Serialize;
use std::path::Path;
use std::time::Duration;
use tokio::time::Instant;
use tracing::Instrument;

/// Split `remaining` images into API calls of at most `max_batch` images
#[must_use]
pub fn split_batches(remaining: u32, max_batch: u32) -> Vec<u32> {
    let max_batch = max_batch.max(1);
    let mut batches = Vec::new();
    let mut left = remaining;
    while left > 0 {
        let n = left.min(max_batch);
        batches.push(n);
        left -= n;
    }
    batches
}

/// Pending work for a single prompt row
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkItem {
    /// Index into the loaded rows
    pub row_index: usize,
    pub category: String,
    pub id: String,
    pub generated_count: u32,
    pub target_count: u32,
    /// Planned image counts per API call
    pub batches: Vec<u32>,
}

/// Rows that still need images, in file order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GenerationPlan {
    pub rows_total: usize,
    pub items: Vec<WorkItem>,
}

impl GenerationPlan {
    /// Build a plan from reconciled rows
    #[must_use]
    pub fn from_rows(rows: &[PromptRow], max_batch: u32) -> Self {
        let items = rows
            .iter()
            .enumerate()
            .filter(|(_, row)| row.remaining() > 0)
            .map(|(row_index, row)| WorkItem {
                row_index,
                category: row.category.clone(),
                id: row.id.clone(),
                generated_count: row.generated_count,
                target_count: row.target_count,
                batches: split_batches(row.remaining(), max_batch),
            })
            .collect();

        Self {
            rows_total: rows.len(),
            items,
        }
    }

    /// Total number of images still to generate
    #[must_use]
    pub fn total_images(&self) -> u32 {
        self.items.iter().flat_map(|item| &item.batches).sum()
    }

    /// Total number of API calls the plan needs
    #[must_use]
    pub fn total_requests(&self) -> usize {
        self.items.iter().map(|item| item.batches.len()).sum()
    }

    /// Whether there is nothing to do
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// A single API call about to be made or just finished
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchUpdate {
    pub category: String,
    pub id: String,
    /// Images requested in this call
    pub requested: u32,
    /// Images on disk for the row before this call
    pub generated_count: u32,
    pub target_count: u32,
}

/// Outcome of a run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub rows_total: usize,
    /// Rows that needed images when the run started
    pub rows_pending: usize,
    /// Pending rows that reached their target
    pub rows_completed: usize,
    pub images_requested: u32,
    pub images_saved: u32,
    pub api_calls: usize,
    pub elapsed: Duration,
    pub dry_run: bool,
}

/// Sequential batch generator driving an [`ImageBackend`]
pub struct BatchGenerator<B: ImageBackend> {
    config: GeneratorConfig,
    backend: B,
    downloader: ImageDownloader,
    reporter: Box<dyn ProgressReporter>,
}

impl<B: ImageBackend> BatchGenerator<B> {
    /// Create a generator for a validated configuration
    ///
    /// # Errors
    /// - Invalid configuration
    /// - Failed to create HTTP client for downloads
    pub fn new(config: GeneratorConfig, backend: B) -> Result<Self> {
        config.validate()?;
        let downloader = ImageDownloader::new(config.api.timeout)?;

        Ok(Self {
            config,
            backend,
            downloader,
            reporter: Box::new(NoOpProgressReporter),
        })
    }

    /// Use a progress reporter
    #[must_use]
    pub fn with_reporter(mut self, reporter: Box<dyn ProgressReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    /// Show per-image save progress bars
    #[must_use]
    pub fn with_save_progress(mut self, show: bool) -> Self {
        self.downloader = self.downloader.with_progress(show);
        self
    }

    /// Current configuration
    #[must_use]
    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Underlying backend
    #[must_use]
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Load prompts and reconcile them against the images on disk
    ///
    /// Nothing is written to disk.
    ///
    /// # Errors
    /// - Prompts file cannot be read or fails validation
    /// - Images directory cannot be scanned
    pub fn plan<P: AsRef<Path>>(&self, prompts_file: P) -> Result<(Vec<PromptRow>, GenerationPlan)> {
        let mut rows = load_prompts(prompts_file)?;
        let counts = scan_generated_counts(&self.config.images_dir)?;
        reconcile(&mut rows, &counts);
        let plan = GenerationPlan::from_rows(&rows, self.config.max_batch_size);
        Ok((rows, plan))
    }

    /// Run the full pipeline for a prompts file
    ///
    /// # Errors
    /// Any failure aborts the run: prompt loading, directory creation, API
    /// calls and saving are not retried.
    pub async fn run<P: AsRef<Path>>(&self, prompts_file: P) -> Result<RunSummary> {
        let prompts_file = prompts_file.as_ref();
        let span = spans::run(prompts_file, self.backend.name());

        async {
            let rows = load_prompts(prompts_file)?;
            self.run_rows(rows).await
        }
        .instrument(span)
        .await
    }

    /// Run the pipeline for rows that were already loaded
    ///
    /// Generated counts are always recomputed from disk first.
    ///
    /// # Errors
    /// See [`BatchGenerator::run`]
    pub async fn run_rows(&self, mut rows: Vec<PromptRow>) -> Result<RunSummary> {
        let start = Instant::now();
        let images_dir = &self.config.images_dir;

        if !self.config.dry_run {
            create_category_directories(images_dir, &rows)?;
        }

        let counts = scan_generated_counts(images_dir)?;
        reconcile(&mut rows, &counts);

        let plan = GenerationPlan::from_rows(&rows, self.config.max_batch_size);
        tracing::info!(
            rows = plan.rows_total,
            pending_rows = plan.items.len(),
            images = plan.total_images(),
            requests = plan.total_requests(),
            "Generation plan ready"
        );
        self.reporter.report_plan(&plan);

        let mut summary = RunSummary {
            rows_total: plan.rows_total,
            rows_pending: plan.items.len(),
            dry_run: self.config.dry_run,
            ..RunSummary::default()
        };

        if !self.config.dry_run {
            for item in &plan.items {
                let Some(row) = rows.get(item.row_index) else {
                    continue;
                };
                let span = spans::row(&row.category, &row.id);
                self.generate_row(row, &mut summary).instrument(span).await?;
            }
        }

        summary.elapsed = start.elapsed();
        tracing::info!(
            images_saved = summary.images_saved,
            api_calls = summary.api_calls,
            elapsed_secs = summary.elapsed.as_secs_f64(),
            "Run finished"
        );
        self.reporter.report_summary(&summary);

        Ok(summary)
    }

    /// Generate images for one row until its target is reached
    async fn generate_row(&self, row: &PromptRow, summary: &mut RunSummary) -> Result<()> {
        let dir = self.config.images_dir.join(&row.category);
        let mut generated = row.generated_count;
        let mut row_calls = 0usize;

        while generated < row.target_count {
            let requested = (row.target_count - generated).min(self.config.max_batch_size);

            // Pause only between batches of the same row
            if row_calls > 0 && !self.config.sleep_interval.is_zero() {
                self.reporter.report_sleep(self.config.sleep_interval);
                tracing::debug!(
                    secs = self.config.sleep_interval.as_secs_f64(),
                    "Pausing before next API call"
                );
                tokio::time::sleep(self.config.sleep_interval).await;
            }

            let update = BatchUpdate {
                category: row.category.clone(),
                id: row.id.clone(),
                requested,
                generated_count: generated,
                target_count: row.target_count,
            };
            self.reporter.report_batch_start(&update);

            let request = GenerationRequest::from_config(&self.config, &row.prompt, requested);
            summary.api_calls += 1;
            row_calls += 1;
            summary.images_requested += requested;
            let mut images = self.backend.generate(&request).await?;

            if images.is_empty() {
                return Err(GenerationError::api(
                    0,
                    format!(
                        "{} returned no images for prompt ID {}",
                        self.backend.name(),
                        row.id
                    ),
                ));
            }
            if images.len() > requested as usize {
                tracing::warn!(
                    requested,
                    received = images.len(),
                    "Backend returned more images than requested; keeping the first ones"
                );
                images.truncate(requested as usize);
            } else if images.len() < requested as usize {
                tracing::warn!(
                    requested,
                    received = images.len(),
                    "Backend returned fewer images than requested"
                );
            }

            let saved = self.downloader.save_images(&dir, &row.id, &images).await?;
            let saved_count = saved.len() as u32;
            generated += saved_count;
            summary.images_saved += saved_count;

            self.reporter.report_batch_done(&update, saved_count);
        }

        summary.rows_completed += 1;
        Ok(())
    }
}
