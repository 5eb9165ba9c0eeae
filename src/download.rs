//! Persisting generated images
//!
//! Images come back from a backend either as temporary URLs, which are
//! streamed to disk, or as inline base64 data. Every image is written to a
//! fresh file named after the prompt ID and the current local time.

use crate::error::{GenerationError, Result};
use crate::generation::GeneratedImage;
use crate::inventory::image_file_name;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, Local};
use futures_util::stream::TryStreamExt;
#[cfg(feature = "cli")]
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::Client;
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio_util::io::StreamReader;

/// Attempts at finding an unused timestamp file name before giving up
const MAX_NAME_ATTEMPTS: usize = 8;

/// Saves generated images into category directories
#[derive(Debug)]
pub struct ImageDownloader {
    client: Client,
    show_progress: bool,
}

/// Progress bar abstraction that works with and without CLI features
#[derive(Debug)]
pub enum ProgressIndicator {
    #[cfg(feature = "cli")]
    Indicatif(ProgressBar),
    NoOp,
}

impl ProgressIndicator {
    /// Set message for progress indicator
    pub fn set_message(&self, msg: String) {
        match self {
            #[cfg(feature = "cli")]
            Self::Indicatif(pb) => pb.set_message(msg),
            Self::NoOp => {},
        }
    }

    /// Set length for progress indicator
    pub fn set_length(&self, len: u64) {
        match self {
            #[cfg(feature = "cli")]
            Self::Indicatif(pb) => pb.set_length(len),
            Self::NoOp => {},
        }
    }

    /// Set position for progress indicator
    pub fn set_position(&self, pos: u64) {
        match self {
            #[cfg(feature = "cli")]
            Self::Indicatif(pb) => pb.set_position(pos),
            Self::NoOp => {},
        }
    }

    /// Finish progress indicator with message
    pub fn finish_with_message(&self, msg: String) {
        match self {
            #[cfg(feature = "cli")]
            Self::Indicatif(pb) => pb.finish_with_message(msg),
            Self::NoOp => {},
        }
    }
}

impl ImageDownloader {
    /// Create a new downloader
    ///
    /// # Errors
    /// - Failed to create HTTP client
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GenerationError::network_error("Failed to create HTTP client", e))?;

        Ok(Self {
            client,
            show_progress: false,
        })
    }

    /// Show a progress bar while saving (CLI builds only)
    #[must_use]
    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    /// Save every image of a batch into `dir`, returning the written paths
    ///
    /// Images are saved in order; the first failure aborts the batch and the
    /// files already written stay on disk.
    ///
    /// # Errors
    /// - Download or decode failures
    /// - File system errors
    pub async fn save_images(
        &self,
        dir: &Path,
        id: &str,
        images: &[GeneratedImage],
    ) -> Result<Vec<PathBuf>> {
        let progress = if self.show_progress {
            Some(Self::create_progress_indicator())
        } else {
            None
        };
        if let Some(pb) = &progress {
            pb.set_length(images.len() as u64);
        }

        let mut saved = Vec::with_capacity(images.len());
        for (index, image) in images.iter().enumerate() {
            if let Some(pb) = &progress {
                pb.set_message(format!("Saving {} image {}/{}", id, index + 1, images.len()));
            }

            match self.save_image(dir, id, image).await {
                Ok(path) => saved.push(path),
                Err(e) => {
                    if let Some(pb) = &progress {
                        pb.finish_with_message("Save failed".to_string());
                    }
                    return Err(e);
                },
            }

            if let Some(pb) = &progress {
                pb.set_position(index as u64 + 1);
            }
        }

        if let Some(pb) = progress {
            pb.finish_with_message(format!("Saved {} image(s) for {}", saved.len(), id));
        }

        Ok(saved)
    }

    /// Save a single image into a freshly named file
    async fn save_image(&self, dir: &Path, id: &str, image: &GeneratedImage) -> Result<PathBuf> {
        match image {
            GeneratedImage::Base64(data) => {
                let bytes = STANDARD.decode(data.trim()).map_err(|e| {
                    GenerationError::response_parsing(format!("Invalid base64 image data: {}", e))
                })?;
                let (path, file) = create_unique_file(dir, id, Local::now)?;
                let mut file = tokio::fs::File::from_std(file);
                let written = async {
                    file.write_all(&bytes).await?;
                    file.flush().await
                }
                .await;
                if let Err(e) = written {
                    remove_partial(&path);
                    return Err(GenerationError::file_io_error("write image", &path, &e));
                }
                tracing::debug!(path = %path.display(), bytes = bytes.len(), "Saved inline image");
                Ok(path)
            },
            GeneratedImage::Url(url) => {
                let (path, file) = create_unique_file(dir, id, Local::now)?;
                let file = tokio::fs::File::from_std(file);
                match self.download_file(url, &path, file).await {
                    Ok(bytes) => {
                        tracing::debug!(
                            url = %url,
                            path = %path.display(),
                            bytes,
                            "Downloaded image"
                        );
                        Ok(path)
                    },
                    Err(e) => {
                        remove_partial(&path);
                        Err(e)
                    },
                }
            },
        }
    }

    /// Create a progress indicator for save reporting
    fn create_progress_indicator() -> ProgressIndicator {
        #[cfg(feature = "cli")]
        {
            let pb = ProgressBar::new(1);
            if let Ok(style) = ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            {
                pb.set_style(style.progress_chars("#>-"));
            }
            ProgressIndicator::Indicatif(pb)
        }
        #[cfg(not(feature = "cli"))]
        {
            ProgressIndicator::NoOp
        }
    }

    /// Stream a URL into an already created file, returning the byte count
    async fn download_file(
        &self,
        url: &str,
        local_path: &Path,
        mut file: tokio::fs::File,
    ) -> Result<u64> {
        let response = self.client.get(url).send().await.map_err(|e| {
            GenerationError::network_error(format!("Failed to download {}", url), e)
        })?;

        if !response.status().is_success() {
            return Err(GenerationError::Network(format!(
                "HTTP error {} for {}",
                response.status(),
                url
            )));
        }

        let mut stream = StreamReader::new(
            response
                .bytes_stream()
                .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e)),
        );

        let downloaded = tokio::io::copy(&mut stream, &mut file)
            .await
            .map_err(|e| GenerationError::network_error("Failed to read download stream", e))?;

        file.flush()
            .await
            .map_err(|e| GenerationError::file_io_error("flush file", local_path, &e))?;

        Ok(downloaded)
    }
}

/// Open a new file named after `id` and the current time, never overwriting
///
/// Two images saved within the same microsecond would share a name, so a
/// clash is retried with a fresh timestamp.
fn create_unique_file<F>(dir: &Path, id: &str, mut now: F) -> Result<(PathBuf, fs::File)>
where
    F: FnMut() -> DateTime<Local>,
{
    let mut last_error = None;

    for _ in 0..MAX_NAME_ATTEMPTS {
        let path = dir.join(image_file_name(id, &now()));
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => return Ok((path, file)),
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                tracing::trace!(path = %path.display(), "Image name taken, retrying");
                last_error = Some(e);
            },
            Err(e) => return Err(GenerationError::file_io_error("create image file", &path, &e)),
        }
    }

    let error = last_error.unwrap_or_else(|| {
        std::io::Error::new(std::io::ErrorKind::AlreadyExists, "no free file name")
    });
    Err(GenerationError::file_io_error(
        "find an unused image file name in",
        dir,
        &error,
    ))
}

fn remove_partial(path: &Path) {
    if let Err(e) = fs::remove_file(path) {
        tracing::warn!(path = %path.display(), error = %e, "Failed to remove partial image file");
    }
}
