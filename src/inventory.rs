//! Recognition and counting of previously generated images
//!
//! The filesystem is the only record of past runs: every saved image is named
//! `image_<ID>_<YYYYmmdd>_<HHMMSS>.<micros>.png` inside its category directory,
//! and counts are rebuilt from those names on every run.

use crate::error::{GenerationError, Result};
use crate::prompts::PromptRow;
use chrono::{DateTime, TimeZone};
use regex::Regex;
use std::collections::HashMap;
use std::path::Path;
use std::sync::OnceLock;
use walkdir::WalkDir;

/// Pattern matched against file names inside category directories
pub const IMAGE_NAME_PATTERN: &str = r"^image_(?P<id>[^_]+)_[_0-9.]+\.png$";

/// Generated image counts keyed by `(category, id)`
pub type GeneratedCounts = HashMap<(String, String), u32>;

fn image_name_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(IMAGE_NAME_PATTERN).ok()).as_ref()
}

/// Build the file name for an image generated at `timestamp`
#[must_use]
pub fn image_file_name<Tz: TimeZone>(id: &str, timestamp: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    format!("image_{}_{}.png", id, timestamp.format("%Y%m%d_%H%M%S%.6f"))
}

/// Extract the prompt ID from a generated image file name
#[must_use]
pub fn parse_image_id(file_name: &str) -> Option<&str> {
    image_name_regex()?
        .captures(file_name)
        .and_then(|caps| caps.name("id"))
        .map(|m| m.as_str())
}

/// Count generated images per `(category, id)` below `images_dir`
///
/// Only regular files directly inside each category directory are counted.
/// A missing `images_dir` yields an empty map.
///
/// # Errors
/// - A directory cannot be read
pub fn scan_generated_counts(images_dir: &Path) -> Result<GeneratedCounts> {
    let mut counts = GeneratedCounts::new();

    if !images_dir.exists() {
        tracing::debug!(path = %images_dir.display(), "Images directory does not exist yet");
        return Ok(counts);
    }

    for category_entry in WalkDir::new(images_dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let category_entry = category_entry.map_err(|e| walk_error(images_dir, e))?;
        if !category_entry.file_type().is_dir() {
            continue;
        }

        let category = category_entry.file_name().to_string_lossy().to_string();
        let category_path = category_entry.path();

        for image_entry in WalkDir::new(category_path).min_depth(1).max_depth(1) {
            let image_entry = image_entry.map_err(|e| walk_error(category_path, e))?;
            if !image_entry.file_type().is_file() {
                continue;
            }

            let file_name = image_entry.file_name().to_string_lossy();
            if let Some(id) = parse_image_id(&file_name) {
                *counts
                    .entry((category.clone(), id.to_string()))
                    .or_insert(0) += 1;
            }
        }
    }

    tracing::debug!(
        path = %images_dir.display(),
        prompt_ids = counts.len(),
        "Scanned generated images"
    );
    Ok(counts)
}

fn walk_error(path: &Path, error: walkdir::Error) -> GenerationError {
    let io = error
        .into_io_error()
        .unwrap_or_else(|| std::io::Error::new(std::io::ErrorKind::Other, "filesystem loop"));
    GenerationError::file_io_error("scan directory", path, &io)
}

/// Set each row's `generated_count` from the scanned counts
pub fn reconcile(rows: &mut [PromptRow], counts: &GeneratedCounts) {
    for row in rows {
        row.generated_count = counts
            .get(&(row.category.clone(), row.id.clone()))
            .copied()
            .unwrap_or(0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};
    use std::fs;
    use tempfile::TempDir;

    fn row(category: &str, id: &str, target: u32) -> PromptRow {
        PromptRow {
            category: category.to_string(),
            prompt: "p".to_string(),
            id: id.to_string(),
            target_count: target,
            generated_count: 0,
            line: 2,
        }
    }

    fn touch(path: &Path) {
        fs::write(path, b"png").unwrap();
    }

    #[test]
    fn test_image_name_pattern_compiles() {
        assert!(image_name_regex().is_some());
        assert_eq!(parse_image_id("image_X1_20240101_000000.000001.png"), Some("X1"));
    }

    #[test]
    fn test_image_file_name_format() {
        let timestamp = NaiveDate::from_ymd_opt(2024, 3, 9)
            .unwrap()
            .and_hms_micro_opt(7, 5, 3, 42)
            .unwrap()
            .and_utc();
        assert_eq!(
            image_file_name("P1", &timestamp),
            "image_P1_20240309_070503.000042.png"
        );
    }

    #[test]
    fn test_generated_names_round_trip_through_pattern() {
        let name = image_file_name("abc-9", &Utc::now());
        assert_eq!(parse_image_id(&name), Some("abc-9"));
    }

    #[test]
    fn test_parse_image_id() {
        assert_eq!(parse_image_id("image_P1_20240101_120000.123456.png"), Some("P1"));
        assert_eq!(parse_image_id("image_Q7_1.png"), Some("Q7"));
        assert_eq!(parse_image_id("image_P1_20240101_120000.123456.jpg"), None);
        assert_eq!(parse_image_id("image__20240101.png"), None);
        assert_eq!(parse_image_id("image_P1_abc.png"), None);
        assert_eq!(parse_image_id("xximage_P1_20240101_120000.1.png"), None);
        assert_eq!(parse_image_id("image_P1_20240101_120000.1.png.tmp"), None);
        assert_eq!(parse_image_id("notes.txt"), None);
    }

    #[test]
    fn test_scan_missing_directory() {
        let temp_dir = TempDir::new().unwrap();
        let counts = scan_generated_counts(&temp_dir.path().join("missing")).unwrap();
        assert!(counts.is_empty());
    }

    #[test]
    fn test_scan_counts_per_category_and_id() {
        let temp_dir = TempDir::new().unwrap();
        let images = temp_dir.path();
        let cats = images.join("cats");
        let dogs = images.join("dogs");
        fs::create_dir_all(&cats).unwrap();
        fs::create_dir_all(&dogs).unwrap();

        touch(&cats.join("image_P1_20240101_120000.000001.png"));
        touch(&cats.join("image_P1_20240101_120000.000002.png"));
        touch(&cats.join("image_P2_20240101_120000.000003.png"));
        touch(&cats.join("readme.md"));
        touch(&dogs.join("image_P1_20240101_120000.000004.png"));

        // Nested directories and top-level files are ignored
        fs::create_dir_all(cats.join("image_P1_20240101_120000.000005.png")).unwrap();
        touch(&images.join("image_P1_20240101_120000.000006.png"));

        let counts = scan_generated_counts(images).unwrap();
        assert_eq!(counts.len(), 3);
        assert_eq!(counts[&("cats".to_string(), "P1".to_string())], 2);
        assert_eq!(counts[&("cats".to_string(), "P2".to_string())], 1);
        assert_eq!(counts[&("dogs".to_string(), "P1".to_string())], 1);
    }

    #[test]
    fn test_reconcile_sets_counts_from_disk() {
        let mut counts = GeneratedCounts::new();
        counts.insert(("cats".to_string(), "P1".to_string()), 4);
        counts.insert(("dogs".to_string(), "P9".to_string()), 2);

        let mut rows = vec![row("cats", "P1", 5), row("cats", "P2", 3), row("dogs", "P1", 1)];
        rows[1].generated_count = 99; // stale value is overwritten

        reconcile(&mut rows, &counts);
        assert_eq!(rows[0].generated_count, 4);
        assert_eq!(rows[0].remaining(), 1);
        assert_eq!(rows[1].generated_count, 0);
        assert_eq!(rows[2].generated_count, 0);
    }

    #[test]
    fn test_reconcile_over_target() {
        let mut counts = GeneratedCounts::new();
        counts.insert(("cats".to_string(), "P1".to_string()), 8);
        let mut rows = vec![row("cats", "P1", 5)];
        reconcile(&mut rows, &counts);
        assert_eq!(rows[0].generated_count, 8);
        assert_eq!(rows[0].remaining(), 0);
    }
}
