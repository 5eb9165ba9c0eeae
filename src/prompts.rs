//! Prompt rows and CSV loading
//!
//! The prompts file is a CSV with a header row naming the columns
//! `Category`, `Prompt`, `ID` and `Count` (case-insensitive, any order).
//! Extra columns are ignored and every field is whitespace-trimmed.

use crate::error::{GenerationError, Result};
use csv::{ReaderBuilder, StringRecord, Trim};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};

/// Columns every prompts file must provide
pub const REQUIRED_COLUMNS: &[&str] = &["category", "prompt", "id", "count"];

/// A single prompt row with its target and on-disk image counts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptRow {
    /// Category, also the name of the output subdirectory
    pub category: String,
    /// Text prompt sent to the image API
    pub prompt: String,
    /// Short identifier embedded in generated file names
    pub id: String,
    /// Number of images that should exist for this prompt
    pub target_count: u32,
    /// Number of matching images found on disk (recomputed every run)
    pub generated_count: u32,
    /// Line in the prompts file this row came from
    pub line: usize,
}

impl PromptRow {
    /// Images still missing for this row
    #[must_use]
    pub fn remaining(&self) -> u32 {
        self.target_count.saturating_sub(self.generated_count)
    }

    /// Key used to match rows against files on disk
    #[must_use]
    pub fn key(&self) -> (&str, &str) {
        (&self.category, &self.id)
    }
}

#[derive(Debug, Deserialize)]
struct RawRow {
    category: String,
    prompt: String,
    id: String,
    count: String,
}

/// Load prompt rows from a CSV file
///
/// # Errors
/// - The file cannot be opened
/// - The CSV is malformed or misses a required column
/// - A row fails validation
pub fn load_prompts<P: AsRef<Path>>(path: P) -> Result<Vec<PromptRow>> {
    let path = path.as_ref();
    let file = File::open(path)
        .map_err(|e| GenerationError::file_io_error("open prompts file", path, &e))?;
    let rows = read_prompts(file)?;
    tracing::debug!(path = %path.display(), rows = rows.len(), "Loaded prompts file");
    Ok(rows)
}

/// Load prompt rows from any reader producing CSV
///
/// # Errors
/// See [`load_prompts`]
pub fn read_prompts<R: Read>(reader: R) -> Result<Vec<PromptRow>> {
    let mut reader = ReaderBuilder::new().trim(Trim::All).from_reader(reader);

    let headers: StringRecord = reader
        .headers()?
        .iter()
        .map(str::to_ascii_lowercase)
        .collect();

    for column in REQUIRED_COLUMNS {
        if !headers.iter().any(|h| h == *column) {
            return Err(GenerationError::invalid_prompt(
                1,
                format!("missing required column '{}'", column),
            ));
        }
    }
    reader.set_headers(headers.clone());

    let mut rows = Vec::new();
    let mut seen = HashSet::new();

    for (index, record) in reader.records().enumerate() {
        let record = record?;
        let line = record
            .position()
            .map_or(index + 2, |pos| pos.line() as usize);
        let raw: RawRow = record.deserialize(Some(&headers))?;
        let row = validate_row(raw, line)?;

        if !seen.insert((row.category.clone(), row.id.clone())) {
            tracing::warn!(
                line,
                category = %row.category,
                id = %row.id,
                "Duplicate category/ID pair; rows share the same images on disk"
            );
        }

        rows.push(row);
    }

    Ok(rows)
}

fn validate_row(raw: RawRow, line: usize) -> Result<PromptRow> {
    if raw.category.is_empty() {
        return Err(GenerationError::invalid_prompt(line, "category is empty"));
    }
    if raw.category == "." || raw.category == ".." || raw.category.contains(['/', '\\']) {
        return Err(GenerationError::invalid_prompt(
            line,
            format!("category '{}' is not a valid directory name", raw.category),
        ));
    }

    if raw.id.is_empty() {
        return Err(GenerationError::invalid_prompt(line, "ID is empty"));
    }
    if raw
        .id
        .chars()
        .any(|c| c == '_' || c == '/' || c == '\\' || c.is_whitespace())
    {
        return Err(GenerationError::invalid_prompt(
            line,
            format!(
                "ID '{}' must not contain '_', path separators or whitespace",
                raw.id
            ),
        ));
    }

    if raw.prompt.is_empty() {
        return Err(GenerationError::invalid_prompt(line, "prompt is empty"));
    }

    let target_count = raw.count.parse::<u32>().map_err(|_| {
        GenerationError::invalid_prompt(
            line,
            format!("count '{}' is not a non-negative integer", raw.count),
        )
    })?;

    Ok(PromptRow {
        category: raw.category,
        prompt: raw.prompt,
        id: raw.id,
        target_count,
        generated_count: 0,
        line,
    })
}

/// Create one directory per distinct category under `images_dir`
///
/// Existing directories are left untouched. Returns the category directories
/// in first-seen order.
///
/// # Errors
/// - A directory cannot be created
pub fn create_category_directories(images_dir: &Path, rows: &[PromptRow]) -> Result<Vec<PathBuf>> {
    let mut seen = HashSet::new();
    let mut dirs = Vec::new();

    for row in rows {
        if !seen.insert(row.category.as_str()) {
            continue;
        }

        let dir = images_dir.join(&row.category);
        fs::create_dir_all(&dir)
            .map_err(|e| GenerationError::file_io_error("create category directory", &dir, &e))?;
        dirs.push(dir);
    }

    Ok(dirs)
}
