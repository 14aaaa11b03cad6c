//! Post-transfer and pre-transfer file checks.

use anyhow::{Context, Result};
use std::fs::File;
use std::path::Path;

use super::FetchError;
use crate::task::DownloadTask;

/// True if `task.target_path` already holds a file that can be kept.
///
/// With integrity checks off, any existing file is kept. With checks on:
/// - a known checksum must match;
/// - without a checksum, `.zip`/`.jar` files must open as an archive and any
///   other file is kept as is;
/// - a task that is not downloadable keeps whatever is there.
pub fn existing_is_valid(task: &DownloadTask, verify_integrity: bool) -> Result<bool> {
    let path = task.target_path.as_path();
    if !path.is_file() {
        return Ok(false);
    }
    if !verify_integrity {
        return Ok(true);
    }
    match &task.expected_checksum {
        Some(checksum) => checksum.matches(path),
        None if !task.downloadable => Ok(true),
        None if is_zip_like(path) => archive_opens(path),
        None => Ok(true),
    }
}

fn is_zip_like(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("zip") || e.eq_ignore_ascii_case("jar"))
}

/// True if the central directory of the zip at `path` can be read.
fn archive_opens(path: &Path) -> Result<bool> {
    let file = File::open(path).with_context(|| format!("open {}", path.display()))?;
    match zip::ZipArchive::new(file) {
        Ok(_) => Ok(true),
        Err(e) => {
            tracing::debug!(path = %path.display(), "existing archive is unreadable: {}", e);
            Ok(false)
        }
    }
}

/// Checks size and checksum of a freshly written file against the task.
pub fn verify_file(path: &Path, written: u64, task: &DownloadTask) -> Result<(), FetchError> {
    if let Some(expected) = task.expected_size {
        if written != expected {
            return Err(FetchError::SizeMismatch {
                expected,
                actual: written,
            });
        }
    }
    if let Some(checksum) = &task.expected_checksum {
        let actual = checksum.compute(path).map_err(FetchError::local)?;
        if !actual.eq_ignore_ascii_case(checksum.expected_hex().trim()) {
            return Err(FetchError::ChecksumMismatch {
                path: task.target_path.clone(),
                expected: checksum.expected_hex().to_string(),
                actual,
            });
        }
    }
    Ok(())
}
