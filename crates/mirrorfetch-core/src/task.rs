//! Download tasks and manifest files.
//!
//! A manifest is a JSON array of tasks. The CLI reads one to start a batch and
//! writes the still-failing subset back out so the batch can be re-run on it.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::checksum::Checksum;

/// One file to fetch. Identity is `target_path`: one task per destination file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadTask {
    pub target_path: PathBuf,
    pub canonical_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_checksum: Option<Checksum>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_size: Option<u64>,
    /// False for files no source is known to serve (built locally by an
    /// installer, for example). Fetching is still attempted, but a not-found
    /// answer ends the batch with [`BatchError::NotFound`](crate::error::BatchError::NotFound).
    #[serde(default = "downloadable_default", skip_serializing_if = "is_downloadable")]
    pub downloadable: bool,
}

fn downloadable_default() -> bool {
    true
}

fn is_downloadable(flag: &bool) -> bool {
    *flag
}

impl DownloadTask {
    pub fn new(target_path: impl Into<PathBuf>, canonical_url: impl Into<String>) -> Self {
        Self {
            target_path: target_path.into(),
            canonical_url: canonical_url.into(),
            expected_checksum: None,
            expected_size: None,
            downloadable: true,
        }
    }

    pub fn with_checksum(mut self, checksum: Checksum) -> Self {
        self.expected_checksum = Some(checksum);
        self
    }

    pub fn with_size(mut self, size: u64) -> Self {
        self.expected_size = Some(size);
        self
    }

    pub fn not_downloadable(mut self) -> Self {
        self.downloadable = false;
        self
    }
}

/// Reads a manifest. Relative target paths are resolved against `base_dir`.
pub fn load_manifest(path: &Path, base_dir: &Path) -> Result<Vec<DownloadTask>> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("read manifest {}", path.display()))?;
    let mut tasks: Vec<DownloadTask> = serde_json::from_str(&data)
        .with_context(|| format!("parse manifest {}", path.display()))?;
    for task in &mut tasks {
        if task.target_path.is_relative() {
            task.target_path = base_dir.join(&task.target_path);
        }
    }
    Ok(tasks)
}

/// Writes `tasks` as a manifest, creating parent directories.
pub fn save_manifest(path: &Path, tasks: &[DownloadTask]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("create directory {}", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(tasks)?;
    fs::write(path, json).with_context(|| format!("write manifest {}", path.display()))?;
    Ok(())
}
