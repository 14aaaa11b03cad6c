//! Writer for temp download files. Unix only: writes are positional
//! (`FileExt::write_all_at`) and never move a shared seek cursor.

use anyhow::{Context, Result};
use std::fs::File;
use std::os::unix::fs::FileExt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Writer for a temp download file. Cheap to clone so the transfer callback
/// and the code that finalizes the file can hold it at the same time.
#[derive(Clone)]
pub struct StorageWriter {
    file: Arc<File>,
    temp_path: PathBuf,
    cursor: Arc<AtomicU64>,
}

impl StorageWriter {
    pub(crate) fn from_file_and_path(file: File, temp_path: PathBuf) -> Self {
        Self {
            file: Arc::new(file),
            temp_path,
            cursor: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Write `data` at `offset` without moving the append cursor.
    pub fn write_at(&self, offset: u64, data: &[u8]) -> Result<()> {
        self.file
            .write_all_at(data, offset)
            .context("storage write_at failed")?;
        Ok(())
    }

    /// Write `data` after everything appended so far.
    pub fn append(&self, data: &[u8]) -> Result<()> {
        let off = self.cursor.fetch_add(data.len() as u64, Ordering::Relaxed);
        self.write_at(off, data)
    }

    /// Bytes appended so far.
    pub fn written(&self) -> u64 {
        self.cursor.load(Ordering::Relaxed)
    }

    pub fn sync(&self) -> Result<()> {
        self.file.sync_all().context("storage sync failed")?;
        Ok(())
    }

    pub fn temp_path(&self) -> &Path {
        &self.temp_path
    }

    /// Rename the temp file onto `final_path`, replacing any existing file.
    /// Consumes the writer and closes the file.
    pub fn finalize(self, final_path: &Path) -> Result<()> {
        let temp_path = self.temp_path.clone();
        drop(self.file);
        std::fs::rename(&temp_path, final_path).with_context(|| {
            format!(
                "failed to rename {} to {}",
                temp_path.display(),
                final_path.display()
            )
        })?;
        Ok(())
    }

    /// Close and delete the temp file. Errors are logged, not returned.
    pub fn discard(self) {
        let temp_path = self.temp_path.clone();
        drop(self.file);
        if let Err(e) = std::fs::remove_file(&temp_path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(path = %temp_path.display(), "failed to remove temp file: {}", e);
            }
        }
    }
}
