//! Checksum command: compute SHA-256 or SHA-1 of a file.

use anyhow::Result;
use mirrorfetch_core::checksum;
use std::path::Path;

/// Compute and print the digest of the given file.
pub async fn run_checksum(path: &Path, sha1: bool) -> Result<()> {
    let path_owned = path.to_path_buf();
    let digest = tokio::task::spawn_blocking(move || {
        if sha1 {
            checksum::sha1_path(&path_owned)
        } else {
            checksum::sha256_path(&path_owned)
        }
    })
    .await??;
    println!("{}  {}", digest, path.display());
    Ok(())
}
