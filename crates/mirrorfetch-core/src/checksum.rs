//! Checksum computation and verification of downloaded files.
//!
//! Digests are computed in chunks after a transfer completes (or to decide
//! whether an existing file can be kept), never inline with the transfer.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sha1::Sha1;
use sha2::{Digest, Sha256};
use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::Path;

const BUF_SIZE: usize = 64 * 1024;

/// Expected digest of a file, lowercase or uppercase hex.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "algorithm", content = "hex")]
pub enum Checksum {
    Sha1(String),
    Sha256(String),
}

impl Checksum {
    pub fn algorithm(&self) -> &'static str {
        match self {
            Checksum::Sha1(_) => "sha1",
            Checksum::Sha256(_) => "sha256",
        }
    }

    pub fn expected_hex(&self) -> &str {
        match self {
            Checksum::Sha1(h) | Checksum::Sha256(h) => h,
        }
    }

    /// Digest of `path` with this checksum's algorithm, lowercase hex.
    pub fn compute(&self, path: &Path) -> Result<String> {
        match self {
            Checksum::Sha1(_) => sha1_path(path),
            Checksum::Sha256(_) => sha256_path(path),
        }
    }

    /// True if `path` hashes to the expected value (case-insensitive hex).
    pub fn matches(&self, path: &Path) -> Result<bool> {
        let actual = self.compute(path)?;
        Ok(actual.eq_ignore_ascii_case(self.expected_hex().trim()))
    }
}

impl fmt::Display for Checksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.algorithm(), self.expected_hex())
    }
}

fn digest_path<D: Digest>(path: &Path) -> Result<String> {
    let mut f = File::open(path).with_context(|| format!("open {}", path.display()))?;
    let mut hasher = D::new();
    let mut buf = vec![0u8; BUF_SIZE];
    loop {
        let n = f
            .read(&mut buf)
            .with_context(|| format!("read {}", path.display()))?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

/// Compute SHA-256 of a file and return the digest as lowercase hex.
pub fn sha256_path(path: &Path) -> Result<String> {
    digest_path::<Sha256>(path)
}

/// Compute SHA-1 of a file and return the digest as lowercase hex.
pub fn sha1_path(path: &Path) -> Result<String> {
    digest_path::<Sha1>(path)
}
