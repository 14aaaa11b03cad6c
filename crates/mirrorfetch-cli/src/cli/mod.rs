//! CLI for the mirrorfetch download engine.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use mirrorfetch_core::config;
use std::path::PathBuf;

use commands::{run_checksum, run_fetch, run_map};

/// Top-level CLI for mirrorfetch.
#[derive(Debug, Parser)]
#[command(name = "mirrorfetch")]
#[command(about = "mirrorfetch: download files from official hosts and mirrors with fallback", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Show the ordered candidate URLs for each URL.
    Map {
        /// Canonical URLs to map.
        #[arg(required = true)]
        urls: Vec<String>,
    },

    /// Download every task of a JSON manifest.
    Fetch {
        /// Manifest file: JSON array of {target_path, canonical_url, expected_checksum?, expected_size?}.
        manifest: PathBuf,
        /// Maximum concurrent downloads (default: max_concurrent_downloads from config).
        #[arg(long, value_name = "N")]
        jobs: Option<usize>,
        /// Write tasks that still fail after the retry pass to this manifest.
        #[arg(long, value_name = "PATH")]
        failed_out: Option<PathBuf>,
        /// Directory relative target paths are resolved against (default: current directory).
        #[arg(long, value_name = "DIR")]
        dir: Option<PathBuf>,
    },

    /// Compute SHA-256 (or SHA-1) of a file.
    Checksum {
        /// Path to the file.
        path: PathBuf,
        /// Print SHA-1 instead of SHA-256.
        #[arg(long)]
        sha1: bool,
    },
}

impl CliCommand {
    /// Runs the parsed command and returns the process exit code.
    pub async fn run_from_args() -> Result<i32> {
        let cli = Cli::parse();
        let cfg = config::load_or_init()?;
        tracing::debug!("loaded config: {:?}", cfg);

        match cli.command {
            CliCommand::Map { urls } => run_map(&cfg, &urls)?,
            CliCommand::Fetch {
                manifest,
                jobs,
                failed_out,
                dir,
            } => {
                let base_dir = match dir {
                    Some(d) => d,
                    None => std::env::current_dir()?,
                };
                return run_fetch(&cfg, &manifest, &base_dir, jobs, failed_out.as_deref()).await;
            }
            CliCommand::Checksum { path, sha1 } => run_checksum(&path, sha1).await?,
        }

        Ok(0)
    }
}
