use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::batch::{DEFAULT_CONCURRENCY, DEFAULT_REPORT_INTERVAL};
use crate::fetch::CurlOptions;
use crate::mirror::{MirrorRule, MirrorTable};
use crate::settings::{PreferencePolicy, SettingsProvider};
use crate::sources::{SourceDelays, StaggerDelays};

/// Pre-attempt delays in milliseconds (optional `[delays]` section).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelayConfig {
    pub official_first_primary_ms: u64,
    pub official_first_secondary_ms: u64,
    pub mirror_first_primary_ms: u64,
    pub mirror_first_secondary_ms: u64,
}

impl Default for DelayConfig {
    fn default() -> Self {
        Self {
            official_first_primary_ms: 5,
            official_first_secondary_ms: 35,
            mirror_first_primary_ms: 30,
            mirror_first_secondary_ms: 90,
        }
    }
}

impl From<&DelayConfig> for SourceDelays {
    fn from(d: &DelayConfig) -> Self {
        SourceDelays {
            official_first: StaggerDelays::from_millis(
                d.official_first_primary_ms,
                d.official_first_secondary_ms,
            ),
            mirror_first: StaggerDelays::from_millis(
                d.mirror_first_primary_ms,
                d.mirror_first_secondary_ms,
            ),
        }
    }
}

/// Global configuration loaded from `~/.config/mirrorfetch/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MirrorfetchConfig {
    /// `official_first` or `mirror_first`.
    pub preference: PreferencePolicy,
    /// Enables mirror rules gated on the region flag.
    pub mirror_region: bool,
    /// Maximum number of files downloaded at once.
    pub max_concurrent_downloads: usize,
    /// Period of progress updates while a batch runs.
    pub progress_interval_ms: u64,
    /// Verify size and checksum of downloaded and already present files.
    pub verify_integrity: bool,
    /// Optional delay overrides; built-in defaults when missing.
    pub delays: Option<DelayConfig>,
    /// Optional rule list replacing the built-in mirror table.
    pub mirrors: Option<Vec<MirrorRule>>,
}

impl Default for MirrorfetchConfig {
    fn default() -> Self {
        Self {
            preference: PreferencePolicy::OfficialFirst,
            mirror_region: false,
            max_concurrent_downloads: DEFAULT_CONCURRENCY,
            progress_interval_ms: DEFAULT_REPORT_INTERVAL.as_millis() as u64,
            verify_integrity: true,
            delays: None,
            mirrors: None,
        }
    }
}

impl MirrorfetchConfig {
    pub fn source_delays(&self) -> SourceDelays {
        self.delays
            .as_ref()
            .map(SourceDelays::from)
            .unwrap_or_default()
    }

    pub fn mirror_table(&self) -> MirrorTable {
        match &self.mirrors {
            Some(rules) => MirrorTable::new(rules.clone()),
            None => MirrorTable::default(),
        }
    }

    pub fn progress_interval(&self) -> Duration {
        Duration::from_millis(self.progress_interval_ms)
    }

    pub fn curl_options(&self) -> CurlOptions {
        CurlOptions {
            verify_integrity: self.verify_integrity,
            ..CurlOptions::default()
        }
    }
}

impl SettingsProvider for MirrorfetchConfig {
    fn preference_policy(&self) -> PreferencePolicy {
        self.preference
    }

    fn mirror_region(&self) -> bool {
        self.mirror_region
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("mirrorfetch")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<MirrorfetchConfig> {
    load_or_init_at(&config_path()?)
}

/// Like [`load_or_init`] with an explicit path.
pub fn load_or_init_at(path: &Path) -> Result<MirrorfetchConfig> {
    if !path.exists() {
        let default_cfg = MirrorfetchConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, toml).with_context(|| format!("write {}", path.display()))?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: MirrorfetchConfig =
        toml::from_str(&data).with_context(|| format!("parse {}", path.display()))?;
    Ok(cfg)
}
