//! Injected configuration provider.
//!
//! Mirror mapping and source-list construction read the user's preference and
//! the region flag through this trait instead of global state, so both stay
//! pure functions of their inputs.

use serde::{Deserialize, Serialize};

/// Which origin to try first when both an official host and a mirror can serve a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PreferencePolicy {
    #[default]
    OfficialFirst,
    MirrorFirst,
}

/// Read-only view of the settings the engine depends on.
pub trait SettingsProvider: Send + Sync {
    /// Preferred ordering of official and mirror sources.
    fn preference_policy(&self) -> PreferencePolicy;

    /// True when the client runs in a region where region-gated mirror rules apply.
    fn mirror_region(&self) -> bool;
}

/// Fixed settings, used by tests and by callers that already resolved their configuration.
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticSettings {
    pub policy: PreferencePolicy,
    pub mirror_region: bool,
}

impl StaticSettings {
    pub fn new(policy: PreferencePolicy, mirror_region: bool) -> Self {
        Self {
            policy,
            mirror_region,
        }
    }
}

impl SettingsProvider for StaticSettings {
    fn preference_policy(&self) -> PreferencePolicy {
        self.policy
    }

    fn mirror_region(&self) -> bool {
        self.mirror_region
    }
}
