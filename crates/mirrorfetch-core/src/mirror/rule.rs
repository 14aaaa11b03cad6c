//! A single prefix-substitution rule.

use serde::{Deserialize, Serialize};

use crate::settings::SettingsProvider;
use crate::sources::ContentKind;

/// Runtime predicate gating a rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleCondition {
    #[default]
    Always,
    /// Only while the settings report the mirror region flag.
    MirrorRegion,
}

impl RuleCondition {
    pub fn holds(&self, settings: &dyn SettingsProvider) -> bool {
        match self {
            RuleCondition::Always => true,
            RuleCondition::MirrorRegion => settings.mirror_region(),
        }
    }
}

/// Rewrites URLs starting with `match_prefix` onto `mirror_base`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MirrorRule {
    /// Mirror name used in source tags and logs.
    pub name: String,
    pub match_prefix: String,
    pub mirror_base: String,
    #[serde(default)]
    pub applies_when: RuleCondition,
    /// Content behind this prefix is many small objects (e.g. per-version asset
    /// objects) and is always fetched official-first.
    #[serde(default)]
    pub bulk_content: bool,
}

impl MirrorRule {
    pub fn new(
        name: impl Into<String>,
        match_prefix: impl Into<String>,
        mirror_base: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            match_prefix: match_prefix.into(),
            mirror_base: mirror_base.into(),
            applies_when: RuleCondition::Always,
            bulk_content: false,
        }
    }

    pub fn when(mut self, condition: RuleCondition) -> Self {
        self.applies_when = condition;
        self
    }

    pub fn bulk(mut self) -> Self {
        self.bulk_content = true;
        self
    }

    pub fn content_kind(&self) -> ContentKind {
        if self.bulk_content {
            ContentKind::BulkSmallFiles
        } else {
            ContentKind::General
        }
    }

    /// Mirror URL for `url`, if the prefix matches and the condition holds.
    pub fn apply(&self, url: &str, settings: &dyn SettingsProvider) -> Option<String> {
        let rest = url.strip_prefix(self.match_prefix.as_str())?;
        if !self.applies_when.holds(settings) {
            return None;
        }
        Some(format!("{}{}", self.mirror_base, rest))
    }
}
