//! Mirror mapping table.
//!
//! Rewrites a canonical URL into at most one alternate URL using an ordered
//! list of prefix-substitution rules (first match wins), and splices mirror
//! URLs into candidate lists according to the user's preference.

mod defaults;
mod rule;

pub use defaults::default_rules;
pub use rule::{MirrorRule, RuleCondition};

use crate::settings::{PreferencePolicy, SettingsProvider};
use crate::sources::{effective_policy, ContentKind, SourceTag};

/// A resolved mirror: the rewritten URL and the rule it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MirrorMatch {
    pub url: String,
    pub tag: SourceTag,
    pub content: ContentKind,
}

/// Ordered, immutable rule table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MirrorTable {
    rules: Vec<MirrorRule>,
}

impl Default for MirrorTable {
    fn default() -> Self {
        Self::new(default_rules())
    }
}

impl MirrorTable {
    pub fn new(rules: Vec<MirrorRule>) -> Self {
        Self { rules }
    }

    /// Table with no rules: every URL maps to itself only.
    pub fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    pub fn rules(&self) -> &[MirrorRule] {
        &self.rules
    }

    /// First rule whose prefix matches `url` and whose condition holds.
    pub fn find(&self, url: &str, settings: &dyn SettingsProvider) -> Option<MirrorMatch> {
        self.rules.iter().find_map(|rule| {
            rule.apply(url, settings).map(|mirrored| MirrorMatch {
                url: mirrored,
                tag: SourceTag::mirror(rule.name.clone()),
                content: rule.content_kind(),
            })
        })
    }

    /// Like [`find`](Self::find), but a rule that maps `url` onto itself is no mirror.
    fn find_distinct(&self, url: &str, settings: &dyn SettingsProvider) -> Option<MirrorMatch> {
        self.find(url, settings).filter(|m| m.url != url)
    }

    /// Mirror URL for `url`, or `None` if no rule applies.
    pub fn map_url(&self, url: &str, settings: &dyn SettingsProvider) -> Option<String> {
        self.find(url, settings).map(|m| m.url)
    }

    /// Content kind implied by the rule matching `url` (general if none matches).
    pub fn content_kind(&self, url: &str, settings: &dyn SettingsProvider) -> ContentKind {
        self.find(url, settings)
            .map(|m| m.content)
            .unwrap_or_default()
    }

    /// Ordered candidate URLs for a single canonical URL: the canonical URL and
    /// its mirror, ordered by the effective policy. Just `[url]` without a mirror.
    pub fn map_mirror_urls(&self, url: &str, settings: &dyn SettingsProvider) -> Vec<String> {
        self.tagged_candidates(url, settings)
            .into_iter()
            .map(|(_, u)| u)
            .collect()
    }

    /// Like [`map_mirror_urls`](Self::map_mirror_urls) but keeps the source tag of each URL.
    pub fn tagged_candidates(
        &self,
        url: &str,
        settings: &dyn SettingsProvider,
    ) -> Vec<(SourceTag, String)> {
        let official = (SourceTag::Official, url.to_string());
        let Some(mirror) = self.find_distinct(url, settings) else {
            return vec![official];
        };
        let mirrored = (mirror.tag, mirror.url);
        match effective_policy(settings.preference_policy(), mirror.content) {
            PreferencePolicy::OfficialFirst => vec![official, mirrored],
            PreferencePolicy::MirrorFirst => vec![mirrored, official],
        }
    }

    /// Splices mirrors into an existing multi-candidate list.
    ///
    /// The mirrors producible from any element are collected (deduplicated,
    /// first-seen order) and inserted as one block before or after the whole
    /// original list, never interleaved per element. Without any mirror the
    /// input is returned unchanged.
    pub fn map_urls(&self, urls: &[String], settings: &dyn SettingsProvider) -> Vec<String> {
        let mut mirrors: Vec<String> = Vec::new();
        let mut bulk = false;
        for url in urls {
            if let Some(m) = self.find_distinct(url, settings) {
                bulk |= m.content == ContentKind::BulkSmallFiles;
                if !mirrors.contains(&m.url) {
                    mirrors.push(m.url);
                }
            }
        }
        if mirrors.is_empty() {
            return urls.to_vec();
        }

        let content = if bulk {
            ContentKind::BulkSmallFiles
        } else {
            ContentKind::General
        };
        let mut out = Vec::with_capacity(urls.len() + mirrors.len());
        match effective_policy(settings.preference_policy(), content) {
            PreferencePolicy::OfficialFirst => {
                out.extend_from_slice(urls);
                out.extend(mirrors);
            }
            PreferencePolicy::MirrorFirst => {
                out.extend(mirrors);
                out.extend_from_slice(urls);
            }
        }
        out
    }
}
