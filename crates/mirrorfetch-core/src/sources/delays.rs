//! Pre-attempt delays assigned by position in the candidate list.

use std::time::Duration;

use crate::settings::PreferencePolicy;

/// Delay for the preferred (first) group and for the fallback group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StaggerDelays {
    pub primary: Duration,
    pub secondary: Duration,
}

impl StaggerDelays {
    pub const fn from_millis(primary: u64, secondary: u64) -> Self {
        Self {
            primary: Duration::from_millis(primary),
            secondary: Duration::from_millis(secondary),
        }
    }
}

/// Delay pairs for both preference policies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceDelays {
    pub official_first: StaggerDelays,
    pub mirror_first: StaggerDelays,
}

impl Default for SourceDelays {
    fn default() -> Self {
        Self {
            official_first: StaggerDelays::from_millis(5, 35),
            mirror_first: StaggerDelays::from_millis(30, 90),
        }
    }
}

impl SourceDelays {
    /// No delays at all: each source is attempted as soon as the previous one failed.
    pub const fn none() -> Self {
        Self {
            official_first: StaggerDelays::from_millis(0, 0),
            mirror_first: StaggerDelays::from_millis(0, 0),
        }
    }

    pub fn for_policy(&self, policy: PreferencePolicy) -> StaggerDelays {
        match policy {
            PreferencePolicy::OfficialFirst => self.official_first,
            PreferencePolicy::MirrorFirst => self.mirror_first,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mirror_first_waits_longer_than_official_first() {
        let d = SourceDelays::default();
        let of = d.for_policy(PreferencePolicy::OfficialFirst);
        let mf = d.for_policy(PreferencePolicy::MirrorFirst);
        assert!(of.primary < of.secondary);
        assert!(mf.primary < mf.secondary);
        assert!(of.primary < mf.primary);
    }

    #[test]
    fn none_is_all_zero() {
        let d = SourceDelays::none();
        assert!(d.official_first.primary.is_zero());
        assert!(d.mirror_first.secondary.is_zero());
    }
}
