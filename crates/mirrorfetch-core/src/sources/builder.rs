//! Orders tagged operations into a candidate list for the fallback executor.

use crate::settings::PreferencePolicy;

use super::{CandidateSource, ContentKind, Operation, SourceDelays, SourceTag};

/// Policy actually applied for `content`: bulk small-file content is always official-first.
pub fn effective_policy(policy: PreferencePolicy, content: ContentKind) -> PreferencePolicy {
    match content {
        ContentKind::BulkSmallFiles => PreferencePolicy::OfficialFirst,
        ContentKind::General => policy,
    }
}

/// Builds ordered candidate lists. Holds only the delay table; the policy is
/// passed per call so one builder can serve every request.
#[derive(Debug, Clone, Copy, Default)]
pub struct SourceListBuilder {
    delays: SourceDelays,
}

impl SourceListBuilder {
    pub fn new(delays: SourceDelays) -> Self {
        Self { delays }
    }

    pub fn delays(&self) -> SourceDelays {
        self.delays
    }

    /// Orders `operations` for `policy`.
    ///
    /// The preferred group (official sources for `OfficialFirst`, mirrors for
    /// `MirrorFirst`) comes first with the short delay, the other group follows
    /// with the long one. Order inside each group is kept as given.
    pub fn build<T>(
        &self,
        policy: PreferencePolicy,
        content: ContentKind,
        operations: Vec<(SourceTag, Operation<T>)>,
    ) -> Vec<CandidateSource<T>> {
        let policy = effective_policy(policy, content);
        let stagger = self.delays.for_policy(policy);
        let official_preferred = policy == PreferencePolicy::OfficialFirst;

        let (preferred, fallback): (Vec<_>, Vec<_>) = operations
            .into_iter()
            .partition(|(tag, _)| tag.is_official() == official_preferred);

        let preferred = preferred
            .into_iter()
            .map(|(tag, operation)| CandidateSource {
                pre_delay: stagger.primary,
                tag,
                operation,
            });
        let fallback = fallback
            .into_iter()
            .map(|(tag, operation)| CandidateSource {
                pre_delay: stagger.secondary,
                tag,
                operation,
            });
        preferred.chain(fallback).collect()
    }
}
