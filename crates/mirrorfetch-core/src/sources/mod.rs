//! Source tags, attempt candidates and the source list builder.
//!
//! A candidate is one way of obtaining a value (official host, mirror A, ...).
//! The builder orders candidates by the user's preference and assigns each a
//! pre-attempt delay; the fallback executor then tries them one at a time.

mod builder;
mod delays;

pub use builder::{effective_policy, SourceListBuilder};
pub use delays::{SourceDelays, StaggerDelays};

use futures_util::future::BoxFuture;
use std::fmt;
use std::future::Future;
use std::time::Duration;

use crate::error::SourceFailure;

/// Origin of a candidate. Diagnostic only; ordering is decided when the list is built.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SourceTag {
    Official,
    Mirror(String),
}

impl SourceTag {
    pub fn mirror(name: impl Into<String>) -> Self {
        SourceTag::Mirror(name.into())
    }

    pub fn is_official(&self) -> bool {
        matches!(self, SourceTag::Official)
    }
}

impl fmt::Display for SourceTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceTag::Official => write!(f, "official"),
            SourceTag::Mirror(name) => write!(f, "mirror:{}", name),
        }
    }
}

/// What is being fetched. Bulk small-file content always goes to the official
/// host first so community mirrors are not flooded with per-object requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ContentKind {
    #[default]
    General,
    BulkSmallFiles,
}

/// Deferred, fallible, asynchronous operation of one candidate.
pub type Operation<T> = Box<dyn FnOnce() -> BoxFuture<'static, Result<T, SourceFailure>> + Send>;

/// Boxes an async closure into an [`Operation`].
pub fn operation<T, F, Fut>(f: F) -> Operation<T>
where
    F: FnOnce() -> Fut + Send + 'static,
    Fut: Future<Output = Result<T, SourceFailure>> + Send + 'static,
{
    Box::new(move || Box::pin(f()))
}

/// One attempt candidate: wait `pre_delay`, then run `operation`.
pub struct CandidateSource<T> {
    pub pre_delay: Duration,
    pub tag: SourceTag,
    pub operation: Operation<T>,
}

impl<T> CandidateSource<T> {
    pub fn new<F, Fut>(tag: SourceTag, pre_delay: Duration, operation: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, SourceFailure>> + Send + 'static,
    {
        Self {
            pre_delay,
            tag,
            operation: self::operation(operation),
        }
    }
}

impl<T> fmt::Debug for CandidateSource<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CandidateSource")
            .field("pre_delay", &self.pre_delay)
            .field("tag", &self.tag)
            .finish_non_exhaustive()
    }
}
