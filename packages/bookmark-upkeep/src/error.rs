//! Typed errors for the upkeep library.
//!
//! Uses `thiserror` for library errors (not `anyhow`) so callers can match on
//! the failure class. Per-bookmark probe failures never surface through these
//! types to sweep callers: they are folded into a `Broken` health record.

use std::time::Duration;

use thiserror::Error;

use crate::types::bookmark::BookmarkId;

/// Errors returned by upkeep operations.
#[derive(Debug, Error)]
pub enum UpkeepError {
    /// The bookmark repository failed (corpus-level failure for a run).
    #[error("repository error: {0}")]
    Repository(#[source] RepositoryError),

    /// Referenced bookmark does not exist
    #[error("bookmark not found: {0}")]
    NotFound(BookmarkId),

    /// Caller input rejected before any work began
    #[error("invalid input: {reason}")]
    InvalidInput { reason: String },

    /// Probe transport could not be constructed
    #[error("probe setup failed: {0}")]
    Probe(#[from] ProbeError),

    /// Background task died before producing a result
    #[error("background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl UpkeepError {
    /// Shorthand for an `InvalidInput` error.
    pub fn invalid_input(reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            reason: reason.into(),
        }
    }
}

impl From<RepositoryError> for UpkeepError {
    fn from(value: RepositoryError) -> Self {
        match value {
            RepositoryError::NotFound(id) => Self::NotFound(id),
            other => Self::Repository(other),
        }
    }
}

impl From<NormalizeError> for UpkeepError {
    fn from(value: NormalizeError) -> Self {
        Self::invalid_input(value.to_string())
    }
}

/// Errors raised by a bookmark repository implementation.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Row does not exist
    #[error("bookmark not found: {0}")]
    NotFound(BookmarkId),

    /// Backend reported a failure
    #[error("storage backend error: {0}")]
    Backend(String),

    /// Backend failure with an underlying cause
    #[error("storage error: {0}")]
    Storage(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// URL could not be parsed into scheme + host.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NormalizeError {
    #[error("malformed URL `{url}`: {reason}")]
    MalformedUrl { url: String, reason: String },
}

impl NormalizeError {
    pub(crate) fn malformed(url: &str, reason: impl Into<String>) -> Self {
        Self::MalformedUrl {
            url: url.to_string(),
            reason: reason.into(),
        }
    }
}

/// Failures of a single liveness probe.
///
/// The prober converts every variant into a health record; none of them
/// propagate out of a sweep.
#[derive(Debug, Error)]
pub enum ProbeError {
    /// Input was not a probe-able URL
    #[error(transparent)]
    Malformed(#[from] NormalizeError),

    /// Connection refused, DNS failure, TLS error and the like
    #[error("network failure: {0}")]
    Network(String),

    /// No response within the per-probe budget
    #[error("timed out after {after:?}")]
    Timeout { after: Duration },

    /// Redirect chain longer than the configured cap
    #[error("stopped after {hops} redirects")]
    TooManyRedirects { hops: usize },

    /// Status code outside the classified ranges
    #[error("unexpected HTTP status {0}")]
    UnexpectedStatus(u16),
}

/// Result type alias for upkeep operations.
pub type Result<T> = std::result::Result<T, UpkeepError>;

/// Result type alias for repository calls.
pub type RepoResult<T> = std::result::Result<T, RepositoryError>;

/// Result type alias for probe calls.
pub type ProbeResult<T> = std::result::Result<T, ProbeError>;
