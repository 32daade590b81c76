//! Liveness results and aggregates.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::bookmark::BookmarkId;

/// Reachability classification of a bookmark.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    /// Never checked, or the response status fell outside known ranges
    #[default]
    Unknown,
    /// 2xx within the slow threshold
    Healthy,
    /// 2xx slower than the slow threshold
    Slow,
    /// 3xx response
    Redirect,
    /// 4xx/5xx, transport failure, timeout, or malformed URL
    Broken,
}

impl HealthStatus {
    /// Outcomes that are worth surfacing to an operator.
    pub fn is_problem(&self) -> bool {
        matches!(self, Self::Slow | Self::Broken)
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Unknown => "unknown",
            Self::Healthy => "healthy",
            Self::Slow => "slow",
            Self::Redirect => "redirect",
            Self::Broken => "broken",
        };
        f.write_str(s)
    }
}

/// Latest liveness result for one bookmark.
///
/// `bookmark_id` is a soft reference: the bookmark may have been deleted
/// since the check ran.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthRecord {
    pub bookmark_id: BookmarkId,
    pub status: HealthStatus,

    /// Final HTTP status, absent when no response was received
    pub status_code: Option<u16>,

    pub latency_ms: u64,

    /// `Location` of a redirect response
    pub redirect_url: Option<String>,

    pub error: Option<String>,
    pub checked_at: DateTime<Utc>,
}

impl HealthRecord {
    /// Record for a check that never produced a usable response.
    pub fn broken(bookmark_id: BookmarkId, latency_ms: u64, error: impl Into<String>) -> Self {
        Self {
            bookmark_id,
            status: HealthStatus::Broken,
            status_code: None,
            latency_ms,
            redirect_url: None,
            error: Some(error.into()),
            checked_at: Utc::now(),
        }
    }
}

/// Number of records per status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
    pub unknown: usize,
    pub healthy: usize,
    pub slow: usize,
    pub redirect: usize,
    pub broken: usize,
}

impl StatusCounts {
    pub fn record(&mut self, status: HealthStatus) {
        match status {
            HealthStatus::Unknown => self.unknown += 1,
            HealthStatus::Healthy => self.healthy += 1,
            HealthStatus::Slow => self.slow += 1,
            HealthStatus::Redirect => self.redirect += 1,
            HealthStatus::Broken => self.broken += 1,
        }
    }

    pub fn get(&self, status: HealthStatus) -> usize {
        match status {
            HealthStatus::Unknown => self.unknown,
            HealthStatus::Healthy => self.healthy,
            HealthStatus::Slow => self.slow,
            HealthStatus::Redirect => self.redirect,
            HealthStatus::Broken => self.broken,
        }
    }

    pub fn total(&self) -> usize {
        self.unknown + self.healthy + self.slow + self.redirect + self.broken
    }
}

impl<'a> FromIterator<&'a HealthRecord> for StatusCounts {
    fn from_iter<I: IntoIterator<Item = &'a HealthRecord>>(iter: I) -> Self {
        let mut counts = Self::default();
        for record in iter {
            counts.record(record.status);
        }
        counts
    }
}

/// Corpus-wide health summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStats {
    /// Bookmarks currently in the repository
    pub total_bookmarks: usize,

    /// Health records held, including stale ones
    pub checked: usize,

    /// `total_bookmarks - checked`, floored at zero
    pub unchecked: usize,

    #[serde(flatten)]
    pub counts: StatusCounts,

    pub average_latency_ms: Option<u64>,
    pub last_checked_at: Option<DateTime<Utc>>,
}

/// Outcome of one full sweep.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,

    /// Bookmarks loaded for this sweep
    pub total: usize,

    pub counts: StatusCounts,

    /// Sweep stopped early; `counts` covers only completed checks
    pub cancelled: bool,
}

impl SweepReport {
    pub(crate) fn begin(total: usize) -> Self {
        Self {
            started_at: Utc::now(),
            finished_at: None,
            total,
            counts: StatusCounts::default(),
            cancelled: false,
        }
    }

    /// Checks that completed during the sweep.
    pub fn checked(&self) -> usize {
        self.counts.total()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_counts_from_records() {
        let records = [
            HealthRecord::broken(BookmarkId::new(1), 0, "boom"),
            HealthRecord::broken(BookmarkId::new(2), 0, "boom"),
        ];
        let counts: StatusCounts = records.iter().collect();

        assert_eq!(counts.get(HealthStatus::Broken), 2);
        assert_eq!(counts.total(), 2);
    }

    #[test]
    fn test_status_serializes_snake_case() {
        let json = serde_json::to_string(&HealthStatus::Redirect).unwrap();
        assert_eq!(json, "\"redirect\"");
        assert!(HealthStatus::Broken.is_problem());
        assert!(!HealthStatus::Redirect.is_problem());
    }
}
