//! Single-bookmark liveness check.
//!
//! A check always ends in a terminal status. Network failures, timeouts and
//! malformed URLs are folded into a `Broken` record rather than returned as
//! errors.
//!
//! The first response decides the status. A redirect keeps its own status
//! code and target. Its chain is still followed: a chain longer than the hop
//! cap is `Broken`, while a target that fails or answers 4xx/5xx only fills
//! in `error`.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::time::Instant;
use tracing::{debug, warn};
use url::Url;

use crate::config::UpkeepConfig;
use crate::error::{ProbeError, ProbeResult};
use crate::normalizer::parse_url;
use crate::traits::probe::{continue_redirects, HttpProbe};
use crate::types::bookmark::Bookmark;
use crate::types::health::{HealthRecord, HealthStatus};

/// Map a final status code and latency to a health status.
pub fn classify(status: u16, latency: Duration, slow_threshold: Duration) -> HealthStatus {
    match status {
        200..=299 if latency > slow_threshold => HealthStatus::Slow,
        200..=299 => HealthStatus::Healthy,
        300..=399 => HealthStatus::Redirect,
        400..=u16::MAX => HealthStatus::Broken,
        _ => HealthStatus::Unknown,
    }
}

/// What the transport reported before classification.
struct Outcome {
    status: u16,
    redirect_url: Option<String>,
    /// Why the redirect target could not be confirmed
    target_error: Option<String>,
}

/// Runs liveness checks through an [`HttpProbe`].
#[derive(Clone)]
pub struct LivenessProber {
    probe: Arc<dyn HttpProbe>,
    config: UpkeepConfig,
}

impl LivenessProber {
    pub fn new(probe: Arc<dyn HttpProbe>, config: UpkeepConfig) -> Self {
        Self { probe, config }
    }

    pub fn config(&self) -> &UpkeepConfig {
        &self.config
    }

    /// Check one bookmark. Never fails.
    pub async fn run_check(&self, bookmark: &Bookmark) -> HealthRecord {
        let record = match parse_url(&bookmark.url) {
            Ok(url) => self.probe_url(bookmark, &url).await,
            Err(e) => HealthRecord::broken(bookmark.id, 0, e.to_string()),
        };

        if record.status.is_problem() {
            warn!(
                bookmark_id = %record.bookmark_id,
                url = %bookmark.url,
                status = %record.status,
                status_code = ?record.status_code,
                latency_ms = record.latency_ms,
                error = ?record.error,
                "Bookmark health problem"
            );
        } else {
            debug!(
                bookmark_id = %record.bookmark_id,
                status = %record.status,
                latency_ms = record.latency_ms,
                "Bookmark checked"
            );
        }

        record
    }

    async fn probe_url(&self, bookmark: &Bookmark, url: &Url) -> HealthRecord {
        let started = Instant::now();
        let result = tokio::time::timeout(self.config.probe_timeout, self.walk(url)).await;
        let elapsed = started.elapsed();
        let latency_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);

        let outcome = match result {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(e)) => return HealthRecord::broken(bookmark.id, latency_ms, e.to_string()),
            Err(_) => {
                let e = ProbeError::Timeout {
                    after: self.config.probe_timeout,
                };
                return HealthRecord::broken(bookmark.id, latency_ms, e.to_string());
            }
        };

        let status = classify(outcome.status, elapsed, self.config.slow_threshold);
        let error = match status {
            HealthStatus::Unknown => Some(ProbeError::UnexpectedStatus(outcome.status).to_string()),
            HealthStatus::Redirect => outcome.target_error,
            _ => None,
        };

        HealthRecord {
            bookmark_id: bookmark.id,
            status,
            status_code: Some(outcome.status),
            latency_ms,
            redirect_url: outcome.redirect_url,
            error,
            checked_at: Utc::now(),
        }
    }

    /// Request `url` and, for a redirect, walk the chain to its end.
    ///
    /// Only an over-long chain fails the walk. Other failures past the first
    /// response are reported as `target_error`.
    async fn walk(&self, url: &Url) -> ProbeResult<Outcome> {
        let first = self.probe.send(url).await?;
        if !first.is_redirect() {
            return Ok(Outcome {
                status: first.status,
                redirect_url: None,
                target_error: None,
            });
        }

        let redirect_url = first.location.as_deref().map(|location| match Url::parse(location) {
            Ok(_) => location.to_string(),
            Err(_) => url
                .join(location)
                .map(|u| u.to_string())
                .unwrap_or_else(|_| location.to_string()),
        });

        let status = first.status;
        let target_error =
            match continue_redirects(self.probe.as_ref(), url, first, self.config.max_redirects).await {
                Ok(chain) if chain.final_status >= 400 => Some(format!(
                    "redirect target {} returned HTTP {}",
                    chain.final_url, chain.final_status
                )),
                Ok(_) => None,
                Err(e @ ProbeError::TooManyRedirects { .. }) => return Err(e),
                Err(e) => Some(format!("redirect target unreachable: {e}")),
            };

        Ok(Outcome {
            status,
            redirect_url,
            target_error,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const THRESHOLD: Duration = Duration::from_secs(5);

    #[test]
    fn test_classify_ranges() {
        let fast = Duration::from_millis(200);
        assert_eq!(classify(200, fast, THRESHOLD), HealthStatus::Healthy);
        assert_eq!(classify(204, Duration::from_secs(6), THRESHOLD), HealthStatus::Slow);
        assert_eq!(classify(301, fast, THRESHOLD), HealthStatus::Redirect);
        assert_eq!(classify(404, fast, THRESHOLD), HealthStatus::Broken);
        assert_eq!(classify(503, fast, THRESHOLD), HealthStatus::Broken);
        assert_eq!(classify(101, fast, THRESHOLD), HealthStatus::Unknown);
    }

    #[test]
    fn test_latency_at_threshold_is_healthy() {
        assert_eq!(classify(200, THRESHOLD, THRESHOLD), HealthStatus::Healthy);
    }
}
