//! Runtime configuration for sweeps and probes.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, UpkeepError};

/// Configuration for liveness sweeps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpkeepConfig {
    /// How often the scheduled sweep runs.
    ///
    /// Default: 24 hours.
    pub sweep_interval: Duration,

    /// Bookmarks probed per batch. Batches run one after another.
    ///
    /// Default: 50.
    pub batch_size: usize,

    /// Upper bound on simultaneous in-flight probes.
    ///
    /// Default: 10.
    pub max_concurrent_probes: usize,

    /// Budget for a single check, redirects included.
    ///
    /// Default: 10 seconds.
    pub probe_timeout: Duration,

    /// A 2xx response slower than this is classified `Slow`.
    ///
    /// Default: 5 seconds.
    pub slow_threshold: Duration,

    /// Redirect hops followed before giving up. Default: 5.
    pub max_redirects: usize,

    /// Pause between batches. Default: 1 second.
    pub batch_pause: Duration,

    pub user_agent: String,
}

impl Default for UpkeepConfig {
    fn default() -> Self {
        Self {
            sweep_interval: Duration::from_secs(24 * 60 * 60),
            batch_size: 50,
            max_concurrent_probes: 10,
            probe_timeout: Duration::from_secs(10),
            slow_threshold: Duration::from_secs(5),
            max_redirects: 5,
            batch_pause: Duration::from_secs(1),
            user_agent: format!("bookmark-upkeep/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl UpkeepConfig {
    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }

    pub fn with_batch_size(mut self, size: usize) -> Self {
        self.batch_size = size;
        self
    }

    pub fn with_max_concurrent_probes(mut self, max: usize) -> Self {
        self.max_concurrent_probes = max;
        self
    }

    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }

    pub fn with_slow_threshold(mut self, threshold: Duration) -> Self {
        self.slow_threshold = threshold;
        self
    }

    pub fn with_max_redirects(mut self, hops: usize) -> Self {
        self.max_redirects = hops;
        self
    }

    pub fn with_batch_pause(mut self, pause: Duration) -> Self {
        self.batch_pause = pause;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Load configuration from environment variables.
    ///
    /// Reads `.env` if present. Unset variables keep their defaults.
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenvy::dotenv();

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let config = Self {
            sweep_interval: read_var(&lookup, "UPKEEP_SWEEP_INTERVAL_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(defaults.sweep_interval),
            batch_size: read_var(&lookup, "UPKEEP_BATCH_SIZE")?.unwrap_or(defaults.batch_size),
            max_concurrent_probes: read_var(&lookup, "UPKEEP_MAX_CONCURRENT_PROBES")?
                .unwrap_or(defaults.max_concurrent_probes),
            probe_timeout: read_var(&lookup, "UPKEEP_PROBE_TIMEOUT_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(defaults.probe_timeout),
            slow_threshold: read_var(&lookup, "UPKEEP_SLOW_THRESHOLD_MS")?
                .map(Duration::from_millis)
                .unwrap_or(defaults.slow_threshold),
            max_redirects: read_var(&lookup, "UPKEEP_MAX_REDIRECTS")?
                .unwrap_or(defaults.max_redirects),
            batch_pause: read_var(&lookup, "UPKEEP_BATCH_PAUSE_MS")?
                .map(Duration::from_millis)
                .unwrap_or(defaults.batch_pause),
            user_agent: lookup("UPKEEP_USER_AGENT").unwrap_or(defaults.user_agent),
        };

        config.validate()?;
        Ok(config)
    }

    /// Reject settings that would stall or disable sweeps.
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(UpkeepError::invalid_input("batch size must be at least 1"));
        }
        if self.max_concurrent_probes == 0 {
            return Err(UpkeepError::invalid_input(
                "max concurrent probes must be at least 1",
            ));
        }
        if self.probe_timeout.is_zero() {
            return Err(UpkeepError::invalid_input("probe timeout must be non-zero"));
        }
        if self.sweep_interval.is_zero() {
            return Err(UpkeepError::invalid_input("sweep interval must be non-zero"));
        }
        Ok(())
    }
}

fn read_var<F, T>(lookup: &F, key: &str) -> Result<Option<T>>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw.trim().parse().map(Some).map_err(|_| {
            UpkeepError::invalid_input(format!("{key} must be a valid number, got `{raw}`"))
        }),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = UpkeepConfig::default();
        assert_eq!(config.sweep_interval, Duration::from_secs(86_400));
        assert_eq!(config.batch_size, 50);
        assert_eq!(config.max_concurrent_probes, 10);
        assert_eq!(config.probe_timeout, Duration::from_secs(10));
        assert_eq!(config.slow_threshold, Duration::from_secs(5));
        assert_eq!(config.max_redirects, 5);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_lookup_overrides() {
        let config = UpkeepConfig::from_lookup(lookup_from(&[
            ("UPKEEP_BATCH_SIZE", "20"),
            ("UPKEEP_SLOW_THRESHOLD_MS", "1500"),
        ]))
        .unwrap();

        assert_eq!(config.batch_size, 20);
        assert_eq!(config.slow_threshold, Duration::from_millis(1500));
        assert_eq!(config.max_concurrent_probes, 10);
    }

    #[test]
    fn test_from_lookup_rejects_garbage_and_zero() {
        let err = UpkeepConfig::from_lookup(lookup_from(&[("UPKEEP_BATCH_SIZE", "lots")]));
        assert!(matches!(err, Err(UpkeepError::InvalidInput { .. })));

        let err = UpkeepConfig::from_lookup(lookup_from(&[("UPKEEP_MAX_CONCURRENT_PROBES", "0")]));
        assert!(matches!(err, Err(UpkeepError::InvalidInput { .. })));
    }
}
