//! Scheduled and on-demand health sweeps.
//!
//! A sweep loads the corpus once, splits it into fixed-size batches and runs
//! the batches one after another with a pause in between. Inside a batch the
//! checks run concurrently, bounded by a semaphore shared across the sweep.
//!
//! All sweeps started through one monitor share a cancellation token.
//! Cancelling it stops in-flight and queued checks; records already written
//! to the [`HealthStore`] stay.

use std::sync::{Arc, Mutex, PoisonError, RwLock};

use chrono::Utc;
use futures::future::join_all;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use super::prober::LivenessProber;
use super::store::HealthStore;
use crate::config::UpkeepConfig;
use crate::error::{Result, UpkeepError};
use crate::traits::repository::{load_corpus, BookmarkRepository, CORPUS_PAGE_SIZE};
use crate::types::bookmark::{Bookmark, BookmarkId};
use crate::types::health::{HealthRecord, HealthStatus, SweepReport};

/// Drives liveness sweeps over a repository.
pub struct HealthMonitor<R> {
    inner: Arc<MonitorInner<R>>,
}

impl<R> Clone for HealthMonitor<R> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct MonitorInner<R> {
    repo: Arc<R>,
    prober: LivenessProber,
    store: Arc<HealthStore>,
    config: UpkeepConfig,
    /// Shared by the schedule and on-demand sweeps; replaced after each stop
    cancel: Mutex<CancellationToken>,
    schedule: Mutex<Option<JoinHandle<()>>>,
    last_sweep: RwLock<Option<SweepReport>>,
}

impl<R: BookmarkRepository + 'static> HealthMonitor<R> {
    /// Fails when the prober's config would leave sweeps unable to run.
    pub fn new(repo: Arc<R>, prober: LivenessProber, store: Arc<HealthStore>) -> Result<Self> {
        let config = prober.config().clone();
        config.validate()?;
        Ok(Self {
            inner: Arc::new(MonitorInner {
                repo,
                prober,
                store,
                config,
                cancel: Mutex::new(CancellationToken::new()),
                schedule: Mutex::new(None),
                last_sweep: RwLock::new(None),
            }),
        })
    }

    pub fn store(&self) -> &Arc<HealthStore> {
        &self.inner.store
    }

    /// Report of the most recent finished or cancelled sweep.
    pub fn last_sweep(&self) -> Option<SweepReport> {
        self.inner
            .last_sweep
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Whether the periodic schedule is running.
    pub fn is_scheduled(&self) -> bool {
        self.inner
            .schedule
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Start the periodic schedule: one sweep now, then one per interval.
    ///
    /// Returns `false` if the schedule was already running.
    pub fn start_sweeps(&self) -> bool {
        let mut schedule = self
            .inner
            .schedule
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if schedule.as_ref().is_some_and(|h| !h.is_finished()) {
            return false;
        }

        let token = self.inner.current_token();
        let inner = Arc::clone(&self.inner);
        let period = self.inner.config.sweep_interval;

        info!(interval_secs = period.as_secs(), "Starting scheduled health sweeps");

        *schedule = Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = interval.tick() => {
                        // Failure is already logged; the next tick retries.
                        if inner.sweep(&token).await.is_err() {
                            debug!("Scheduled sweep failed, retrying next interval");
                        }
                    }
                }
            }

            info!("Scheduled health sweeps stopped");
        }));
        true
    }

    /// Cancel the schedule and any sweep in progress.
    ///
    /// Returns `true` if a schedule was running.
    pub fn stop_sweeps(&self) -> bool {
        {
            let mut cancel = self
                .inner
                .cancel
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            cancel.cancel();
            *cancel = CancellationToken::new();
        }

        self.inner
            .schedule
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Start a sweep in the background.
    ///
    /// The handle may be dropped; the sweep keeps running and its report is
    /// available through [`last_sweep`](Self::last_sweep).
    pub fn run_all(&self) -> JoinHandle<Result<SweepReport>> {
        let token = self.inner.current_token();
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move { inner.sweep(&token).await })
    }

    /// Run one sweep on the current task, stopping when `cancel` fires.
    pub async fn sweep(&self, cancel: &CancellationToken) -> Result<SweepReport> {
        self.inner.sweep(cancel).await
    }

    /// Check a single bookmark right away, outside any batch.
    pub async fn check_now(&self, id: BookmarkId) -> Result<HealthRecord> {
        let bookmark = self
            .inner
            .repo
            .get_by_id(id)
            .await?
            .ok_or(UpkeepError::NotFound(id))?;

        let record = self.inner.prober.run_check(&bookmark).await;
        self.inner.store.put(record.clone());
        Ok(record)
    }
}

impl<R: BookmarkRepository> MonitorInner<R> {
    fn current_token(&self) -> CancellationToken {
        self.cancel
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    async fn sweep(&self, cancel: &CancellationToken) -> Result<SweepReport> {
        let bookmarks = match load_corpus(self.repo.as_ref(), CORPUS_PAGE_SIZE).await {
            Ok(bookmarks) => bookmarks,
            Err(e) => {
                error!(error = %e, "Health sweep aborted: could not list bookmarks");
                return Err(e.into());
            }
        };

        let mut report = SweepReport::begin(bookmarks.len());
        info!(
            total = report.total,
            batch_size = self.config.batch_size,
            max_concurrent = self.config.max_concurrent_probes,
            "Health sweep starting"
        );

        let limiter = Semaphore::new(self.config.max_concurrent_probes.max(1));

        for (index, batch) in bookmarks.chunks(self.config.batch_size.max(1)).enumerate() {
            if index > 0 {
                tokio::select! {
                    _ = cancel.cancelled() => {}
                    _ = tokio::time::sleep(self.config.batch_pause) => {}
                }
            }
            if cancel.is_cancelled() {
                report.cancelled = true;
                break;
            }

            debug!(batch = index, size = batch.len(), "Checking batch");

            let statuses = join_all(
                batch
                    .iter()
                    .map(|bookmark| self.check_one(bookmark, &limiter, cancel)),
            )
            .await;
            for status in statuses.into_iter().flatten() {
                report.counts.record(status);
            }

            if cancel.is_cancelled() {
                report.cancelled = true;
                break;
            }
        }

        report.finished_at = Some(Utc::now());
        info!(
            total = report.total,
            checked = report.checked(),
            healthy = report.counts.healthy,
            slow = report.counts.slow,
            redirect = report.counts.redirect,
            broken = report.counts.broken,
            unknown = report.counts.unknown,
            cancelled = report.cancelled,
            "Health sweep finished"
        );

        *self
            .last_sweep
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(report.clone());
        Ok(report)
    }

    /// Acquire a slot, check, store. `None` when cancelled first.
    async fn check_one(
        &self,
        bookmark: &Bookmark,
        limiter: &Semaphore,
        cancel: &CancellationToken,
    ) -> Option<HealthStatus> {
        let _permit = tokio::select! {
            _ = cancel.cancelled() => return None,
            permit = limiter.acquire() => permit.ok()?,
        };

        let record = tokio::select! {
            _ = cancel.cancelled() => return None,
            record = self.prober.run_check(bookmark) => record,
        };

        let status = record.status;
        self.store.put(record);
        Some(status)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::stores::MemoryBookmarkRepository;
    use crate::testing::MockProbeClient;

    fn monitor_with(config: UpkeepConfig) -> Result<HealthMonitor<MemoryBookmarkRepository>> {
        let prober = LivenessProber::new(Arc::new(MockProbeClient::new()), config);
        HealthMonitor::new(
            Arc::new(MemoryBookmarkRepository::new()),
            prober,
            Arc::new(HealthStore::new()),
        )
    }

    #[test]
    fn test_new_rejects_zero_interval() {
        let config = UpkeepConfig::default().with_sweep_interval(Duration::ZERO);
        assert!(matches!(monitor_with(config), Err(UpkeepError::InvalidInput { .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn test_new_with_defaults_can_schedule() {
        let monitor = monitor_with(UpkeepConfig::default()).unwrap();
        assert!(monitor.start_sweeps());
        assert!(monitor.is_scheduled());
        assert!(monitor.stop_sweeps());
        assert!(!monitor.is_scheduled());
    }
}
