//! Caller-facing entry point.
//!
//! [`UpkeepService`] owns the health cache, the sweep monitor and the
//! duplicate tooling for one repository. Duplicate scans and merges share a
//! single in-flight guard so two of them never race over the same rows.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::config::UpkeepConfig;
use crate::duplicates::{DuplicateAnalyzer, MergeEngine};
use crate::error::{Result, UpkeepError};
use crate::health::{HealthMonitor, HealthStore, LivenessProber};
use crate::normalizer::UrlNormalizer;
use crate::probes::ReqwestProbe;
use crate::traits::probe::HttpProbe;
use crate::traits::repository::{load_corpus, BookmarkRepository, CORPUS_PAGE_SIZE};
use crate::types::bookmark::BookmarkId;
use crate::types::duplicate::{DuplicateCheckResult, DuplicateGroup, MergeReport, MergeRequest};
use crate::types::health::{HealthRecord, HealthStats, SweepReport};

/// Name of the guard serializing duplicate scans and merges.
pub const SCAN_LOCK_NAME: &str = "duplicate-scan";

pub struct UpkeepService<R> {
    repo: Arc<R>,
    store: Arc<HealthStore>,
    monitor: HealthMonitor<R>,
    analyzer: DuplicateAnalyzer,
    normalizer: UrlNormalizer,
    merger: MergeEngine<R>,
    scan_guard: Arc<Mutex<()>>,
}

impl<R> Clone for UpkeepService<R> {
    fn clone(&self) -> Self {
        Self {
            repo: Arc::clone(&self.repo),
            store: Arc::clone(&self.store),
            monitor: self.monitor.clone(),
            analyzer: self.analyzer,
            normalizer: self.normalizer.clone(),
            merger: self.merger.clone(),
            scan_guard: Arc::clone(&self.scan_guard),
        }
    }
}

impl<R: BookmarkRepository + 'static> UpkeepService<R> {
    /// Build a service over `repo`, probing through `probe`.
    pub fn new(repo: Arc<R>, probe: Arc<dyn HttpProbe>, config: UpkeepConfig) -> Result<Self> {
        config.validate()?;

        let store = Arc::new(HealthStore::new());
        let normalizer = UrlNormalizer::with_probe(Arc::clone(&probe), config.probe_timeout);
        let prober = LivenessProber::new(probe, config);
        let monitor = HealthMonitor::new(Arc::clone(&repo), prober, Arc::clone(&store))?;

        Ok(Self {
            merger: MergeEngine::new(Arc::clone(&repo)),
            repo,
            store,
            monitor,
            analyzer: DuplicateAnalyzer::new(),
            normalizer,
            scan_guard: Arc::new(Mutex::new(())),
        })
    }

    /// Build a service that probes over real HTTP.
    pub fn with_http(repo: Arc<R>, config: UpkeepConfig) -> Result<Self> {
        let probe = ReqwestProbe::new(&config)?;
        Self::new(repo, Arc::new(probe), config)
    }

    pub fn health_store(&self) -> &Arc<HealthStore> {
        &self.store
    }

    // --- Health ---

    pub fn get_health(&self, id: BookmarkId) -> Option<HealthRecord> {
        self.store.get(id)
    }

    pub fn get_all_health(&self) -> Vec<HealthRecord> {
        self.store.get_all()
    }

    pub async fn get_health_stats(&self) -> Result<HealthStats> {
        Ok(self.store.stats(self.repo.as_ref()).await?)
    }

    /// Probe one bookmark now and store the result.
    pub async fn check_bookmark_now(&self, id: BookmarkId) -> Result<HealthRecord> {
        self.monitor.check_now(id).await
    }

    /// Start a background sweep. The handle may be ignored.
    pub fn run_health_sweep(&self) -> tokio::task::JoinHandle<Result<SweepReport>> {
        self.monitor.run_all()
    }

    pub fn last_sweep(&self) -> Option<SweepReport> {
        self.monitor.last_sweep()
    }

    /// Sweep now and then every configured interval.
    pub fn start_health_sweeps(&self) -> bool {
        self.monitor.start_sweeps()
    }

    /// Cancel scheduled sweeps and any sweep in progress.
    pub fn stop_health_sweeps(&self) -> bool {
        self.monitor.stop_sweeps()
    }

    // --- Duplicates ---

    /// Check a prospective bookmark against the corpus before inserting it.
    pub async fn check_for_duplicates(&self, url: &str, title: &str) -> Result<DuplicateCheckResult> {
        if url.trim().is_empty() {
            return Err(UpkeepError::invalid_input("url is required"));
        }
        let candidate = self.normalizer.normalize_with_expansion(url).await?;

        let exact = self.repo.get_by_url(url).await?;
        let corpus = load_corpus(self.repo.as_ref(), CORPUS_PAGE_SIZE).await?;

        Ok(self.analyzer.check_candidate(&candidate, title, &corpus, exact))
    }

    /// Scan the whole corpus for duplicate groups.
    ///
    /// Waits for any other scan or merge to finish first. The scan itself
    /// runs on the blocking pool.
    pub async fn find_all_duplicates(&self) -> Result<Vec<DuplicateGroup>> {
        let _guard = self.scan_guard.lock().await;
        debug!(lock = SCAN_LOCK_NAME, "Acquired scan guard");

        let corpus = load_corpus(self.repo.as_ref(), CORPUS_PAGE_SIZE).await?;
        let total = corpus.len();
        let analyzer = self.analyzer;
        let groups = tokio::task::spawn_blocking(move || analyzer.find_groups(&corpus)).await?;

        info!(
            bookmarks = total,
            groups = groups.len(),
            duplicates = groups.iter().map(|g| g.duplicates.len()).sum::<usize>(),
            "Duplicate scan finished"
        );
        Ok(groups)
    }

    /// Merge duplicates into a primary bookmark.
    pub async fn merge_duplicates(&self, request: &MergeRequest) -> Result<MergeReport> {
        let _guard = self.scan_guard.lock().await;
        debug!(lock = SCAN_LOCK_NAME, primary_id = %request.primary_id, "Acquired scan guard");

        self.merger.merge(request).await
    }
}
