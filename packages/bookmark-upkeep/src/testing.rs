//! Testing utilities including mock implementations.
//!
//! These let applications exercise sweeps, duplicate checks and merges
//! without network access or a real database.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use url::Url;

use crate::error::{ProbeError, ProbeResult, RepoResult, RepositoryError};
use crate::traits::probe::{HttpProbe, ProbeResponse};
use crate::traits::repository::BookmarkRepository;
use crate::types::bookmark::{Bookmark, BookmarkFilter, BookmarkId, BookmarkUpdate, Pagination};

/// Scripted reply for one URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockReply {
    Status { status: u16, location: Option<String> },
    /// Transport failure with this message
    Fail(String),
}

#[derive(Debug, Clone)]
struct Route {
    reply: MockReply,
    delay: Option<Duration>,
}

/// A mock [`HttpProbe`] with scripted replies and concurrency tracking.
///
/// Unscripted URLs answer 200. Delays use `tokio::time::sleep`, so tests
/// running with paused time finish instantly while still observing the
/// simulated latency.
#[derive(Debug, Default)]
pub struct MockProbeClient {
    routes: HashMap<String, Route>,
    default_delay: Duration,

    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,

    /// Call tracking for assertions
    calls: Mutex<Vec<String>>,
}

fn route_key(url: &str) -> String {
    Url::parse(url)
        .map(|u| u.to_string())
        .unwrap_or_else(|_| url.to_string())
}

impl MockProbeClient {
    pub fn new() -> Self {
        Self::default()
    }

    fn route_mut(&mut self, url: &str) -> &mut Route {
        self.routes.entry(route_key(url)).or_insert(Route {
            reply: MockReply::Status {
                status: 200,
                location: None,
            },
            delay: None,
        })
    }

    /// Answer `url` with `status`.
    pub fn with_status(mut self, url: &str, status: u16) -> Self {
        self.route_mut(url).reply = MockReply::Status {
            status,
            location: None,
        };
        self
    }

    /// Answer `url` with a redirect to `location`.
    pub fn with_redirect(mut self, url: &str, status: u16, location: impl Into<String>) -> Self {
        self.route_mut(url).reply = MockReply::Status {
            status,
            location: Some(location.into()),
        };
        self
    }

    /// Fail requests to `url` with a network error.
    pub fn with_failure(mut self, url: &str, message: impl Into<String>) -> Self {
        self.route_mut(url).reply = MockReply::Fail(message.into());
        self
    }

    /// Delay responses from `url`.
    pub fn with_delay(mut self, url: &str, delay: Duration) -> Self {
        self.route_mut(url).delay = Some(delay);
        self
    }

    /// Delay for every URL without its own delay.
    pub fn with_default_delay(mut self, delay: Duration) -> Self {
        self.default_delay = delay;
        self
    }

    /// Highest number of simultaneous requests seen.
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    /// URLs requested, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

/// Decrements the in-flight counter even when the request is cancelled.
struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl HttpProbe for MockProbeClient {
    async fn send(&self, url: &Url) -> ProbeResult<ProbeResponse> {
        let key = url.to_string();
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(key.clone());

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);
        let _guard = InFlight(&self.in_flight);

        let route = self.routes.get(&key);
        let delay = route
            .and_then(|r| r.delay)
            .unwrap_or(self.default_delay);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        match route.map(|r| &r.reply) {
            None => Ok(ProbeResponse::new(200)),
            Some(MockReply::Status { status, location }) => Ok(ProbeResponse {
                status: *status,
                location: location.clone(),
            }),
            Some(MockReply::Fail(message)) => Err(ProbeError::Network(message.clone())),
        }
    }
}

/// Wraps a repository and injects failures.
#[derive(Debug)]
pub struct FailingRepository<R> {
    inner: R,
    fail_list: AtomicBool,
    fail_update: AtomicBool,
    fail_all_deletes: AtomicBool,
    failing_deletes: HashSet<BookmarkId>,
}

impl<R> FailingRepository<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            fail_list: AtomicBool::new(false),
            fail_update: AtomicBool::new(false),
            fail_all_deletes: AtomicBool::new(false),
            failing_deletes: HashSet::new(),
        }
    }

    /// Make every `list` call fail.
    pub fn failing_list(self) -> Self {
        self.fail_list.store(true, Ordering::SeqCst);
        self
    }

    /// Make every `update` call fail.
    pub fn failing_update(self) -> Self {
        self.fail_update.store(true, Ordering::SeqCst);
        self
    }

    /// Make deleting `id` fail.
    pub fn failing_delete(mut self, id: BookmarkId) -> Self {
        self.failing_deletes.insert(id);
        self
    }

    pub fn failing_all_deletes(self) -> Self {
        self.fail_all_deletes.store(true, Ordering::SeqCst);
        self
    }

    /// Toggle `list` failures at runtime.
    pub fn set_list_failing(&self, failing: bool) {
        self.fail_list.store(failing, Ordering::SeqCst);
    }

    pub fn inner(&self) -> &R {
        &self.inner
    }
}

fn injected(operation: &str) -> RepositoryError {
    RepositoryError::Backend(format!("injected {operation} failure"))
}

#[async_trait]
impl<R: BookmarkRepository> BookmarkRepository for FailingRepository<R> {
    async fn list(&self, page: Pagination, filter: &BookmarkFilter) -> RepoResult<Vec<Bookmark>> {
        if self.fail_list.load(Ordering::SeqCst) {
            return Err(injected("list"));
        }
        self.inner.list(page, filter).await
    }

    async fn get_by_id(&self, id: BookmarkId) -> RepoResult<Option<Bookmark>> {
        self.inner.get_by_id(id).await
    }

    async fn get_by_url(&self, url: &str) -> RepoResult<Option<Bookmark>> {
        self.inner.get_by_url(url).await
    }

    async fn update(&self, id: BookmarkId, update: &BookmarkUpdate) -> RepoResult<Bookmark> {
        if self.fail_update.load(Ordering::SeqCst) {
            return Err(injected("update"));
        }
        self.inner.update(id, update).await
    }

    async fn delete(&self, id: BookmarkId) -> RepoResult<()> {
        if self.fail_all_deletes.load(Ordering::SeqCst) || self.failing_deletes.contains(&id) {
            return Err(injected("delete"));
        }
        self.inner.delete(id).await
    }

    async fn count(&self) -> RepoResult<usize> {
        if self.fail_list.load(Ordering::SeqCst) {
            return Err(injected("count"));
        }
        self.inner.count().await
    }
}
