//! In-memory cache of the latest health record per bookmark.
//!
//! Many readers, one writer at a time. Every read hands out clones so
//! callers never hold references into the live map.

use std::collections::{HashMap, HashSet};
use std::sync::{PoisonError, RwLock};

use crate::error::RepoResult;
use crate::traits::repository::{load_corpus, BookmarkRepository, CORPUS_PAGE_SIZE};
use crate::types::bookmark::BookmarkId;
use crate::types::health::{HealthRecord, HealthStats, StatusCounts};

#[derive(Debug, Default)]
pub struct HealthStore {
    records: RwLock<HashMap<BookmarkId, HealthRecord>>,
}

impl HealthStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Latest record for `id`, if it was ever checked.
    pub fn get(&self, id: BookmarkId) -> Option<HealthRecord> {
        self.records
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id)
            .cloned()
    }

    /// Independent copy of every record, ordered by bookmark id.
    pub fn get_all(&self) -> Vec<HealthRecord> {
        let mut records: Vec<HealthRecord> = self
            .records
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect();
        records.sort_by_key(|r| r.bookmark_id);
        records
    }

    /// Insert or overwrite the record for its bookmark.
    pub fn put(&self, record: HealthRecord) {
        self.records
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(record.bookmark_id, record);
    }

    pub fn len(&self) -> usize {
        self.records
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Per-status counts plus the number of bookmarks never checked.
    ///
    /// Only records whose bookmark is still in the repository are counted.
    /// Stale records stay readable through [`get`](Self::get) but do not
    /// affect the stats.
    pub async fn stats<R>(&self, repo: &R) -> RepoResult<HealthStats>
    where
        R: BookmarkRepository + ?Sized,
    {
        let live: HashSet<BookmarkId> = load_corpus(repo, CORPUS_PAGE_SIZE)
            .await?
            .into_iter()
            .map(|b| b.id)
            .collect();
        let total_bookmarks = live.len();
        let records: Vec<HealthRecord> = self
            .get_all()
            .into_iter()
            .filter(|r| live.contains(&r.bookmark_id))
            .collect();

        let counts: StatusCounts = records.iter().collect();
        let timed: Vec<u64> = records
            .iter()
            .filter(|r| r.status_code.is_some())
            .map(|r| r.latency_ms)
            .collect();
        let average_latency_ms = if timed.is_empty() {
            None
        } else {
            Some(timed.iter().sum::<u64>() / timed.len() as u64)
        };

        Ok(HealthStats {
            total_bookmarks,
            checked: records.len(),
            unchecked: total_bookmarks.saturating_sub(records.len()),
            counts,
            average_latency_ms,
            last_checked_at: records.iter().map(|r| r.checked_at).max(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::health::HealthStatus;

    #[test]
    fn test_put_overwrites() {
        let store = HealthStore::new();
        let id = BookmarkId::new(1);
        store.put(HealthRecord::broken(id, 10, "first"));
        store.put(HealthRecord::broken(id, 20, "second"));

        assert_eq!(store.len(), 1);
        assert_eq!(store.get(id).unwrap().error.as_deref(), Some("second"));
    }

    #[test]
    fn test_get_all_returns_copies() {
        let store = HealthStore::new();
        let id = BookmarkId::new(1);
        store.put(HealthRecord::broken(id, 0, "down"));

        let mut snapshot = store.get_all();
        snapshot[0].status = HealthStatus::Healthy;

        assert_eq!(store.get(id).unwrap().status, HealthStatus::Broken);
    }
}
