//! In-memory bookmark repository for testing and development.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;

use crate::error::{RepoResult, RepositoryError};
use crate::traits::repository::BookmarkRepository;
use crate::types::bookmark::{Bookmark, BookmarkFilter, BookmarkId, BookmarkUpdate, Pagination};

/// Bookmarks held in a map keyed by id.
///
/// Listing is in id order. Optionally backed by a JSON file through
/// [`load_json`](Self::load_json) / [`save_json`](Self::save_json).
#[derive(Debug, Default)]
pub struct MemoryBookmarkRepository {
    bookmarks: RwLock<BTreeMap<BookmarkId, Bookmark>>,
}

impl MemoryBookmarkRepository {
    /// Create an empty repository.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a repository holding `bookmarks`. Later duplicates of an id win.
    pub fn with_bookmarks(bookmarks: impl IntoIterator<Item = Bookmark>) -> Self {
        let map = bookmarks.into_iter().map(|b| (b.id, b)).collect();
        Self {
            bookmarks: RwLock::new(map),
        }
    }

    /// Insert or replace a bookmark.
    pub fn insert(&self, bookmark: Bookmark) {
        self.bookmarks
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(bookmark.id, bookmark);
    }

    pub fn len(&self) -> usize {
        self.bookmarks
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy of every bookmark in id order.
    pub fn snapshot(&self) -> Vec<Bookmark> {
        self.bookmarks
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect()
    }

    /// Load a JSON array of bookmarks.
    pub async fn load_json(path: impl AsRef<Path>) -> RepoResult<Self> {
        let raw = tokio::fs::read(path.as_ref())
            .await
            .map_err(|e| RepositoryError::Storage(Box::new(e)))?;
        let bookmarks: Vec<Bookmark> =
            serde_json::from_slice(&raw).map_err(|e| RepositoryError::Storage(Box::new(e)))?;

        if let Some(bad) = bookmarks.iter().find(|b| b.url.trim().is_empty()) {
            return Err(RepositoryError::Backend(format!(
                "bookmark {} has an empty URL",
                bad.id
            )));
        }

        Ok(Self::with_bookmarks(bookmarks))
    }

    /// Write every bookmark to `path` as a JSON array.
    pub async fn save_json(&self, path: impl AsRef<Path>) -> RepoResult<()> {
        let json = serde_json::to_vec_pretty(&self.snapshot())
            .map_err(|e| RepositoryError::Storage(Box::new(e)))?;
        tokio::fs::write(path.as_ref(), json)
            .await
            .map_err(|e| RepositoryError::Storage(Box::new(e)))
    }
}

#[async_trait]
impl BookmarkRepository for MemoryBookmarkRepository {
    async fn list(&self, page: Pagination, filter: &BookmarkFilter) -> RepoResult<Vec<Bookmark>> {
        Ok(self
            .bookmarks
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .filter(|b| filter.matches(b))
            .skip(page.offset())
            .take(page.limit())
            .cloned()
            .collect())
    }

    async fn get_by_id(&self, id: BookmarkId) -> RepoResult<Option<Bookmark>> {
        Ok(self
            .bookmarks
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id)
            .cloned())
    }

    async fn get_by_url(&self, url: &str) -> RepoResult<Option<Bookmark>> {
        Ok(self
            .bookmarks
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .find(|b| b.url == url)
            .cloned())
    }

    async fn update(&self, id: BookmarkId, update: &BookmarkUpdate) -> RepoResult<Bookmark> {
        let mut bookmarks = self
            .bookmarks
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let bookmark = bookmarks.get_mut(&id).ok_or(RepositoryError::NotFound(id))?;
        update.apply_to(bookmark);
        Ok(bookmark.clone())
    }

    async fn delete(&self, id: BookmarkId) -> RepoResult<()> {
        self.bookmarks
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id)
            .map(|_| ())
            .ok_or(RepositoryError::NotFound(id))
    }

    async fn count(&self) -> RepoResult<usize> {
        Ok(self.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::repository::load_corpus;

    fn sample() -> MemoryBookmarkRepository {
        MemoryBookmarkRepository::with_bookmarks(
            (1..=7).map(|i| Bookmark::new(i, format!("https://site{i}.com"), format!("Site {i}"))),
        )
    }

    #[tokio::test]
    async fn test_list_pages_in_id_order() {
        let repo = sample();
        let page = Pagination::new(3, 3).unwrap();
        let ids: Vec<i64> = repo
            .list(page, &BookmarkFilter::all())
            .await
            .unwrap()
            .iter()
            .map(|b| b.id.as_i64())
            .collect();

        assert_eq!(ids, vec![4, 5, 6]);
    }

    #[tokio::test]
    async fn test_load_corpus_reads_every_page() {
        let repo = sample();
        let corpus = load_corpus(&repo, 2).await.unwrap();
        assert_eq!(corpus.len(), 7);
        assert_eq!(corpus[6].id, BookmarkId::new(7));
    }

    #[tokio::test]
    async fn test_update_and_delete_missing() {
        let repo = sample();
        let missing = BookmarkId::new(99);

        assert!(matches!(
            repo.update(missing, &BookmarkUpdate::default()).await,
            Err(RepositoryError::NotFound(_))
        ));
        assert!(matches!(repo.delete(missing).await, Err(RepositoryError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_get_by_url_is_exact() {
        let repo = sample();
        assert!(repo.get_by_url("https://site1.com").await.unwrap().is_some());
        assert!(repo.get_by_url("https://site1.com/").await.unwrap().is_none());
    }
}
