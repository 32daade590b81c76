//! Bookmark repository abstraction.
//!
//! The repository owns bookmark rows. Every call is assumed atomic for a
//! single row; nothing here spans multiple rows in one transaction.

use async_trait::async_trait;

use crate::error::RepoResult;
use crate::types::bookmark::{Bookmark, BookmarkFilter, BookmarkId, BookmarkUpdate, Pagination};

/// Page size used when reading the whole corpus.
pub const CORPUS_PAGE_SIZE: usize = 500;

/// Storage of bookmarks, implemented by the host application.
#[async_trait]
pub trait BookmarkRepository: Send + Sync {
    /// List bookmarks in stable id order.
    async fn list(&self, page: Pagination, filter: &BookmarkFilter) -> RepoResult<Vec<Bookmark>>;

    /// Get a bookmark by id.
    async fn get_by_id(&self, id: BookmarkId) -> RepoResult<Option<Bookmark>>;

    /// Get a bookmark whose stored URL equals `url` exactly.
    async fn get_by_url(&self, url: &str) -> RepoResult<Option<Bookmark>>;

    /// Apply a field update and return the stored row.
    ///
    /// Returns `RepositoryError::NotFound` when the id does not exist.
    async fn update(&self, id: BookmarkId, update: &BookmarkUpdate) -> RepoResult<Bookmark>;

    /// Delete a bookmark.
    async fn delete(&self, id: BookmarkId) -> RepoResult<()>;

    /// Count all bookmarks.
    ///
    /// The default pages through the corpus; backends with a cheap count
    /// should override it.
    async fn count(&self) -> RepoResult<usize> {
        Ok(load_corpus(self, CORPUS_PAGE_SIZE).await?.len())
    }
}

/// Read every bookmark, page by page, in id order.
pub async fn load_corpus<R>(repo: &R, page_size: usize) -> RepoResult<Vec<Bookmark>>
where
    R: BookmarkRepository + ?Sized,
{
    let filter = BookmarkFilter::all();
    let mut page = Pagination::first(page_size);
    let mut corpus = Vec::new();

    loop {
        let batch = repo.list(page, &filter).await?;
        let fetched = batch.len();
        corpus.extend(batch);

        if fetched < page.limit() {
            break;
        }
        page = page.next();
    }

    corpus.sort_by_key(|b| b.id);
    Ok(corpus)
}
