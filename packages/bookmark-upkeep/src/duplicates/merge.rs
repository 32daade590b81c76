//! Fold duplicate bookmarks into a primary.
//!
//! Order of operations:
//! 1. Load the primary (missing primary is an error) and each duplicate
//!    (missing duplicates are skipped).
//! 2. Compute one update: tag union and/or best title and description.
//! 3. Write the primary once.
//! 4. Delete each duplicate. A failed delete becomes a warning; the rest
//!    are still attempted.
//!
//! There is no multi-row transaction. If the primary update fails nothing
//! is deleted.

use std::sync::Arc;

use indexmap::IndexSet;
use tracing::{info, warn};

use crate::error::{Result, UpkeepError};
use crate::traits::repository::BookmarkRepository;
use crate::types::bookmark::{Bookmark, BookmarkId, BookmarkUpdate};
use crate::types::duplicate::{MergeReport, MergeRequest, MergeWarning};

/// Case-sensitive union of tags, primary first, in first-seen order.
pub fn union_tags<'a>(primary: &Bookmark, duplicates: impl IntoIterator<Item = &'a Bookmark>) -> Vec<String> {
    let mut tags: IndexSet<String> = primary.tags.iter().cloned().collect();
    for duplicate in duplicates {
        tags.extend(duplicate.tags.iter().cloned());
    }
    tags.into_iter().collect()
}

fn is_untitled(title: &str) -> bool {
    title.to_lowercase().contains("untitled")
}

/// Pick the best title among the primary and its duplicates.
///
/// A candidate replaces the current best only when it is strictly longer and
/// does not contain "untitled".
pub fn select_title<'a>(primary: &'a Bookmark, duplicates: &[&'a Bookmark]) -> &'a str {
    let mut best = primary.title.as_str();
    for duplicate in duplicates {
        let candidate = duplicate.title.as_str();
        if !is_untitled(candidate)
            && candidate.trim().chars().count() > best.trim().chars().count()
        {
            best = candidate;
        }
    }
    best
}

/// Keep the primary's description unless it is empty.
pub fn select_description<'a>(primary: &'a Bookmark, duplicates: &[&'a Bookmark]) -> Option<&'a str> {
    if !primary.description_text().trim().is_empty() {
        return primary.description.as_deref();
    }
    duplicates
        .iter()
        .map(|d| d.description_text())
        .find(|d| !d.trim().is_empty())
}

/// Applies merge requests against a repository.
pub struct MergeEngine<R> {
    repo: Arc<R>,
}

impl<R> Clone for MergeEngine<R> {
    fn clone(&self) -> Self {
        Self {
            repo: Arc::clone(&self.repo),
        }
    }
}

impl<R: BookmarkRepository> MergeEngine<R> {
    pub fn new(repo: Arc<R>) -> Self {
        Self { repo }
    }

    /// Merge the duplicates named in `request` into its primary.
    ///
    /// Succeeds once the primary is written, even if some deletes fail; those
    /// are reported in [`MergeReport::warnings`].
    pub async fn merge(&self, request: &MergeRequest) -> Result<MergeReport> {
        if request.duplicate_ids.is_empty() {
            return Err(UpkeepError::invalid_input("no duplicate ids given"));
        }

        let primary = self
            .repo
            .get_by_id(request.primary_id)
            .await?
            .ok_or(UpkeepError::NotFound(request.primary_id))?;

        let mut skipped = Vec::new();
        let mut duplicates = Vec::new();
        let ids: IndexSet<BookmarkId> = request.duplicate_ids.iter().copied().collect();

        for id in ids {
            if id == primary.id {
                skipped.push(id);
                continue;
            }
            match self.repo.get_by_id(id).await? {
                Some(bookmark) => duplicates.push(bookmark),
                None => {
                    warn!(primary_id = %primary.id, duplicate_id = %id, "Duplicate not found, skipping");
                    skipped.push(id);
                }
            }
        }

        let update = plan_update(&primary, &duplicates, request);
        let primary = if update.is_empty() {
            primary
        } else {
            self.repo.update(primary.id, &update).await?
        };

        let mut deleted = Vec::new();
        let mut warnings = Vec::new();
        for duplicate in &duplicates {
            match self.repo.delete(duplicate.id).await {
                Ok(()) => deleted.push(duplicate.id),
                Err(e) => {
                    warn!(
                        primary_id = %primary.id,
                        duplicate_id = %duplicate.id,
                        error = %e,
                        "Failed to delete merged duplicate"
                    );
                    warnings.push(MergeWarning {
                        bookmark_id: duplicate.id,
                        message: e.to_string(),
                    });
                }
            }
        }

        info!(
            primary_id = %primary.id,
            deleted = deleted.len(),
            skipped = skipped.len(),
            failed = warnings.len(),
            "Merged duplicates"
        );

        Ok(MergeReport {
            primary,
            deleted,
            skipped,
            warnings,
        })
    }
}

/// Build the single write applied to the primary.
fn plan_update(primary: &Bookmark, duplicates: &[Bookmark], request: &MergeRequest) -> BookmarkUpdate {
    let mut update = BookmarkUpdate::default();
    if duplicates.is_empty() {
        return update;
    }

    if request.merge_tags {
        let tags = union_tags(primary, duplicates);
        if tags != primary.tags {
            update.tags = Some(tags);
        }
    }

    if request.merge_metadata {
        let others: Vec<&Bookmark> = duplicates.iter().collect();

        let title = select_title(primary, &others);
        if title != primary.title {
            update.title = Some(title.to_string());
        }

        if let Some(description) = select_description(primary, &others) {
            if primary.description.as_deref() != Some(description) {
                update.description = Some(description.to_string());
            }
        }
    }

    update
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_union_tags_is_case_sensitive() {
        let primary = Bookmark::new(1, "https://a.com", "A").with_tags(["rust", "web"]);
        let dup = Bookmark::new(2, "https://a.com/", "A").with_tags(["Rust", "web", "async"]);

        assert_eq!(union_tags(&primary, [&dup]), vec!["rust", "web", "Rust", "async"]);
    }

    #[test]
    fn test_select_title_prefers_longer_real_title() {
        let primary = Bookmark::new(1, "https://a.com", "Tokio");
        let longer = Bookmark::new(2, "https://a.com", "Tokio - async runtime");
        let untitled = Bookmark::new(3, "https://a.com", "Untitled document with long name");

        assert_eq!(select_title(&primary, &[&longer, &untitled]), "Tokio - async runtime");
    }

    #[test]
    fn test_select_title_keeps_placeholder_over_shorter_title() {
        let primary = Bookmark::new(1, "https://a.com", "Untitled");
        let short = Bookmark::new(2, "https://a.com", "A");
        assert_eq!(select_title(&primary, &[&short]), "Untitled");

        let longer = Bookmark::new(3, "https://a.com", "Async Rust book");
        assert_eq!(select_title(&primary, &[&short, &longer]), "Async Rust book");
    }

    #[test]
    fn test_select_title_fills_empty_primary() {
        let primary = Bookmark::new(1, "https://a.com", "");
        let dup = Bookmark::new(2, "https://a.com", "A");
        assert_eq!(select_title(&primary, &[&dup]), "A");
    }

    #[test]
    fn test_select_description_keeps_primary() {
        let primary = Bookmark::new(1, "https://a.com", "A").with_description("mine");
        let dup = Bookmark::new(2, "https://a.com", "A").with_description("theirs");
        assert_eq!(select_description(&primary, &[&dup]), Some("mine"));

        let empty = Bookmark::new(1, "https://a.com", "A").with_description("  ");
        assert_eq!(select_description(&empty, &[&dup]), Some("theirs"));
    }

    #[test]
    fn test_plan_update_skips_unchanged_fields() {
        let primary = Bookmark::new(1, "https://a.com", "Same").with_tags(["x"]);
        let dup = Bookmark::new(2, "https://a.com", "Same").with_tags(["x"]);
        let request = MergeRequest::new(primary.id, [dup.id]);

        assert!(plan_update(&primary, &[dup], &request).is_empty());
    }
}
