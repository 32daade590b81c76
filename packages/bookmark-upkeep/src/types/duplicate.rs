//! Duplicate analysis and merge types.

use serde::{Deserialize, Serialize};

use super::bookmark::{Bookmark, BookmarkId};

/// A primary bookmark and the bookmarks judged to be copies of it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DuplicateGroup {
    pub primary: Bookmark,

    /// In corpus order
    pub duplicates: Vec<Bookmark>,

    /// Lowest pair confidence in the group, in [0, 1]
    pub confidence: f64,

    pub reason: String,
}

impl DuplicateGroup {
    pub fn duplicate_ids(&self) -> Vec<BookmarkId> {
        self.duplicates.iter().map(|b| b.id).collect()
    }
}

/// An existing bookmark resembling a candidate URL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarBookmark {
    pub bookmark: Bookmark,
    pub confidence: f64,
    pub reason: String,
}

/// Pre-insert duplicate check for a single candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DuplicateCheckResult {
    /// A bookmark with the exact same URL string exists
    pub has_exact_duplicate: bool,
    pub exact_match: Option<Bookmark>,

    pub has_similar_bookmarks: bool,

    /// Sorted by descending confidence
    pub similar: Vec<SimilarBookmark>,

    pub confidence: f64,
    pub recommendations: Vec<String>,
}

/// Request to fold duplicates into a primary bookmark.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeRequest {
    pub primary_id: BookmarkId,
    pub duplicate_ids: Vec<BookmarkId>,

    #[serde(default = "default_true")]
    pub merge_tags: bool,

    #[serde(default = "default_true")]
    pub merge_metadata: bool,
}

fn default_true() -> bool {
    true
}

impl MergeRequest {
    /// Merge tags and metadata by default.
    pub fn new(primary_id: BookmarkId, duplicate_ids: impl IntoIterator<Item = BookmarkId>) -> Self {
        Self {
            primary_id,
            duplicate_ids: duplicate_ids.into_iter().collect(),
            merge_tags: true,
            merge_metadata: true,
        }
    }

    pub fn with_merge_tags(mut self, merge_tags: bool) -> Self {
        self.merge_tags = merge_tags;
        self
    }

    pub fn with_merge_metadata(mut self, merge_metadata: bool) -> Self {
        self.merge_metadata = merge_metadata;
        self
    }
}

/// A duplicate whose deletion failed after the primary was updated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeWarning {
    pub bookmark_id: BookmarkId,
    pub message: String,
}

/// What a merge actually did.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergeReport {
    /// Primary as stored after the merge
    pub primary: Bookmark,

    pub deleted: Vec<BookmarkId>,

    /// Ids that were missing or equal to the primary
    pub skipped: Vec<BookmarkId>,

    pub warnings: Vec<MergeWarning>,
}

impl MergeReport {
    /// True when at least one delete failed.
    pub fn is_partial(&self) -> bool {
        !self.warnings.is_empty()
    }
}
