//! Core data types.

pub mod bookmark;
pub mod duplicate;
pub mod health;

pub use bookmark::{Bookmark, BookmarkFilter, BookmarkId, BookmarkUpdate, Pagination, MAX_PAGE_LIMIT};
pub use duplicate::{
    DuplicateCheckResult, DuplicateGroup, MergeReport, MergeRequest, MergeWarning, SimilarBookmark,
};
pub use health::{HealthRecord, HealthStats, HealthStatus, StatusCounts, SweepReport};
