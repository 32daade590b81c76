//! Bookmark records as exposed by the repository.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, UpkeepError};

/// Largest page a caller may request from the repository.
pub const MAX_PAGE_LIMIT: usize = 1000;

/// Stable, unique bookmark identifier assigned by the repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BookmarkId(i64);

impl BookmarkId {
    /// Wrap a raw repository id.
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    /// Returns the raw repository id.
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl From<i64> for BookmarkId {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl fmt::Display for BookmarkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl FromStr for BookmarkId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        s.trim().parse().map(Self)
    }
}

/// A saved URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bookmark {
    pub id: BookmarkId,

    /// Never empty.
    pub url: String,

    #[serde(default)]
    pub title: String,

    #[serde(default)]
    pub description: Option<String>,

    /// Tag names, compared by exact string equality.
    #[serde(default)]
    pub tags: Vec<String>,

    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl Bookmark {
    /// Create a bookmark with no description or tags.
    pub fn new(id: i64, url: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: BookmarkId::new(id),
            url: url.into(),
            title: title.into(),
            description: None,
            tags: Vec::new(),
            created_at: Utc::now(),
        }
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Replace the tag list.
    pub fn with_tags(mut self, tags: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    /// Set the creation timestamp.
    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }

    /// Description text, empty when absent.
    pub fn description_text(&self) -> &str {
        self.description.as_deref().unwrap_or("")
    }
}

/// Field-level update applied through `BookmarkRepository::update`.
///
/// `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookmarkUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub tags: Option<Vec<String>>,
}

impl BookmarkUpdate {
    /// True when the update would not change anything.
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.description.is_none() && self.tags.is_none()
    }

    /// Apply the set fields to a bookmark in place.
    pub fn apply_to(&self, bookmark: &mut Bookmark) {
        if let Some(title) = &self.title {
            bookmark.title = title.clone();
        }
        if let Some(description) = &self.description {
            bookmark.description = Some(description.clone());
        }
        if let Some(tags) = &self.tags {
            bookmark.tags = tags.clone();
        }
    }
}

/// Offset pagination for repository listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub(crate) limit: usize,
    pub(crate) offset: usize,
}

impl Pagination {
    /// Validate and build a page request.
    ///
    /// # Errors
    /// `InvalidInput` when `limit` is zero or above [`MAX_PAGE_LIMIT`].
    pub fn new(limit: usize, offset: usize) -> Result<Self> {
        if limit == 0 {
            return Err(UpkeepError::invalid_input("page limit must be at least 1"));
        }
        if limit > MAX_PAGE_LIMIT {
            return Err(UpkeepError::invalid_input(format!(
                "page limit {limit} exceeds maximum of {MAX_PAGE_LIMIT}"
            )));
        }
        Ok(Self { limit, offset })
    }

    /// First page of the given size, clamped into the valid range.
    pub fn first(limit: usize) -> Self {
        Self {
            limit: limit.clamp(1, MAX_PAGE_LIMIT),
            offset: 0,
        }
    }

    /// The page that follows this one.
    pub fn next(&self) -> Self {
        Self {
            limit: self.limit,
            offset: self.offset + self.limit,
        }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn offset(&self) -> usize {
        self.offset
    }
}

/// Optional narrowing for `BookmarkRepository::list`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookmarkFilter {
    /// Only bookmarks carrying this exact tag.
    pub tag: Option<String>,

    /// Only bookmarks whose URL contains this substring.
    pub url_contains: Option<String>,
}

impl BookmarkFilter {
    /// Filter that matches every bookmark.
    pub fn all() -> Self {
        Self::default()
    }

    /// Restrict to a tag.
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    /// Restrict to URLs containing a substring.
    pub fn with_url_containing(mut self, needle: impl Into<String>) -> Self {
        self.url_contains = Some(needle.into());
        self
    }

    /// Check whether a bookmark passes the filter.
    pub fn matches(&self, bookmark: &Bookmark) -> bool {
        let tag_ok = self
            .tag
            .as_ref()
            .map(|tag| bookmark.tags.iter().any(|t| t == tag))
            .unwrap_or(true);
        let url_ok = self
            .url_contains
            .as_ref()
            .map(|needle| bookmark.url.contains(needle.as_str()))
            .unwrap_or(true);
        tag_ok && url_ok
    }
}
