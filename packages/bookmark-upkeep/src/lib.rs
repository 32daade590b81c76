//! Bookmark Corpus Upkeep Library
//!
//! Keeps a collection of saved URLs trustworthy over time:
//!
//! - periodically probes each bookmark and classifies its reachability
//! - finds bookmarks that point at the same resource and merges them
//!
//! Storage is not owned here. The host application implements
//! [`BookmarkRepository`] over its own database and hands it in.
//!
//! # Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use bookmark_upkeep::{MemoryBookmarkRepository, UpkeepConfig, UpkeepService};
//!
//! let repo = Arc::new(MemoryBookmarkRepository::load_json("bookmarks.json").await?);
//! let service = UpkeepService::with_http(repo, UpkeepConfig::from_env()?)?;
//!
//! // Sweep now and every 24h
//! service.start_health_sweeps();
//!
//! // Before inserting a new bookmark
//! let check = service.check_for_duplicates("https://bit.ly/abc", "Tokio").await?;
//! ```
//!
//! # Modules
//!
//! - [`normalizer`] - URL canonicalization and variation sets
//! - [`health`] - Liveness checks, health cache, scheduled sweeps
//! - [`duplicates`] - Duplicate scoring and merging
//! - [`traits`] - Repository and probe transport abstractions
//! - [`probes`] - Reqwest probe transport
//! - [`stores`] - In-memory repository
//! - [`testing`] - Mock implementations for testing

pub mod config;
pub mod duplicates;
pub mod error;
pub mod health;
pub mod normalizer;
pub mod probes;
pub mod service;
pub mod stores;
pub mod testing;
pub mod traits;
pub mod types;

// Re-export core types at crate root
pub use config::UpkeepConfig;
pub use error::{NormalizeError, ProbeError, RepositoryError, Result, UpkeepError};
pub use service::{UpkeepService, SCAN_LOCK_NAME};
pub use traits::{
    load_corpus, BookmarkRepository, HttpProbe, ProbeResponse, CORPUS_PAGE_SIZE,
};
pub use types::{
    Bookmark, BookmarkFilter, BookmarkId, BookmarkUpdate, DuplicateCheckResult, DuplicateGroup,
    HealthRecord, HealthStats, HealthStatus, MergeReport, MergeRequest, MergeWarning, Pagination,
    SimilarBookmark, StatusCounts, SweepReport,
};

// Re-export components
pub use duplicates::{DuplicateAnalyzer, MergeEngine};
pub use health::{HealthMonitor, HealthStore, LivenessProber};
pub use normalizer::{normalize, NormalizedUrl, UrlMatch, UrlNormalizer};
pub use probes::ReqwestProbe;
pub use stores::MemoryBookmarkRepository;

// Re-export testing utilities
pub use testing::{FailingRepository, MockProbeClient};
