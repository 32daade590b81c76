//! Duplicate detection and consolidation.

pub mod analyzer;
pub mod merge;

pub use analyzer::{title_similarity, DuplicateAnalyzer, PairScore};
pub use merge::MergeEngine;
