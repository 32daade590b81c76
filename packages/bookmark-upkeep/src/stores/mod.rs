//! Repository implementations.
//!
//! Production deployments implement [`BookmarkRepository`](crate::BookmarkRepository)
//! over their own database; the memory store covers tests and the CLI.

pub mod memory;

pub use memory::MemoryBookmarkRepository;
