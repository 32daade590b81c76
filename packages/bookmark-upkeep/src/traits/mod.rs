//! Seams the host application implements: bookmark storage and the HTTP
//! transport used for probing.

pub mod probe;
pub mod repository;

pub use probe::{continue_redirects, follow_redirects, HttpProbe, ProbeResponse, RedirectChain};
pub use repository::{load_corpus, BookmarkRepository, CORPUS_PAGE_SIZE};
