//! Bookmark liveness: single checks, the result cache, and sweeps.

pub mod monitor;
pub mod prober;
pub mod store;

pub use monitor::HealthMonitor;
pub use prober::{classify, LivenessProber};
pub use store::HealthStore;
