//! Reading progress
//!
//! Page changes become progress updates, and progress updates are persisted
//! with stale responses discarded.

mod sync;
mod tracker;

pub use sync::{ProgressSynchronizer, SyncOutcome};
pub use tracker::{page_for_percent, page_percent, PaginationTracker};
