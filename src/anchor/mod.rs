//! Highlight anchoring
//!
//! Turns a gesture over rendered content into an anchor that survives
//! reflow: the enclosing block's text as the quote, bounded context on both
//! sides, the block ordinal and a whitespace-insensitive patch token.

mod builder;
mod patch;
mod types;

pub use builder::AnchorBuilder;
pub use patch::AnchorPatch;
pub use types::HighlightAnchor;
