//! Readmark
//!
//! Reading-position tracking and reflow-resistant highlight anchoring for
//! paginated long-form content.

pub mod anchor;
pub mod article;
pub mod config;
pub mod content;
pub mod error;
pub mod highlight;
pub mod progress;
pub mod remote;
pub mod session;

pub use anchor::{AnchorBuilder, AnchorPatch, HighlightAnchor};
pub use article::{Article, ContentFormat, ProgressAck, ProgressUpdate, ReadingProgress};
pub use config::{AnchorConfig, DisplaySettings, ReaderConfig, RemoteConfig};
pub use content::{BlockDocument, BlockIndex, ContentSurface, ElementId};
pub use error::{ReaderError, Result};
pub use highlight::{
    ConfirmOutcome, CreateHighlightRequest, Highlight, HighlightInteractionController,
    HighlightType, MarkerSet, MarkerSurface,
};
pub use progress::{PaginationTracker, ProgressSynchronizer, SyncOutcome};
pub use remote::{CachedRemote, GraphqlRemote, InMemoryRemote, RemoteStore};
pub use session::ReadingSession;
