//! Error types for readmark
//!
//! Nothing in here is fatal to a reading session: every variant degrades to
//! "change not persisted" and the reader keeps paging.

use thiserror::Error;

/// Crate-wide result type
pub type Result<T> = std::result::Result<T, ReaderError>;

/// Reader error type
#[derive(Error, Debug)]
pub enum ReaderError {
    /// No resolvable text under the gesture
    #[error("Empty selection: no block-level text under gesture")]
    EmptySelection,

    /// Network or remote failure while executing a request
    #[error("Transport failure: {0}")]
    TransportFailure(String),

    /// The remote store rejected the payload
    #[error("Remote validation error: {}", .0.join(", "))]
    RemoteValidation(Vec<String>),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid pagination: page {page_index} of {total_pages}")]
    InvalidPagination {
        page_index: usize,
        total_pages: usize,
    },

    #[error("Invalid reading progress: {0} is outside (0, 1]")]
    InvalidProgress(f64),

    /// The HTTP request to the remote store failed or its body was unreadable
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Content error: {0}")]
    Content(String),

    #[error("Markup error: {0}")]
    Markup(#[from] quick_xml::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl ReaderError {
    /// Error codes reported by the remote store, if any
    pub fn error_codes(&self) -> &[String] {
        match self {
            ReaderError::RemoteValidation(codes) => codes,
            _ => &[],
        }
    }

    /// Whether the failure happened before anything was sent
    pub fn is_local(&self) -> bool {
        matches!(
            self,
            ReaderError::EmptySelection
                | ReaderError::InvalidPagination { .. }
                | ReaderError::InvalidProgress(_)
                | ReaderError::Content(_)
                | ReaderError::Markup(_)
                | ReaderError::Config(_)
        )
    }

    /// Whether the request may never have reached the remote store
    pub fn is_transport(&self) -> bool {
        matches!(self, ReaderError::TransportFailure(_) | ReaderError::Http(_))
    }
}
