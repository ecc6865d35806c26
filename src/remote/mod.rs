//! Remote store
//!
//! Request/response contracts for the service that owns articles, reading
//! progress and highlights, plus the GraphQL transport, an article cache and
//! an in-memory store.

mod cache;
mod graphql;
mod memory;

pub use cache::CachedRemote;
pub use graphql::GraphqlRemote;
pub use memory::InMemoryRemote;

use std::sync::Arc;

use async_trait::async_trait;

use crate::article::{Article, ContentFormat, ProgressAck, ProgressUpdate};
use crate::error::Result;
use crate::highlight::{CreateHighlightRequest, Highlight};

/// Remote operations consumed by a reading session
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Fetch an article by owner and slug. Fails with `NotFound`.
    async fn fetch_article(
        &self,
        username: &str,
        slug: &str,
        format: ContentFormat,
    ) -> Result<Article>;

    /// Persist a reading position. Idempotent for an identical percent.
    async fn save_reading_progress(&self, update: &ProgressUpdate) -> Result<ProgressAck>;

    /// Create a highlight. Idempotent on the request id.
    async fn create_highlight(&self, request: &CreateHighlightRequest) -> Result<Highlight>;
}

#[async_trait]
impl<R> RemoteStore for Arc<R>
where
    R: RemoteStore + ?Sized,
{
    async fn fetch_article(
        &self,
        username: &str,
        slug: &str,
        format: ContentFormat,
    ) -> Result<Article> {
        (**self).fetch_article(username, slug, format).await
    }

    async fn save_reading_progress(&self, update: &ProgressUpdate) -> Result<ProgressAck> {
        (**self).save_reading_progress(update).await
    }

    async fn create_highlight(&self, request: &CreateHighlightRequest) -> Result<Highlight> {
        (**self).create_highlight(request).await
    }
}
