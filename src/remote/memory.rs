//! In-memory remote store
//!
//! Holds articles, progress and highlights in process. Backs the unit
//! tests and embedders that run without a network.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use tracing::debug;

use super::RemoteStore;
use crate::article::{Article, ContentFormat, ProgressAck, ProgressUpdate};
use crate::error::{ReaderError, Result};
use crate::highlight::{CreateHighlightRequest, Highlight};

/// Error code for payloads the store refuses
pub const BAD_DATA: &str = "BAD_DATA";
/// Error code for unknown articles
pub const NOT_FOUND: &str = "NOT_FOUND";

#[derive(Default)]
pub struct InMemoryRemote {
    /// (username, slug) -> article
    articles: Mutex<HashMap<(String, String), Article>>,
    /// highlight id -> highlight
    highlights: Mutex<HashMap<String, Highlight>>,
    offline: AtomicBool,
    fetch_calls: AtomicUsize,
    save_calls: AtomicUsize,
    create_calls: AtomicUsize,
}

impl InMemoryRemote {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_article(&self, username: &str, slug: &str, article: Article) {
        self.articles
            .lock()
            .insert((username.to_string(), slug.to_string()), article);
    }

    /// While offline every request fails with a transport failure
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn fetch_calls(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    pub fn save_calls(&self) -> usize {
        self.save_calls.load(Ordering::SeqCst)
    }

    pub fn create_calls(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    pub fn highlight_count(&self) -> usize {
        self.highlights.lock().len()
    }

    pub fn highlight(&self, id: &str) -> Option<Highlight> {
        self.highlights.lock().get(id).cloned()
    }

    /// Stored progress of an article, by article id
    pub fn progress(&self, article_id: &str) -> Option<ProgressAck> {
        self.articles
            .lock()
            .values()
            .find(|a| a.id == article_id)
            .map(|a| ProgressAck {
                updated_percent: a.reading_progress_percent,
                updated_anchor_index: a.reading_progress_anchor_index,
            })
    }

    fn ensure_online(&self) -> Result<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(ReaderError::TransportFailure(
                "remote store unreachable".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl RemoteStore for InMemoryRemote {
    async fn fetch_article(
        &self,
        username: &str,
        slug: &str,
        format: ContentFormat,
    ) -> Result<Article> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        self.ensure_online()?;

        debug!(username, slug, format = format.as_str(), "Fetching article from memory");

        self.articles
            .lock()
            .get(&(username.to_string(), slug.to_string()))
            .cloned()
            .ok_or_else(|| ReaderError::NotFound(format!("{}/{}", username, slug)))
    }

    async fn save_reading_progress(&self, update: &ProgressUpdate) -> Result<ProgressAck> {
        self.save_calls.fetch_add(1, Ordering::SeqCst);
        self.ensure_online()?;

        if !(update.percent > 0.0 && update.percent <= 1.0) {
            return Err(ReaderError::RemoteValidation(vec![BAD_DATA.to_string()]));
        }

        let mut articles = self.articles.lock();
        let article = articles
            .values_mut()
            .find(|a| a.id == update.article_id)
            .ok_or_else(|| ReaderError::RemoteValidation(vec![NOT_FOUND.to_string()]))?;

        article.reading_progress_percent = update.percent;
        if let Some(anchor_index) = update.anchor_index {
            article.reading_progress_anchor_index = anchor_index;
        }

        Ok(ProgressAck {
            updated_percent: article.reading_progress_percent,
            updated_anchor_index: article.reading_progress_anchor_index,
        })
    }

    async fn create_highlight(&self, request: &CreateHighlightRequest) -> Result<Highlight> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        self.ensure_online()?;

        if request.anchor.quote.trim().is_empty() {
            return Err(ReaderError::RemoteValidation(vec![BAD_DATA.to_string()]));
        }

        let mut highlights = self.highlights.lock();
        if let Some(existing) = highlights.get(&request.id) {
            return Ok(existing.clone());
        }

        let mut highlight = Highlight::optimistic(request);
        let now = Utc::now();
        highlight.created_at = now;
        highlight.updated_at = now;
        highlights.insert(request.id.clone(), highlight.clone());

        Ok(highlight)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::anchor::HighlightAnchor;

    fn article() -> Article {
        Article {
            id: "article-1".to_string(),
            title: "Foxes".to_string(),
            content: "<p>The quick brown fox</p>".to_string(),
            url: None,
            author: None,
            site_name: None,
            saved_at: Utc::now(),
            published_at: None,
            reading_progress_percent: 0.0,
            reading_progress_anchor_index: 0,
        }
    }

    fn request() -> CreateHighlightRequest {
        let anchor = HighlightAnchor {
            quote: "The quick brown fox".to_string(),
            prefix: String::new(),
            suffix: String::new(),
            patch: None,
            position_percent: 0.0,
            position_anchor_index: 0,
        };
        CreateHighlightRequest::new("article-1", anchor, "yellow")
    }

    #[tokio::test]
    async fn test_fetch_not_found() {
        let remote = InMemoryRemote::new();
        let err = remote
            .fetch_article("ada", "missing", ContentFormat::Html)
            .await
            .unwrap_err();
        assert!(matches!(err, ReaderError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_save_progress_validates_percent() {
        let remote = InMemoryRemote::new();
        remote.insert_article("ada", "foxes", article());

        let err = remote
            .save_reading_progress(&ProgressUpdate::new("article-1", 1.5))
            .await
            .unwrap_err();
        assert_eq!(err.error_codes(), [BAD_DATA.to_string()]);

        let ack = remote
            .save_reading_progress(&ProgressUpdate::new("article-1", 0.5).with_anchor_index(3))
            .await
            .unwrap();
        assert_eq!(ack.updated_percent, 0.5);
        assert_eq!(ack.updated_anchor_index, 3);
        assert_eq!(remote.progress("article-1"), Some(ack));
    }

    #[tokio::test]
    async fn test_create_highlight_idempotent_on_id() {
        let remote = InMemoryRemote::new();
        let request = request();

        let first = remote.create_highlight(&request).await.unwrap();
        let second = remote.create_highlight(&request).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(remote.highlight_count(), 1);
        assert_eq!(remote.create_calls(), 2);
    }

    #[tokio::test]
    async fn test_offline() {
        let remote = InMemoryRemote::new();
        remote.set_offline(true);

        let err = remote.create_highlight(&request()).await.unwrap_err();
        assert!(matches!(err, ReaderError::TransportFailure(_)));
        assert_eq!(remote.highlight_count(), 0);
    }
}
