//! Cache-first article store
//!
//! Article fetches are served from an LRU cache when possible. The cached
//! projection is read-only except for the reading progress fields, which
//! follow successful progress saves.

use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use lru::LruCache;
use parking_lot::Mutex;
use tracing::debug;

use super::RemoteStore;
use crate::article::{Article, ContentFormat, ProgressAck, ProgressUpdate};
use crate::error::Result;
use crate::highlight::{CreateHighlightRequest, Highlight};

/// Cache key for fetched articles
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub struct ArticleCacheKey {
    pub username: String,
    pub slug: String,
    pub format: ContentFormat,
}

impl ArticleCacheKey {
    pub fn new(username: &str, slug: &str, format: ContentFormat) -> Self {
        Self {
            username: username.to_string(),
            slug: slug.to_string(),
            format,
        }
    }
}

/// Wraps a remote store with an article cache
pub struct CachedRemote<R> {
    inner: R,
    articles: Mutex<LruCache<ArticleCacheKey, Article>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl<R: RemoteStore> CachedRemote<R> {
    pub fn new(inner: R, capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner,
            articles: Mutex::new(LruCache::new(capacity)),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn inner(&self) -> &R {
        &self.inner
    }

    /// Cached article, without touching the remote store
    pub fn cached(&self, username: &str, slug: &str, format: ContentFormat) -> Option<Article> {
        self.articles
            .lock()
            .get(&ArticleCacheKey::new(username, slug, format))
            .cloned()
    }

    /// Fetch from the remote store and replace the cached copy. A failed
    /// refresh leaves the cached copy in place.
    pub async fn refresh_article(
        &self,
        username: &str,
        slug: &str,
        format: ContentFormat,
    ) -> Result<Article> {
        let article = self.inner.fetch_article(username, slug, format).await?;
        self.articles
            .lock()
            .put(ArticleCacheKey::new(username, slug, format), article.clone());
        Ok(article)
    }

    /// Drop every cached copy of an article
    pub fn invalidate(&self, article_id: &str) -> usize {
        let mut articles = self.articles.lock();
        let stale: Vec<ArticleCacheKey> = articles
            .iter()
            .filter(|(_, article)| article.id == article_id)
            .map(|(key, _)| key.clone())
            .collect();
        for key in &stale {
            articles.pop(key);
        }
        stale.len()
    }

    pub fn len(&self) -> usize {
        self.articles.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// (hits, misses)
    pub fn stats(&self) -> (u64, u64) {
        (
            self.hits.load(Ordering::Relaxed),
            self.misses.load(Ordering::Relaxed),
        )
    }
}

#[async_trait]
impl<R: RemoteStore> RemoteStore for CachedRemote<R> {
    async fn fetch_article(
        &self,
        username: &str,
        slug: &str,
        format: ContentFormat,
    ) -> Result<Article> {
        if let Some(article) = self.cached(username, slug, format) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            debug!(username, slug, "Article cache hit");
            return Ok(article);
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        debug!(username, slug, "Article cache miss");
        self.refresh_article(username, slug, format).await
    }

    async fn save_reading_progress(&self, update: &ProgressUpdate) -> Result<ProgressAck> {
        let ack = self.inner.save_reading_progress(update).await?;

        let mut articles = self.articles.lock();
        for (_, article) in articles.iter_mut() {
            if article.id == update.article_id {
                article.apply_progress(&ack);
            }
        }

        Ok(ack)
    }

    async fn create_highlight(&self, request: &CreateHighlightRequest) -> Result<Highlight> {
        self.inner.create_highlight(request).await
    }
}
