//! Page-relative reading position

use tracing::{debug, Span};

use crate::article::ProgressUpdate;
use crate::error::{ReaderError, Result};

/// Converts page changes into progress updates for one article
#[derive(Debug, Clone)]
pub struct PaginationTracker {
    article_id: String,
    last_emitted: Option<f64>,
    span: Span,
}

impl PaginationTracker {
    pub fn new(article_id: &str, span: Span) -> Self {
        Self {
            article_id: article_id.to_string(),
            last_emitted: None,
            span,
        }
    }

    /// Treat a stored percent as already emitted, so reopening an article on
    /// its saved page does not write the same value again
    pub fn resume_from(mut self, percent: f64) -> Self {
        if percent > 0.0 && percent <= 1.0 {
            self.last_emitted = Some(percent);
        }
        self
    }

    pub fn article_id(&self) -> &str {
        &self.article_id
    }

    pub fn last_emitted(&self) -> Option<f64> {
        self.last_emitted
    }

    /// Handle a page change. Returns `None` when the percent equals the last
    /// emitted one.
    pub fn on_page_change(
        &mut self,
        page_index: usize,
        total_pages: usize,
    ) -> Result<Option<ProgressUpdate>> {
        let percent = page_percent(page_index, total_pages)?;

        if self.last_emitted == Some(percent) {
            debug!(parent: &self.span, page_index, total_pages, "Progress unchanged");
            return Ok(None);
        }

        self.last_emitted = Some(percent);
        debug!(parent: &self.span, page_index, total_pages, percent, "Progress changed");

        Ok(Some(ProgressUpdate::new(&self.article_id, percent)))
    }
}

/// `(page_index + 1) / total_pages`, always in (0, 1]
pub fn page_percent(page_index: usize, total_pages: usize) -> Result<f64> {
    if total_pages == 0 || page_index >= total_pages {
        return Err(ReaderError::InvalidPagination {
            page_index,
            total_pages,
        });
    }
    Ok((page_index + 1) as f64 / total_pages as f64)
}

/// Page to open for a stored percent, the inverse of [`page_percent`]
pub fn page_for_percent(percent: f64, total_pages: usize) -> usize {
    if total_pages == 0 || !(percent > 0.0) {
        return 0;
    }
    // Absorb rounding in `(page + 1) / total * total`
    let page = (percent.min(1.0) * total_pages as f64 - 1e-9).ceil() as usize;
    page.saturating_sub(1).min(total_pages - 1)
}
