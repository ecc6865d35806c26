//! Reading session
//!
//! One opened article: parsed content, page tracking, progress persistence
//! and the highlight gestures, wired to a shared remote store.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, info_span, warn, Span};

use crate::anchor::HighlightAnchor;
use crate::article::{Article, ContentFormat, ProgressUpdate, ReadingProgress};
use crate::config::{DisplaySettings, ReaderConfig};
use crate::content::{BlockDocument, BlockIndex, ContentSurface, ElementId};
use crate::error::Result;
use crate::highlight::{ArmToken, Highlight, HighlightInteractionController, MarkerSet};
use crate::progress::{page_for_percent, PaginationTracker, ProgressSynchronizer, SyncOutcome};
use crate::remote::RemoteStore;

pub struct ReadingSession<R> {
    article: Article,
    document: BlockDocument,
    display: DisplaySettings,
    tracker: PaginationTracker,
    sync: ProgressSynchronizer<Arc<R>>,
    interaction: HighlightInteractionController<MarkerSet>,
    highlights: Vec<Highlight>,
    remote: Arc<R>,
    span: Span,
}

impl<R: RemoteStore> ReadingSession<R> {
    /// Fetch an article as HTML and prepare it for reading
    pub async fn open(
        remote: Arc<R>,
        config: &ReaderConfig,
        username: &str,
        slug: &str,
    ) -> Result<Self> {
        let span = info_span!("reading_session", %username, %slug);

        let article = remote
            .fetch_article(username, slug, ContentFormat::Html)
            .await?;
        let document = BlockDocument::parse(&article.content)?;

        info!(
            parent: &span,
            article_id = %article.id,
            blocks = document.block_count(),
            progress = article.reading_progress_percent,
            "Opened article"
        );

        let tracker = PaginationTracker::new(&article.id, span.clone())
            .resume_from(article.reading_progress_percent);
        let sync = ProgressSynchronizer::new(Arc::clone(&remote), span.clone());
        let interaction = HighlightInteractionController::new(
            &article.id,
            &config.anchor,
            MarkerSet::new(),
            span.clone(),
        );

        Ok(Self {
            article,
            document,
            display: config.display.clone(),
            tracker,
            sync,
            interaction,
            highlights: Vec::new(),
            remote,
            span,
        })
    }

    pub fn article(&self) -> &Article {
        &self.article
    }

    pub fn document(&self) -> &BlockDocument {
        &self.document
    }

    /// Display options handed through to the renderer
    pub fn display(&self) -> &DisplaySettings {
        &self.display
    }

    pub fn interaction(&self) -> &HighlightInteractionController<MarkerSet> {
        &self.interaction
    }

    /// Highlights created during this session
    pub fn highlights(&self) -> &[Highlight] {
        &self.highlights
    }

    /// "3 days ago • author • site"
    pub fn byline(&self) -> String {
        self.article.byline(Utc::now())
    }

    /// Page to open first, from the stored reading progress
    pub fn initial_page(&self, total_pages: usize) -> usize {
        page_for_percent(self.article.reading_progress_percent, total_pages)
    }

    /// Latest accepted progress, or what the article was opened with.
    /// `None` for an article that has never been read.
    pub fn reading_progress(&self) -> Option<ReadingProgress> {
        if let Some(progress) = self.sync.current() {
            return Some(progress);
        }
        let percent = self.article.reading_progress_percent;
        (percent > 0.0 && percent <= 1.0).then(|| ReadingProgress {
            article_id: self.article.id.clone(),
            percent,
            anchor_index: self.article.reading_progress_anchor_index,
        })
    }

    /// Record a page change. The update carries the ordinal of the block at
    /// the top of the page.
    pub fn page_changed(
        &mut self,
        page_index: usize,
        total_pages: usize,
    ) -> Result<Option<ProgressUpdate>> {
        let Some(update) = self.tracker.on_page_change(page_index, total_pages)? else {
            return Ok(None);
        };

        let page_start = page_index as f64 / total_pages as f64;
        Ok(Some(match block_at_fraction(&self.document, page_start) {
            Some(block) => update.with_anchor_index(block.0 as u32),
            None => update,
        }))
    }

    /// Persist a progress update. Failures are absorbed: the next page
    /// change submits a fresher value.
    pub async fn save_progress(&self, update: ProgressUpdate) -> Option<ReadingProgress> {
        match self.sync.submit_update(update).await {
            Ok(SyncOutcome::Accepted(progress)) => Some(progress),
            Ok(SyncOutcome::Stale { .. }) => None,
            Err(err) => {
                warn!(parent: &self.span, error = %err, "Reading progress not saved");
                None
            }
        }
    }

    /// Page change followed by its save
    pub async fn navigate(
        &mut self,
        page_index: usize,
        total_pages: usize,
    ) -> Result<Option<ReadingProgress>> {
        let Some(update) = self.page_changed(page_index, total_pages)? else {
            return Ok(None);
        };
        let accepted = self.save_progress(update).await;
        if let Some(progress) = &accepted {
            self.article.reading_progress_percent = progress.percent;
            self.article.reading_progress_anchor_index = progress.anchor_index;
        }
        Ok(accepted)
    }

    /// Mark gesture over `target`
    pub fn mark(&mut self, target: ElementId) -> Result<ArmToken> {
        self.interaction.arm(&self.document, target)
    }

    /// Confirm gesture over `target`. Returns the created highlight when the
    /// confirmation committed.
    pub async fn confirm(&mut self, target: ElementId) -> Result<Option<Highlight>> {
        let created = self
            .interaction
            .confirm_and_submit(&self.document, target, self.remote.as_ref())
            .await?;
        if let Some(highlight) = &created {
            self.highlights.push(highlight.clone());
        }
        Ok(created)
    }

    /// Block a stored anchor points at in this rendering
    pub fn relocate(&self, anchor: &HighlightAnchor) -> Option<BlockIndex> {
        self.document.locate(anchor)
    }
}

/// Last block starting at or before `fraction` of the document text
fn block_at_fraction<S>(surface: &S, fraction: f64) -> Option<BlockIndex>
where
    S: ContentSurface + ?Sized,
{
    let offset = (fraction.clamp(0.0, 1.0) * surface.text_len() as f64) as usize;
    (0..surface.block_count())
        .map(BlockIndex)
        .take_while(|block| surface.block_offset(*block).map_or(false, |o| o <= offset))
        .last()
}
