//! Anchor construction from a gesture target

use tracing::{debug, Span};

use super::patch::AnchorPatch;
use super::types::HighlightAnchor;
use crate::config::{AnchorConfig, DEFAULT_CONTEXT_CHARS};
use crate::content::{BlockIndex, ContentSurface, ElementId};
use crate::error::{ReaderError, Result};

/// Builds [`HighlightAnchor`]s from gesture targets on a content surface
#[derive(Debug, Clone)]
pub struct AnchorBuilder {
    context_chars: usize,
    span: Span,
}

impl Default for AnchorBuilder {
    fn default() -> Self {
        Self {
            context_chars: DEFAULT_CONTEXT_CHARS,
            span: Span::none(),
        }
    }
}

impl AnchorBuilder {
    pub fn new(config: &AnchorConfig, span: Span) -> Self {
        Self {
            context_chars: config.context_chars,
            span,
        }
    }

    /// Set the maximum prefix/suffix length in characters
    pub fn with_context_chars(mut self, context_chars: usize) -> Self {
        self.context_chars = context_chars;
        self
    }

    pub fn context_chars(&self) -> usize {
        self.context_chars
    }

    /// Build an anchor for the block enclosing `target`.
    ///
    /// Fails with `EmptySelection` when the target is outside any block or
    /// the block holds only whitespace.
    pub fn build<S>(&self, surface: &S, target: ElementId) -> Result<HighlightAnchor>
    where
        S: ContentSurface + ?Sized,
    {
        let block = surface
            .resolve_block(target)
            .ok_or(ReaderError::EmptySelection)?;
        self.build_for_block(surface, block)
    }

    /// Build an anchor for an already-resolved block
    pub fn build_for_block<S>(&self, surface: &S, block: BlockIndex) -> Result<HighlightAnchor>
    where
        S: ContentSurface + ?Sized,
    {
        let quote = surface
            .block_text(block)
            .filter(|text| !text.trim().is_empty())
            .ok_or(ReaderError::EmptySelection)?
            .to_string();

        let needle = quote.trim();
        let prefix = after_last(&surface.text_before(block, self.context_chars), needle);
        let suffix = before_first(&surface.text_after(block, self.context_chars), needle);

        let position_anchor_index = block.0 as u32;
        let position_percent = position_percent(surface, block);
        let patch = AnchorPatch::new(position_anchor_index, &quote).to_string();

        debug!(
            parent: &self.span,
            block = block.0,
            quote_chars = quote.chars().count(),
            prefix_chars = prefix.chars().count(),
            suffix_chars = suffix.chars().count(),
            position_percent,
            "Built highlight anchor"
        );

        Ok(HighlightAnchor {
            quote,
            prefix,
            suffix,
            patch: Some(patch),
            position_percent,
            position_anchor_index,
        })
    }
}

/// Block start within the document, falling back to the current page
/// fraction and then to the block ordinal
fn position_percent<S>(surface: &S, block: BlockIndex) -> f64
where
    S: ContentSurface + ?Sized,
{
    let total = surface.text_len();
    if let Some(offset) = surface.block_offset(block).filter(|_| total > 0) {
        return (offset as f64 / total as f64).clamp(0.0, 1.0);
    }
    if let Some(fraction) = surface.page_fraction() {
        return fraction.clamp(0.0, 1.0);
    }
    let count = surface.block_count().max(1);
    (block.0 as f64 / count as f64).clamp(0.0, 1.0)
}

/// Context before the quote never repeats the quote itself
fn after_last(context: &str, needle: &str) -> String {
    match context.rfind(needle) {
        Some(pos) if !needle.is_empty() => context[pos + needle.len()..].to_string(),
        _ => context.to_string(),
    }
}

/// Context after the quote never repeats the quote itself
fn before_first(context: &str, needle: &str) -> String {
    match context.find(needle) {
        Some(pos) if !needle.is_empty() => context[..pos].to_string(),
        _ => context.to_string(),
    }
}
