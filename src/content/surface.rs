//! Rendering surface interface
//!
//! The renderer that paginates content is an external collaborator. The
//! anchoring core only needs to resolve a gesture target to a block-level
//! unit and read the text around it.

use serde::{Deserialize, Serialize};

/// Handle to any element the renderer can report as a gesture target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ElementId(pub usize);

/// Ordinal of a block-level unit in document order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BlockIndex(pub usize);

/// Content surface exposed by the renderer
pub trait ContentSurface {
    /// Nearest enclosing block-level unit of a gesture target
    fn resolve_block(&self, target: ElementId) -> Option<BlockIndex>;

    /// Whether `target` is the block element or one of its descendants
    fn contains(&self, block: BlockIndex, target: ElementId) -> bool;

    /// Full text content of a block
    fn block_text(&self, block: BlockIndex) -> Option<&str>;

    /// Number of block-level units in the document
    fn block_count(&self) -> usize;

    /// Up to `max_chars` characters immediately preceding the block
    fn text_before(&self, block: BlockIndex, max_chars: usize) -> String;

    /// Up to `max_chars` characters immediately following the block
    fn text_after(&self, block: BlockIndex, max_chars: usize) -> String;

    /// Character offset of the block start within the whole document, if the
    /// surface knows the full document
    fn block_offset(&self, block: BlockIndex) -> Option<usize>;

    /// Total document length in characters
    fn text_len(&self) -> usize;

    /// Fraction of the document shown up to the current page
    fn page_fraction(&self) -> Option<f64> {
        None
    }
}
