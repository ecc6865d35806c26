//! Anchor types

use serde::{Deserialize, Serialize};

/// Portable description of a highlighted passage.
///
/// Raw character offsets shift whenever content reflows, so the anchor
/// keeps the block ordinal as its primary locator and the quote with its
/// surrounding context as the fallback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HighlightAnchor {
    /// Full text of the highlighted block, never empty
    pub quote: String,
    /// Text immediately before the quote (bounded, may be empty)
    pub prefix: String,
    /// Text immediately after the quote (bounded, may be empty)
    pub suffix: String,
    /// Reflow-tolerant fingerprint of the quote
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patch: Option<String>,
    /// Position of the block within the whole document (0.0-1.0)
    pub position_percent: f64,
    /// Ordinal of the block among all block-level units
    pub position_anchor_index: u32,
}
