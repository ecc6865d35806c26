//! Content module
//!
//! The reference rendering surface: article HTML is sanitized, parsed into
//! an element tree and split into block-level units that gestures resolve
//! to.

mod document;
mod sanitize;
mod surface;
mod text;

pub use document::{BlockDocument, BlockKind, BlockUnit, PageView};
pub use sanitize::sanitize_html;
pub use surface::{BlockIndex, ContentSurface, ElementId};
pub use text::{first_chars, last_chars, normalize_whitespace};
