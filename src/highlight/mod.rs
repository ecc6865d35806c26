//! Highlights
//!
//! Highlight records, client-side identifiers, visual markers and the
//! arm / confirm controller that creates them.

mod controller;
mod ids;
mod marker;
mod types;

pub use controller::{
    ArmToken, ConfirmOutcome, HighlightInteractionController, InteractionState, PendingHighlight,
    SubmittedHighlight,
};
pub use ids::{is_short_id, new_highlight_id, new_short_id, SHORT_ID_ALPHABET, SHORT_ID_LEN};
pub use marker::{MarkerSet, MarkerState, MarkerSurface};
pub use types::{CreateHighlightRequest, Highlight, HighlightType, Label};
