//! Highlight types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::{new_highlight_id, new_short_id};
use crate::anchor::HighlightAnchor;

/// Types of highlights
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HighlightType {
    Highlight,
    Note,
    Redaction,
}

/// A label attached to a highlight
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Label {
    pub id: String,
    pub name: String,
    pub color: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

/// A highlight on an article
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Highlight {
    /// Globally unique identifier (UUID)
    pub id: String,
    /// Short sharing token
    pub short_id: String,
    #[serde(rename = "type")]
    pub highlight_type: HighlightType,
    pub color: String,
    pub anchor: HighlightAnchor,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotation: Option<String>,
    /// Ordered, unique by label id
    #[serde(default)]
    pub labels: Vec<Label>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shared_at: Option<DateTime<Utc>>,
    pub created_by_me: bool,
}

/// Payload of a highlight-creation request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateHighlightRequest {
    pub id: String,
    pub short_id: String,
    #[serde(rename = "type")]
    pub highlight_type: HighlightType,
    pub color: String,
    pub anchor: HighlightAnchor,
    pub article_id: String,
}

impl CreateHighlightRequest {
    /// Create a request with freshly generated identifiers
    pub fn new(article_id: &str, anchor: HighlightAnchor, color: &str) -> Self {
        Self {
            id: new_highlight_id(),
            short_id: new_short_id(),
            highlight_type: HighlightType::Highlight,
            color: color.to_string(),
            anchor,
            article_id: article_id.to_string(),
        }
    }

    /// Set the highlight type
    pub fn with_type(mut self, highlight_type: HighlightType) -> Self {
        self.highlight_type = highlight_type;
        self
    }
}

impl Highlight {
    /// Local record for a request that has not been acknowledged yet
    pub fn optimistic(request: &CreateHighlightRequest) -> Self {
        let now = Utc::now();
        Self {
            id: request.id.clone(),
            short_id: request.short_id.clone(),
            highlight_type: request.highlight_type,
            color: request.color.clone(),
            anchor: request.anchor.clone(),
            annotation: None,
            labels: Vec::new(),
            created_at: now,
            updated_at: now,
            shared_at: None,
            created_by_me: true,
        }
    }

    /// Replace the local record with the authoritative one from the remote
    /// store. Records with a different id are ignored.
    pub fn reconcile(&mut self, authoritative: Highlight) -> bool {
        if authoritative.id != self.id {
            return false;
        }
        *self = authoritative;
        true
    }

    /// Attach a label, keeping labels unique by id and in insertion order
    pub fn add_label(&mut self, label: Label) -> bool {
        if self.labels.iter().any(|l| l.id == label.id) {
            return false;
        }
        self.labels.push(label);
        true
    }

    pub fn quote(&self) -> &str {
        &self.anchor.quote
    }
}
