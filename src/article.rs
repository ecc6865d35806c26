//! Article and reading progress types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Cached projection of an article owned by the remote store
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    pub id: String,
    pub title: String,
    /// Full content in the requested format
    pub content: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub site_name: Option<String>,
    pub saved_at: DateTime<Utc>,
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
    /// Fraction of the article read, locally mutated after progress saves
    #[serde(default)]
    pub reading_progress_percent: f64,
    #[serde(default)]
    pub reading_progress_anchor_index: u32,
}

/// Content formats the remote store can serve
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ContentFormat {
    Html,
    Markdown,
    Distiller,
    HighlightedMarkdown,
}

impl ContentFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentFormat::Html => "html",
            ContentFormat::Markdown => "markdown",
            ContentFormat::Distiller => "distiller",
            ContentFormat::HighlightedMarkdown => "highlightedMarkdown",
        }
    }
}

/// Accepted reading position for an article
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadingProgress {
    pub article_id: String,
    pub percent: f64,
    pub anchor_index: u32,
}

/// Progress change to persist
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressUpdate {
    pub article_id: String,
    pub percent: f64,
    /// Ordinal of the block at the top of the current page, when the
    /// renderer knows it
    #[serde(skip_serializing_if = "Option::is_none")]
    pub anchor_index: Option<u32>,
}

/// Values the remote store reports after a progress save
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressAck {
    pub updated_percent: f64,
    pub updated_anchor_index: u32,
}

impl ProgressUpdate {
    pub fn new(article_id: &str, percent: f64) -> Self {
        Self {
            article_id: article_id.to_string(),
            percent,
            anchor_index: None,
        }
    }

    pub fn with_anchor_index(mut self, anchor_index: u32) -> Self {
        self.anchor_index = Some(anchor_index);
        self
    }
}

impl Article {
    /// Header line shown above the content: "3 days ago • author • site"
    pub fn byline(&self, now: DateTime<Utc>) -> String {
        let mut parts = vec![format!("{} ago", humanize_duration(now - self.saved_at))];
        if let Some(author) = self.author.as_deref().filter(|a| !a.trim().is_empty()) {
            parts.push(author.to_string());
        }
        if let Some(site) = self.site_name.as_deref().filter(|s| !s.trim().is_empty()) {
            parts.push(site.to_string());
        }
        parts.join(" • ")
    }

    /// Apply a progress acknowledgement to the cached projection
    pub fn apply_progress(&mut self, ack: &ProgressAck) {
        self.reading_progress_percent = ack.updated_percent;
        self.reading_progress_anchor_index = ack.updated_anchor_index;
    }
}

fn humanize_duration(elapsed: chrono::Duration) -> String {
    let minutes = elapsed.num_minutes().max(0);
    let hours = elapsed.num_hours();
    let days = elapsed.num_days();

    if minutes < 1 {
        "less than a minute".to_string()
    } else if minutes < 45 {
        plural(minutes, "minute")
    } else if hours < 24 {
        format!("about {}", plural(hours.max(1), "hour"))
    } else if days < 30 {
        plural(days, "day")
    } else if days < 365 {
        plural(days / 30, "month")
    } else {
        format!("about {}", plural(days / 365, "year"))
    }
}

fn plural(n: i64, unit: &str) -> String {
    if n == 1 {
        format!("1 {}", unit)
    } else {
        format!("{} {}s", n, unit)
    }
}
