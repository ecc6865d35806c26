//! GraphQL transport for the remote store

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, warn};

use super::RemoteStore;
use crate::anchor::HighlightAnchor;
use crate::article::{Article, ContentFormat, ProgressAck, ProgressUpdate};
use crate::config::{RemoteConfig, DEFAULT_HIGHLIGHT_COLOR};
use crate::error::{ReaderError, Result};
use crate::highlight::{CreateHighlightRequest, Highlight, HighlightType, Label};

const ARTICLE_QUERY: &str = r#"
query Article($username: String!, $slug: String!, $format: String!) {
  article(username: $username, slug: $slug, format: $format) {
    __typename
    ... on ArticleSuccess {
      article {
        id
        title
        content
        url
        siteName
        author
        savedAt
        publishedAt
        readingProgressPercent
        readingProgressAnchorIndex
      }
    }
    ... on ArticleError {
      errorCodes
    }
  }
}
"#;

const SAVE_PROGRESS_MUTATION: &str = r#"
mutation SaveArticleReadingProgress($input: SaveArticleReadingProgressInput!) {
  saveArticleReadingProgress(input: $input) {
    __typename
    ... on SaveArticleReadingProgressSuccess {
      updatedArticle {
        id
        readingProgressPercent
        readingProgressAnchorIndex
      }
    }
    ... on SaveArticleReadingProgressError {
      errorCodes
    }
  }
}
"#;

const CREATE_HIGHLIGHT_MUTATION: &str = r#"
mutation CreateHighlight($input: CreateHighlightInput!) {
  createHighlight(input: $input) {
    __typename
    ... on CreateHighlightSuccess {
      highlight {
        ...HighlightFields
      }
    }
    ... on CreateHighlightError {
      errorCodes
    }
  }
}

fragment HighlightFields on Highlight {
  id
  type
  shortId
  quote
  prefix
  suffix
  patch
  color
  annotation
  createdByMe
  createdAt
  updatedAt
  sharedAt
  highlightPositionPercent
  highlightPositionAnchorIndex
  labels {
    id
    name
    color
    createdAt
  }
}
"#;

#[derive(Debug, Deserialize)]
struct GraphqlResponse<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Vec<GraphqlError>,
}

#[derive(Debug, Deserialize)]
struct GraphqlError {
    message: String,
}

#[derive(Debug, Deserialize)]
struct ArticleData {
    article: ArticleResult,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "__typename")]
enum ArticleResult {
    ArticleSuccess {
        article: Article,
    },
    ArticleError {
        #[serde(rename = "errorCodes", default)]
        error_codes: Vec<String>,
    },
}

#[derive(Debug, Deserialize)]
struct SaveProgressData {
    #[serde(rename = "saveArticleReadingProgress")]
    result: SaveProgressResult,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "__typename")]
enum SaveProgressResult {
    SaveArticleReadingProgressSuccess {
        #[serde(rename = "updatedArticle")]
        updated_article: UpdatedArticle,
    },
    SaveArticleReadingProgressError {
        #[serde(rename = "errorCodes", default)]
        error_codes: Vec<String>,
    },
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdatedArticle {
    reading_progress_percent: f64,
    #[serde(default)]
    reading_progress_anchor_index: u32,
}

#[derive(Debug, Deserialize)]
struct CreateHighlightData {
    #[serde(rename = "createHighlight")]
    result: CreateHighlightResult,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "__typename")]
enum CreateHighlightResult {
    CreateHighlightSuccess {
        highlight: HighlightRecord,
    },
    CreateHighlightError {
        #[serde(rename = "errorCodes", default)]
        error_codes: Vec<String>,
    },
}

/// Highlight as the remote store serializes it: anchor fields are flat
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HighlightRecord {
    id: String,
    short_id: String,
    #[serde(rename = "type")]
    highlight_type: HighlightType,
    #[serde(default)]
    quote: Option<String>,
    #[serde(default)]
    prefix: Option<String>,
    #[serde(default)]
    suffix: Option<String>,
    #[serde(default)]
    patch: Option<String>,
    #[serde(default)]
    color: Option<String>,
    #[serde(default)]
    annotation: Option<String>,
    #[serde(default)]
    created_by_me: bool,
    created_at: DateTime<Utc>,
    #[serde(default)]
    updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    shared_at: Option<DateTime<Utc>>,
    #[serde(default)]
    highlight_position_percent: Option<f64>,
    #[serde(default)]
    highlight_position_anchor_index: Option<u32>,
    #[serde(default)]
    labels: Option<Vec<Label>>,
}

impl From<HighlightRecord> for Highlight {
    fn from(record: HighlightRecord) -> Self {
        Highlight {
            id: record.id,
            short_id: record.short_id,
            highlight_type: record.highlight_type,
            color: record
                .color
                .unwrap_or_else(|| DEFAULT_HIGHLIGHT_COLOR.to_string()),
            anchor: HighlightAnchor {
                quote: record.quote.unwrap_or_default(),
                prefix: record.prefix.unwrap_or_default(),
                suffix: record.suffix.unwrap_or_default(),
                patch: record.patch,
                position_percent: record.highlight_position_percent.unwrap_or_default(),
                position_anchor_index: record.highlight_position_anchor_index.unwrap_or_default(),
            },
            annotation: record.annotation,
            labels: record.labels.unwrap_or_default(),
            created_at: record.created_at,
            updated_at: record.updated_at.unwrap_or(record.created_at),
            shared_at: record.shared_at,
            created_by_me: record.created_by_me,
        }
    }
}

/// Error code the store uses for unknown articles
const NOT_FOUND: &str = "NOT_FOUND";

/// Remote store reached over GraphQL
pub struct GraphqlRemote {
    client: reqwest::Client,
    endpoint: String,
    api_token: Option<String>,
}

impl GraphqlRemote {
    pub fn new(config: &RemoteConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            api_token: config.api_token.clone(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn execute<T>(&self, operation: &str, query: &str, variables: Value) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let body = json!({
            "operationName": operation,
            "query": query,
            "variables": variables,
        });

        let mut request = self.client.post(&self.endpoint).json(&body);
        if let Some(token) = &self.api_token {
            request = request.header(reqwest::header::AUTHORIZATION, token);
        }

        debug!(operation, endpoint = %self.endpoint, "Sending GraphQL request");
        let response = request.send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ReaderError::TransportFailure(format!(
                "{} returned {}: {}",
                operation, status, body
            )));
        }

        let envelope: GraphqlResponse<T> = response.json().await?;
        if !envelope.errors.is_empty() {
            let messages: Vec<String> = envelope.errors.into_iter().map(|e| e.message).collect();
            warn!(operation, errors = ?messages, "GraphQL errors");
            return Err(ReaderError::RemoteValidation(messages));
        }

        envelope
            .data
            .ok_or_else(|| ReaderError::TransportFailure(format!("{} returned no data", operation)))
    }
}

#[async_trait]
impl RemoteStore for GraphqlRemote {
    async fn fetch_article(
        &self,
        username: &str,
        slug: &str,
        format: ContentFormat,
    ) -> Result<Article> {
        let data: ArticleData = self
            .execute(
                "Article",
                ARTICLE_QUERY,
                json!({
                    "username": username,
                    "slug": slug,
                    "format": format.as_str(),
                }),
            )
            .await?;

        match data.article {
            ArticleResult::ArticleSuccess { article } => Ok(article),
            ArticleResult::ArticleError { error_codes } => {
                if error_codes.iter().any(|code| code == NOT_FOUND) {
                    Err(ReaderError::NotFound(format!("{}/{}", username, slug)))
                } else {
                    Err(ReaderError::RemoteValidation(error_codes))
                }
            }
        }
    }

    async fn save_reading_progress(&self, update: &ProgressUpdate) -> Result<ProgressAck> {
        let mut input = json!({
            "id": update.article_id,
            "readingProgressPercent": update.percent,
        });
        if let Some(anchor_index) = update.anchor_index {
            input["readingProgressAnchorIndex"] = json!(anchor_index);
        }

        let data: SaveProgressData = self
            .execute(
                "SaveArticleReadingProgress",
                SAVE_PROGRESS_MUTATION,
                json!({ "input": input }),
            )
            .await?;

        match data.result {
            SaveProgressResult::SaveArticleReadingProgressSuccess { updated_article } => {
                Ok(ProgressAck {
                    updated_percent: updated_article.reading_progress_percent,
                    updated_anchor_index: updated_article.reading_progress_anchor_index,
                })
            }
            SaveProgressResult::SaveArticleReadingProgressError { error_codes } => {
                Err(ReaderError::RemoteValidation(error_codes))
            }
        }
    }

    async fn create_highlight(&self, request: &CreateHighlightRequest) -> Result<Highlight> {
        let anchor = &request.anchor;
        let input = json!({
            "id": request.id,
            "shortId": request.short_id,
            "type": request.highlight_type,
            "color": request.color,
            "articleId": request.article_id,
            "quote": anchor.quote,
            "prefix": anchor.prefix,
            "suffix": anchor.suffix,
            "patch": anchor.patch,
            "highlightPositionPercent": anchor.position_percent,
            "highlightPositionAnchorIndex": anchor.position_anchor_index,
        });

        let data: CreateHighlightData = self
            .execute(
                "CreateHighlight",
                CREATE_HIGHLIGHT_MUTATION,
                json!({ "input": input }),
            )
            .await?;

        match data.result {
            CreateHighlightResult::CreateHighlightSuccess { highlight } => Ok(highlight.into()),
            CreateHighlightResult::CreateHighlightError { error_codes } => {
                Err(ReaderError::RemoteValidation(error_codes))
            }
        }
    }
}
