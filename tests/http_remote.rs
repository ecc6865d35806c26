//! GraphQL transport against a local HTTP server

use std::sync::Arc;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::{Json, Router};
use parking_lot::Mutex;
use serde_json::{json, Value};

use readmark::{
    CachedRemote, ContentFormat, GraphqlRemote, ProgressUpdate, ReaderConfig, ReaderError,
    ReadingSession, RemoteStore,
};

const CONTENT: &str = "<h1>Foxes</h1><p>Intro text.</p><p>The <b>quick</b> brown fox</p><p>Outro.</p>";

#[derive(Clone, Default)]
struct Recorded {
    /// (Authorization header, request body)
    requests: Arc<Mutex<Vec<(Option<String>, Value)>>>,
}

impl Recorded {
    fn operations(&self) -> Vec<String> {
        self.requests
            .lock()
            .iter()
            .map(|(_, body)| body["operationName"].as_str().unwrap_or_default().to_string())
            .collect()
    }
}

async fn graphql(
    State(state): State<Recorded>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Json<Value> {
    let auth = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    state.requests.lock().push((auth, body.clone()));

    let operation = body["operationName"].as_str().unwrap_or_default();
    let vars = &body["variables"];

    let response = match operation {
        "Article" if vars["slug"] == "foxes" => json!({
            "data": {
                "article": {
                    "__typename": "ArticleSuccess",
                    "article": {
                        "id": "article-1",
                        "title": "Foxes",
                        "content": CONTENT,
                        "url": "https://example.com/foxes",
                        "siteName": "Example",
                        "author": "Ada",
                        "savedAt": "2024-01-02T03:04:05Z",
                        "publishedAt": null,
                        "readingProgressPercent": 0.25,
                        "readingProgressAnchorIndex": 0
                    }
                }
            }
        }),
        "Article" => json!({
            "data": {
                "article": { "__typename": "ArticleError", "errorCodes": ["NOT_FOUND"] }
            }
        }),
        "SaveArticleReadingProgress" => {
            let input = &vars["input"];
            let percent = input["readingProgressPercent"].as_f64().unwrap_or_default();
            if percent <= 0.0 || percent > 1.0 {
                json!({
                    "data": {
                        "saveArticleReadingProgress": {
                            "__typename": "SaveArticleReadingProgressError",
                            "errorCodes": ["BAD_DATA"]
                        }
                    }
                })
            } else {
                json!({
                    "data": {
                        "saveArticleReadingProgress": {
                            "__typename": "SaveArticleReadingProgressSuccess",
                            "updatedArticle": {
                                "id": input["id"],
                                "readingProgressPercent": percent,
                                "readingProgressAnchorIndex":
                                    input["readingProgressAnchorIndex"].as_u64().unwrap_or_default()
                            }
                        }
                    }
                })
            }
        }
        "CreateHighlight" => {
            let input = &vars["input"];
            json!({
                "data": {
                    "createHighlight": {
                        "__typename": "CreateHighlightSuccess",
                        "highlight": {
                            "id": input["id"],
                            "type": input["type"],
                            "shortId": input["shortId"],
                            "quote": input["quote"],
                            "prefix": input["prefix"],
                            "suffix": input["suffix"],
                            "patch": input["patch"],
                            "color": input["color"],
                            "annotation": null,
                            "createdByMe": true,
                            "createdAt": "2024-01-02T03:04:05Z",
                            "updatedAt": "2024-01-02T03:04:05Z",
                            "sharedAt": null,
                            "highlightPositionPercent": input["highlightPositionPercent"],
                            "highlightPositionAnchorIndex": input["highlightPositionAnchorIndex"],
                            "labels": []
                        }
                    }
                }
            })
        }
        _ => json!({ "errors": [{ "message": format!("unknown operation {}", operation) }] }),
    };

    Json(response)
}

async fn serve(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}/api/graphql", addr)
}

async fn start() -> (ReaderConfig, Recorded) {
    let recorded = Recorded::default();
    let app = Router::new()
        .route("/api/graphql", post(graphql))
        .with_state(recorded.clone());

    let mut config = ReaderConfig::default();
    config.remote.endpoint = serve(app).await;
    config.remote.api_token = Some("secret-token".to_string());
    (config, recorded)
}

#[tokio::test]
async fn test_fetch_article() {
    let (config, recorded) = start().await;
    let remote = GraphqlRemote::new(&config.remote).unwrap();

    let article = remote
        .fetch_article("ada", "foxes", ContentFormat::Html)
        .await
        .unwrap();

    assert_eq!(article.id, "article-1");
    assert_eq!(article.site_name.as_deref(), Some("Example"));

    let requests = recorded.requests.lock();
    let (auth, body) = &requests[0];
    assert_eq!(auth.as_deref(), Some("secret-token"));
    assert_eq!(body["variables"]["format"], "html");
    assert_eq!(body["variables"]["username"], "ada");
}

#[tokio::test]
async fn test_fetch_missing_article() {
    let (config, _) = start().await;
    let remote = GraphqlRemote::new(&config.remote).unwrap();

    let err = remote
        .fetch_article("ada", "missing", ContentFormat::Html)
        .await
        .unwrap_err();
    assert!(matches!(err, ReaderError::NotFound(_)));
}

#[tokio::test]
async fn test_save_progress() {
    let (config, recorded) = start().await;
    let remote = GraphqlRemote::new(&config.remote).unwrap();

    let ack = remote
        .save_reading_progress(&ProgressUpdate::new("article-1", 0.5).with_anchor_index(2))
        .await
        .unwrap();
    assert_eq!(ack.updated_percent, 0.5);
    assert_eq!(ack.updated_anchor_index, 2);

    let err = remote
        .save_reading_progress(&ProgressUpdate::new("article-1", 1.5))
        .await
        .unwrap_err();
    assert_eq!(err.error_codes(), ["BAD_DATA".to_string()]);

    let requests = recorded.requests.lock();
    assert_eq!(requests[0].1["variables"]["input"]["readingProgressPercent"], 0.5);
    assert!(requests[1].1["variables"]["input"]
        .get("readingProgressAnchorIndex")
        .is_none());
}

#[tokio::test]
async fn test_session_over_http() {
    let (config, recorded) = start().await;
    let remote = CachedRemote::new(GraphqlRemote::new(&config.remote).unwrap(), 4);
    let mut session = ReadingSession::open(Arc::new(remote), &config, "ada", "foxes")
        .await
        .unwrap();

    assert_eq!(session.initial_page(4), 0);

    let progress = session.navigate(1, 4).await.unwrap().unwrap();
    assert_eq!(progress.percent, 0.5);

    let paragraphs = session.document().elements_by_tag("p");
    let bold = session.document().elements_by_tag("b")[0];

    // Arm one paragraph, switch to another, confirm there
    session.mark(paragraphs[0]).unwrap();
    session.mark(bold).unwrap();
    let highlight = session.confirm(paragraphs[1]).await.unwrap().unwrap();

    assert_eq!(highlight.quote(), "The quick brown fox");
    assert_eq!(highlight.anchor.prefix, "Foxes\nIntro text.\n");
    assert!(highlight.created_by_me);

    assert_eq!(
        recorded.operations(),
        ["Article", "SaveArticleReadingProgress", "CreateHighlight"]
    );

    let requests = recorded.requests.lock();
    let input = &requests[2].1["variables"]["input"];
    assert_eq!(input["type"], "HIGHLIGHT");
    assert_eq!(input["color"], "yellow");
    assert_eq!(input["articleId"], "article-1");
    assert_eq!(input["shortId"].as_str().unwrap().len(), 8);
}

#[tokio::test]
async fn test_http_error_is_transport_failure() {
    let app = Router::new().route(
        "/api/graphql",
        post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
    );
    let mut config = ReaderConfig::default();
    config.remote.endpoint = serve(app).await;
    let remote = GraphqlRemote::new(&config.remote).unwrap();

    let err = remote
        .fetch_article("ada", "foxes", ContentFormat::Html)
        .await
        .unwrap_err();
    assert!(matches!(err, ReaderError::TransportFailure(_)));
}

#[tokio::test]
async fn test_graphql_errors_are_validation_errors() {
    let app = Router::new().route(
        "/api/graphql",
        post(|| async { Json(json!({ "errors": [{ "message": "Unauthorized" }] })) }),
    );
    let mut config = ReaderConfig::default();
    config.remote.endpoint = serve(app).await;
    let remote = GraphqlRemote::new(&config.remote).unwrap();

    let err = remote
        .save_reading_progress(&ProgressUpdate::new("article-1", 0.5))
        .await
        .unwrap_err();
    assert_eq!(err.error_codes(), ["Unauthorized".to_string()]);
}
