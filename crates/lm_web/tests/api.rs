use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use lm_core::types::{format_timestamp, now};
use lm_core::{
    Article, ArticleSection, ArticleStorage, ArticlesPage, Error, FailureKind, InferenceModel,
    Invocation, Result,
};
use lm_inference::retry::UNAVAILABLE_MESSAGE;
use lm_inference::{ArticleGenerator, RetryPolicy};
use lm_storage::MemoryStorage;
use lm_web::{create_app, AppState};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

const TWO_SECTIONS: &str = r#"{
    "title": "Adding Numbers in JavaScript",
    "author": "Grace Hopper",
    "excerpt": "A tiny function with a big lesson.",
    "sections": [
        { "heading": "The function", "body": "It adds a and b." },
        { "heading": "Why it matters", "body": "Pure functions are easy to test." }
    ],
    "readingTimeMinutes": 3
}"#;

/// Answers every call with the same outcome.
struct FixedModel {
    reply: std::result::Result<String, FailureKind>,
    calls: AtomicUsize,
}

impl FixedModel {
    fn ok(text: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: Ok(text.to_string()),
            calls: AtomicUsize::new(0),
        })
    }

    fn failing(kind: FailureKind) -> Arc<Self> {
        Arc::new(Self {
            reply: Err(kind),
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl InferenceModel for FixedModel {
    fn name(&self) -> &str {
        "Fixed"
    }

    async fn complete(&self, _invocation: &Invocation) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.reply {
            Ok(text) => Ok(text.clone()),
            Err(FailureKind::Transient) => Err(Error::upstream(
                "[503 Service Unavailable] The model is overloaded.",
                FailureKind::Transient,
            )),
            Err(FailureKind::Terminal) => Err(Error::upstream(
                "[400 Bad Request] API key not valid.",
                FailureKind::Terminal,
            )),
        }
    }
}

struct BrokenStorage;

#[async_trait]
impl ArticleStorage for BrokenStorage {
    async fn fetch_page(&self, _cursor: Option<&str>, _limit: usize) -> Result<ArticlesPage> {
        Err(Error::Storage("connection refused".to_string()))
    }

    async fn persist_article(&self, _article: &Article) -> Result<Article> {
        Err(Error::Storage("Unable to save article to storage.".to_string()))
    }
}

fn app(model: Arc<FixedModel>, storage: Arc<dyn ArticleStorage>) -> Router {
    let generator = ArticleGenerator::new(model, RetryPolicy::new(3, Duration::from_millis(1)));
    create_app(AppState::new(generator, storage))
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

fn post_generate(body: impl Into<Body>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/generate")
        .header("content-type", "application/json")
        .body(body.into())
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn test_generate_persists_and_returns_article() {
    let storage = MemoryStorage::new();
    let app = app(FixedModel::ok(TWO_SECTIONS), Arc::new(storage.clone()));

    let before = now();
    let (status, body) = send(
        app,
        post_generate(json!({ "code": "function add(a,b){return a+b;}" }).to_string()),
    )
    .await;
    let after = Utc::now();

    assert_eq!(status, StatusCode::OK);
    assert!(!body["id"].as_str().unwrap().is_empty());
    let created_at: DateTime<Utc> = body["createdAt"].as_str().unwrap().parse().unwrap();
    assert!(created_at >= before && created_at <= after);
    assert_eq!(body["sections"].as_array().unwrap().len(), 2);
    assert_eq!(body["author"], "Grace Hopper");
    assert_eq!(body["comments"], json!([]));
    assert_eq!(storage.len().await, 1);
}

#[tokio::test]
async fn test_generated_article_appears_in_feed() {
    let storage: Arc<dyn ArticleStorage> = Arc::new(MemoryStorage::new());
    let model = FixedModel::ok(TWO_SECTIONS);

    let (_, created) = send(
        app(model.clone(), storage.clone()),
        post_generate(r#"{"code":"fn main() {}"}"#),
    )
    .await;
    let (status, page) = send(app(model, storage), get("/api/articles")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["articles"][0]["id"], created["id"]);
    assert_eq!(page["hasMore"], false);
    assert_eq!(page["nextCursor"], Value::Null);
}

#[tokio::test]
async fn test_invalid_bodies_are_rejected_without_calling_model() {
    let model = FixedModel::ok(TWO_SECTIONS);
    let storage: Arc<dyn ArticleStorage> = Arc::new(MemoryStorage::new());

    let cases = [
        ("", "Request body cannot be empty."),
        ("{\"code\":", "Invalid JSON payload."),
        ("{\"code\":\"   \"}", "Code sample is required to generate an article."),
        ("{\"guidance\":\"only guidance\"}", "Code sample is required to generate an article."),
    ];
    for (body, message) in cases {
        let (status, error) = send(app(model.clone(), storage.clone()), post_generate(body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "body {:?}", body);
        assert_eq!(error, json!({ "error": message }));
    }
    assert_eq!(model.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_exhausted_retries_answer_503() {
    let model = FixedModel::failing(FailureKind::Transient);
    let (status, body) = send(
        app(model.clone(), Arc::new(MemoryStorage::new())),
        post_generate(r#"{"code":"x"}"#),
    )
    .await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"], UNAVAILABLE_MESSAGE);
    assert_eq!(model.calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_terminal_failures_answer_500_without_retry() {
    let model = FixedModel::failing(FailureKind::Terminal);
    let (status, _) = send(
        app(model.clone(), Arc::new(MemoryStorage::new())),
        post_generate(r#"{"code":"x"}"#),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(model.calls.load(Ordering::SeqCst), 1);

    let (status, body) = send(
        app(FixedModel::ok("Sorry, I cannot help."), Arc::new(MemoryStorage::new())),
        post_generate(r#"{"code":"x"}"#),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].as_str().unwrap().contains("Raw output: Sorry, I cannot help."));
}

#[tokio::test]
async fn test_storage_failures() {
    let model = FixedModel::ok(TWO_SECTIONS);

    let (status, body) = send(app(model.clone(), Arc::new(BrokenStorage)), get("/api/articles")).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({ "error": "Unable to load articles right now." }));

    let (status, body) = send(
        app(model, Arc::new(BrokenStorage)),
        post_generate(r#"{"code":"x"}"#),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Unable to save article to storage.");
}

#[tokio::test]
async fn test_feed_pagination_over_http() {
    let storage = MemoryStorage::new();
    let base = now();
    for i in 0..5 {
        storage
            .persist_article(&Article {
                id: format!("{}", i + 1),
                title: format!("Article {}", i + 1),
                author: "Author".to_string(),
                subtitle: None,
                excerpt: "Excerpt".to_string(),
                sections: vec![ArticleSection {
                    heading: "H".to_string(),
                    body: "B".to_string(),
                }],
                created_at: base - ChronoDuration::minutes(i),
                reading_time_minutes: None,
                image_url: None,
                comments: vec![],
            })
            .await
            .unwrap();
    }
    let storage: Arc<dyn ArticleStorage> = Arc::new(storage);
    let model = FixedModel::ok(TWO_SECTIONS);
    let ids = |page: &Value| -> Vec<String> {
        page["articles"]
            .as_array()
            .unwrap()
            .iter()
            .map(|a| a["id"].as_str().unwrap().to_string())
            .collect()
    };

    let (_, first) = send(app(model.clone(), storage.clone()), get("/api/articles?limit=2")).await;
    assert_eq!(ids(&first), vec!["1", "2"]);
    assert_eq!(first["hasMore"], true);
    assert_eq!(
        first["nextCursor"],
        format_timestamp(&(base - ChronoDuration::minutes(1)))
    );

    let uri = format!("/api/articles?limit=2&cursor={}", first["nextCursor"].as_str().unwrap());
    let (_, second) = send(app(model.clone(), storage.clone()), get(&uri)).await;
    assert_eq!(ids(&second), vec!["3", "4"]);
    assert_eq!(second["hasMore"], true);

    let uri = format!("/api/articles?limit=2&cursor={}", second["nextCursor"].as_str().unwrap());
    let (_, third) = send(app(model.clone(), storage.clone()), get(&uri)).await;
    assert_eq!(ids(&third), vec!["5"]);
    assert_eq!(third["hasMore"], false);
    assert_eq!(third["nextCursor"], Value::Null);

    let (status, default_page) = send(app(model, storage), get("/api/articles?limit=bogus")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ids(&default_page).len(), 5);
}
