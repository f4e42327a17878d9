use axum::{
    body::Bytes,
    extract::{Query, State},
    Json,
};
use lm_core::storage::DEFAULT_PAGE_SIZE;
use lm_core::{Article, ArticleRequest, ArticlesPage};
use lm_inference::generator::MISSING_CODE_MESSAGE;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info};

use crate::{ApiError, AppState};

pub const LOAD_FAILED_MESSAGE: &str = "Unable to load articles right now.";
pub const EMPTY_BODY_MESSAGE: &str = "Request body cannot be empty.";
pub const INVALID_JSON_MESSAGE: &str = "Invalid JSON payload.";
pub const UNREADABLE_BODY_MESSAGE: &str = "Unable to read request body.";

#[derive(Debug, Default, Deserialize)]
pub struct PageParams {
    pub cursor: Option<String>,
    pub limit: Option<String>,
}

impl PageParams {
    /// Absent, unparsable and non-positive limits all mean the default page.
    fn limit(&self) -> usize {
        self.limit
            .as_deref()
            .and_then(|limit| limit.trim().parse::<i64>().ok())
            .filter(|limit| *limit > 0)
            .map(|limit| limit as usize)
            .unwrap_or(DEFAULT_PAGE_SIZE)
    }

    fn cursor(&self) -> Option<&str> {
        self.cursor.as_deref().filter(|cursor| !cursor.is_empty())
    }
}

pub async fn list_articles(
    State(state): State<Arc<AppState>>,
    Query(params): Query<PageParams>,
) -> Result<Json<ArticlesPage>, ApiError> {
    match state.storage.fetch_page(params.cursor(), params.limit()).await {
        Ok(page) => Ok(Json(page)),
        Err(e) => {
            error!(error = %e, "💥 Failed to load article page");
            Err(ApiError::internal(LOAD_FAILED_MESSAGE))
        }
    }
}

fn text_field(payload: &Value, key: &str) -> String {
    payload
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn non_empty(value: String) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

/// Validate the raw body into a generation request.
pub fn parse_generate_body(body: &[u8]) -> Result<ArticleRequest, ApiError> {
    let raw = std::str::from_utf8(body).map_err(|e| {
        error!(error = %e, "💥 Failed to read request body");
        ApiError::bad_request(UNREADABLE_BODY_MESSAGE)
    })?;
    info!("📦 Raw body length: {}", raw.len());

    if raw.trim().is_empty() {
        return Err(ApiError::bad_request(EMPTY_BODY_MESSAGE));
    }

    let payload: Value = serde_json::from_str(raw).map_err(|e| {
        error!(error = %e, "💥 Failed to parse JSON body");
        ApiError::bad_request(INVALID_JSON_MESSAGE)
    })?;

    let request = ArticleRequest {
        code: text_field(&payload, "code"),
        guidance: non_empty(text_field(&payload, "guidance")),
        api_key: non_empty(text_field(&payload, "apiKey")),
        model: non_empty(text_field(&payload, "model")),
    };

    if request.code.trim().is_empty() {
        info!("❌ Missing code sample in request");
        return Err(ApiError::bad_request(MISSING_CODE_MESSAGE));
    }
    Ok(request)
}

pub async fn generate_article(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<Article>, ApiError> {
    info!("🎯 Generate request received");
    let request = parse_generate_body(&body)?;

    info!(
        has_guidance = request.guidance.is_some(),
        has_api_key = request.api_key.is_some(),
        model = request.model.as_deref().unwrap_or("default"),
        "🔧 Generation request accepted"
    );

    let started = Instant::now();
    let generated = state.generator.generate(&request).await.map_err(|e| {
        error!(error = %e, status = e.status(), "💥 Article generation failed");
        ApiError::from(e)
    })?;

    let persisted = state
        .storage
        .persist_article(&generated.into_article())
        .await
        .map_err(|e| {
            error!(error = %e, "💥 Failed to persist generated article");
            ApiError::from(e)
        })?;

    info!(
        "✅ Article \"{}\" ready in {}ms",
        persisted.title,
        started.elapsed().as_millis()
    );
    Ok(Json(persisted))
}
