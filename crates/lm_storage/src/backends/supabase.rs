use std::env;
use std::fmt;

use async_trait::async_trait;
use lm_core::storage::clamp_limit;
use lm_core::{Article, ArticleStorage, ArticlesPage, Error, Result};
use reqwest::{Client, Response};
use tracing::{debug, error};
use url::Url;

use crate::row::{split_page, ArticleRow};
use crate::{StorageBackend, StorageConfig, FETCH_FAILED, SAVE_FAILED};

const TABLE: &str = "articles";

/// Which credential an operation should prefer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyRole {
    Anonymous,
    ServiceRole,
}

#[derive(Clone, Default)]
pub struct SupabaseConfig {
    pub url: Option<String>,
    pub anon_key: Option<String>,
    pub service_role_key: Option<String>,
}

impl fmt::Debug for SupabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SupabaseConfig")
            .field("url", &self.url)
            .field("anon_key", &self.anon_key.as_deref().map(|_| "<redacted>"))
            .field("service_role_key", &self.service_role_key.as_deref().map(|_| "<redacted>"))
            .finish()
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

impl SupabaseConfig {
    pub fn from_env() -> Self {
        Self {
            url: non_empty_env("SUPABASE_URL"),
            anon_key: non_empty_env("SUPABASE_ANON_KEY"),
            service_role_key: non_empty_env("SUPABASE_SERVICE_ROLE_KEY"),
        }
    }

    /// Reads prefer the anonymous key, writes the service-role key; each
    /// falls back to the other.
    pub fn key(&self, role: KeyRole) -> Option<&str> {
        let (preferred, fallback) = match role {
            KeyRole::Anonymous => (&self.anon_key, &self.service_role_key),
            KeyRole::ServiceRole => (&self.service_role_key, &self.anon_key),
        };
        preferred.as_deref().or(fallback.as_deref())
    }

    fn table_url(&self) -> Result<Url> {
        let base = self.url.as_deref().ok_or_else(|| {
            error!("⚠️ Missing SUPABASE_URL environment variable. Supabase features are disabled.");
            Error::Configuration(
                "Supabase client is not configured. Set SUPABASE_URL and keys to use article storage."
                    .to_string(),
            )
        })?;
        let url = format!("{}/rest/v1/{}", base.trim_end_matches('/'), TABLE);
        Url::parse(&url).map_err(|e| Error::Configuration(format!("Invalid SUPABASE_URL '{}': {}", base, e)))
    }

    fn target(&self, role: KeyRole) -> Result<(Url, &str)> {
        let url = self.table_url()?;
        let key = self.key(role).ok_or_else(|| {
            error!("⚠️ Missing Supabase key environment variables. Supabase features are disabled.");
            Error::Configuration(
                "Supabase client is not configured. Set SUPABASE_ANON_KEY or SUPABASE_SERVICE_ROLE_KEY."
                    .to_string(),
            )
        })?;
        Ok((url, key))
    }
}

/// Articles table behind Supabase's PostgREST interface.
pub struct SupabaseStorage {
    client: Client,
    config: SupabaseConfig,
}

impl fmt::Debug for SupabaseStorage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SupabaseStorage")
            .field("client", &"<reqwest::Client>")
            .field("config", &self.config)
            .finish()
    }
}

impl SupabaseStorage {
    pub fn new(config: SupabaseConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    async fn rows(response: Response, failure: &'static str) -> Result<Vec<ArticleRow>> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(status = status.as_u16(), body = %body, "💥 Supabase rejected the request");
            return Err(Error::Storage(failure.to_string()));
        }
        response.json::<Vec<ArticleRow>>().await.map_err(|e| {
            error!(error = %e, "💥 Supabase answered with rows we could not decode");
            Error::Storage(failure.to_string())
        })
    }
}

#[async_trait]
impl StorageBackend for SupabaseStorage {
    fn name() -> &'static str {
        "supabase"
    }

    async fn from_config(config: &StorageConfig) -> Result<Self> {
        Ok(Self::new(config.supabase.clone()))
    }
}

#[async_trait]
impl ArticleStorage for SupabaseStorage {
    async fn fetch_page(&self, cursor: Option<&str>, limit: usize) -> Result<ArticlesPage> {
        let (url, key) = self.config.target(KeyRole::Anonymous)?;
        let limit = clamp_limit(limit);

        let mut query = vec![
            ("select", "*".to_string()),
            ("order", "created_at.desc".to_string()),
            ("limit", (limit + 1).to_string()),
        ];
        if let Some(cursor) = cursor.filter(|c| !c.is_empty()) {
            query.push(("created_at", format!("lt.{}", cursor)));
        }
        debug!(limit, ?cursor, "Fetching article page from Supabase");

        let response = self
            .client
            .get(url)
            .query(&query)
            .header("apikey", key)
            .bearer_auth(key)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "💥 Failed to fetch articles from Supabase");
                Error::Storage(FETCH_FAILED.to_string())
            })?;

        let rows = Self::rows(response, FETCH_FAILED).await?;
        split_page(rows, limit)
    }

    async fn persist_article(&self, article: &Article) -> Result<Article> {
        let (url, key) = self.config.target(KeyRole::ServiceRole)?;
        let row = ArticleRow::from_article(article)?;

        let response = self
            .client
            .post(url)
            .header("apikey", key)
            .bearer_auth(key)
            .header("Prefer", "return=representation")
            .json(&row)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "💥 Failed to persist article to Supabase");
                Error::Storage(SAVE_FAILED.to_string())
            })?;

        let stored = Self::rows(response, SAVE_FAILED)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| {
                error!(id = %article.id, "💥 Supabase accepted the insert but returned no row");
                Error::Storage(SAVE_FAILED.to_string())
            })?;
        stored.into_article()
    }
}
