use async_trait::async_trait;
use lm_core::{Article, ArticleRequest, ArticlesPage, Error, FailureKind, Result};
use reqwest::{Client, Response};
use serde::Deserialize;
use tracing::{debug, info};
use url::Url;

const GENERATE_PATH: &str = "/api/generate";
const ARTICLES_PATH: &str = "/api/articles";

/// The two server calls a session makes.
#[async_trait]
pub trait ArticlesApi: Send + Sync {
    async fn generate(&self, request: &ArticleRequest) -> Result<Article>;
    async fn fetch_page(&self, cursor: Option<&str>, limit: usize) -> Result<ArticlesPage>;
}

#[derive(Deserialize)]
struct ErrorBody {
    error: Option<String>,
}

/// Turn a failed response into an error carrying the server's message.
async fn failure(response: Response, unreadable: &str, fallback_prefix: &str) -> Error {
    let status = response.status();
    let message = match response.json::<ErrorBody>().await {
        Ok(ErrorBody { error: Some(message) }) if !message.is_empty() => message,
        Ok(_) => format!("{} {}", fallback_prefix, status.as_u16()),
        Err(_) => unreadable.to_string(),
    };
    let kind = FailureKind::from_status(status.as_u16(), &message);
    Error::upstream(message, kind)
}

#[derive(Debug, Clone)]
pub struct HttpApi {
    client: Client,
    base_url: Url,
}

impl HttpApi {
    pub fn new(base_url: &str) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| Error::Configuration(format!("Invalid server URL '{}': {}", base_url, e)))?;
        Ok(Self {
            client: Client::new(),
            base_url,
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .map_err(|e| Error::Configuration(format!("Invalid endpoint '{}': {}", path, e)))
    }
}

#[async_trait]
impl ArticlesApi for HttpApi {
    async fn generate(&self, request: &ArticleRequest) -> Result<Article> {
        let url = self.endpoint(GENERATE_PATH)?;
        info!("📡 Posting generation request to {}", url);

        let response = self.client.post(url).json(request).send().await?;
        debug!("📥 Response status: {}", response.status());
        if !response.status().is_success() {
            return Err(failure(response, "Unknown error", "HTTP").await);
        }
        Ok(response.json::<Article>().await?)
    }

    async fn fetch_page(&self, cursor: Option<&str>, limit: usize) -> Result<ArticlesPage> {
        let mut url = self.endpoint(ARTICLES_PATH)?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("limit", &limit.to_string());
            if let Some(cursor) = cursor {
                query.append_pair("cursor", cursor);
            }
        }

        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(failure(response, "Unable to load articles", "Failed with status").await);
        }
        Ok(response.json::<ArticlesPage>().await?)
    }
}
