use std::env;
use std::fmt;
use std::time::Duration;

pub mod generator;
pub mod models;
pub mod normalize;
pub mod prompt;
pub mod retry;

pub use generator::ArticleGenerator;
pub use models::create_model;
pub use retry::RetryPolicy;

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Process-wide model defaults. Requests may override key and model.
#[derive(Clone)]
pub struct Config {
    pub api_key: Option<String>,
    pub model_name: String,
    pub base_url: String,
    pub max_retries: u32,
    pub retry_delay: Duration,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("api_key", &self.api_key.as_deref().map(|_| "<redacted>"))
            .field("model_name", &self.model_name)
            .field("base_url", &self.base_url)
            .field("max_retries", &self.max_retries)
            .field("retry_delay", &self.retry_delay)
            .finish()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: None,
            model_name: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            max_retries: retry::DEFAULT_MAX_RETRIES,
            retry_delay: retry::DEFAULT_RETRY_DELAY,
        }
    }
}

impl Config {
    /// Read `GEMINI_*` variables, keeping defaults for anything unset or unparsable.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(key) = env::var("GEMINI_API_KEY") {
            if !key.trim().is_empty() {
                config.api_key = Some(key.trim().to_string());
            }
        }

        if let Ok(model) = env::var("GEMINI_MODEL") {
            if !model.trim().is_empty() {
                config.model_name = model.trim().to_string();
            }
        }

        if let Ok(url) = env::var("GEMINI_BASE_URL") {
            if !url.trim().is_empty() {
                config.base_url = url.trim().to_string();
            }
        }

        if let Ok(value) = env::var("GEMINI_MAX_RETRIES") {
            match value.trim().parse::<u32>() {
                Ok(retries) => config.max_retries = retries,
                Err(_) => tracing::warn!(value = %value, "Invalid GEMINI_MAX_RETRIES, using default"),
            }
        }

        if let Ok(value) = env::var("GEMINI_RETRY_DELAY_MS") {
            match value.trim().parse::<u64>() {
                Ok(ms) => config.retry_delay = Duration::from_millis(ms),
                Err(_) => tracing::warn!(value = %value, "Invalid GEMINI_RETRY_DELAY_MS, using default"),
            }
        }

        config
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_retries, self.retry_delay)
    }
}

pub mod prelude {
    pub use super::{ArticleGenerator, Config, RetryPolicy};
    pub use super::models::create_model;
    pub use lm_core::{Article, ArticleRequest, Error, GeneratedArticle, Result};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_redacts_api_key() {
        let config = Config {
            api_key: Some("secret-key".to_string()),
            ..Config::default()
        };
        let debug = format!("{:?}", config);
        assert!(!debug.contains("secret-key"));
        assert!(debug.contains("<redacted>"));
    }

    #[test]
    fn test_retry_policy_from_config() {
        let config = Config {
            max_retries: 5,
            retry_delay: Duration::from_millis(10),
            ..Config::default()
        };
        let policy = config.retry_policy();
        assert_eq!(policy.max_retries, 5);
        assert_eq!(policy.base_delay, Duration::from_millis(10));
    }
}
