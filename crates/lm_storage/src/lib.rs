use async_trait::async_trait;
use lm_core::{ArticleStorage, Error, Result};
use std::env;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

pub mod backends;
pub mod row;

pub use backends::*;

pub const FETCH_FAILED: &str = "Unable to fetch articles from storage.";
pub const SAVE_FAILED: &str = "Unable to save article to storage.";

pub const DEFAULT_STORAGE: &str = "memory";
pub const DEFAULT_SQLITE_PATH: &str = "articles.db";

#[async_trait]
pub trait StorageBackend: Send + Sync {
    fn name() -> &'static str
    where
        Self: Sized;
    async fn from_config(config: &StorageConfig) -> Result<Self>
    where
        Self: Sized;
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Backend name: `memory`, `supabase` or `sqlite`.
    pub kind: String,
    pub sqlite_path: PathBuf,
    pub supabase: SupabaseConfig,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            kind: DEFAULT_STORAGE.to_string(),
            sqlite_path: PathBuf::from(DEFAULT_SQLITE_PATH),
            supabase: SupabaseConfig::default(),
        }
    }
}

impl StorageConfig {
    pub fn from_env() -> Self {
        let kind = env::var("ARTICLE_STORAGE")
            .ok()
            .map(|value| value.trim().to_lowercase())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| DEFAULT_STORAGE.to_string());
        let sqlite_path = env::var("SQLITE_PATH")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_SQLITE_PATH));

        Self {
            kind,
            sqlite_path,
            supabase: SupabaseConfig::from_env(),
        }
    }
}

async fn open<B>(config: &StorageConfig) -> Result<Arc<dyn ArticleStorage>>
where
    B: StorageBackend + ArticleStorage + 'static,
{
    let backend = B::from_config(config).await?;
    info!("💾 Using {} article storage", B::name());
    Ok(Arc::new(backend))
}

/// Build the configured backend.
pub async fn create_storage(config: &StorageConfig) -> Result<Arc<dyn ArticleStorage>> {
    match config.kind.as_str() {
        "memory" => open::<MemoryStorage>(config).await,
        "supabase" => open::<SupabaseStorage>(config).await,
        #[cfg(feature = "sqlite")]
        "sqlite" => open::<SQLiteStorage>(config).await,
        #[cfg(not(feature = "sqlite"))]
        "sqlite" => Err(Error::Configuration(
            "SQLite storage requires the `sqlite` feature.".to_string(),
        )),
        other => Err(Error::Configuration(format!(
            "Unknown storage backend '{}'. Expected memory, supabase or sqlite.",
            other
        ))),
    }
}

pub mod prelude {
    pub use super::backends::*;
    pub use super::{create_storage, StorageBackend, StorageConfig};
}
