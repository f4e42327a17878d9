use async_trait::async_trait;
use chrono::{DateTime, Utc};
use lm_core::storage::clamp_limit;
use lm_core::types::parse_timestamp;
use lm_core::{Article, ArticleStorage, ArticlesPage, Error, Result};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::error;

use crate::row::{split_page, ArticleRow};
use crate::{StorageBackend, SAVE_FAILED};

/// Rows kept in insertion order, like an unindexed table.
#[derive(Debug, Default)]
pub struct MemoryStore {
    rows: Vec<ArticleRow>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self { rows: Vec::new() }
    }

    pub fn insert(&mut self, row: ArticleRow) -> Result<ArticleRow> {
        if self.rows.iter().any(|existing| existing.id == row.id) {
            error!(id = %row.id, "💥 Duplicate article id rejected by memory store");
            return Err(Error::Storage(SAVE_FAILED.to_string()));
        }
        self.rows.push(row.clone());
        Ok(row)
    }

    /// Newest first, strictly before `before`, at most `count` rows.
    pub fn select(&self, before: Option<DateTime<Utc>>, count: usize) -> Vec<ArticleRow> {
        let mut rows: Vec<(DateTime<Utc>, &ArticleRow)> = self
            .rows
            .iter()
            .filter_map(|row| parse_timestamp(&row.created_at).map(|created| (created, row)))
            .filter(|(created, _)| before.map_or(true, |cursor| *created < cursor))
            .collect();
        rows.sort_by(|a, b| b.0.cmp(&a.0));
        rows.into_iter().take(count).map(|(_, row)| row.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    store: Arc<RwLock<MemoryStore>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self {
            store: Arc::new(RwLock::new(MemoryStore::new())),
        }
    }

    pub async fn len(&self) -> usize {
        self.store.read().await.len()
    }
}

#[async_trait]
impl StorageBackend for MemoryStorage {
    fn name() -> &'static str {
        "memory"
    }

    async fn from_config(_config: &crate::StorageConfig) -> Result<Self> {
        Ok(Self::new())
    }
}

#[async_trait]
impl ArticleStorage for MemoryStorage {
    async fn fetch_page(&self, cursor: Option<&str>, limit: usize) -> Result<ArticlesPage> {
        let limit = clamp_limit(limit);
        let before = match cursor.filter(|c| !c.is_empty()) {
            Some(cursor) => Some(
                parse_timestamp(cursor)
                    .ok_or_else(|| Error::InvalidInput(format!("Invalid cursor '{}'", cursor)))?,
            ),
            None => None,
        };

        let rows = self.store.read().await.select(before, limit + 1);
        split_page(rows, limit)
    }

    async fn persist_article(&self, article: &Article) -> Result<Article> {
        let row = ArticleRow::from_article(article)?;
        let stored = self.store.write().await.insert(row)?;
        stored.into_article()
    }
}
