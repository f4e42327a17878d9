use async_trait::async_trait;
use crate::types::{Article, ArticlesPage};
use crate::Result;

pub const DEFAULT_PAGE_SIZE: usize = 6;
pub const MAX_PAGE_SIZE: usize = 20;

pub fn clamp_limit(limit: usize) -> usize {
    limit.clamp(1, MAX_PAGE_SIZE)
}

#[async_trait]
pub trait ArticleStorage: Send + Sync {
    /// Fetch one page, newest first, strictly older than `cursor` when given.
    async fn fetch_page(&self, cursor: Option<&str>, limit: usize) -> Result<ArticlesPage>;

    /// Insert an article and return it as stored. Comments are not kept.
    async fn persist_article(&self, article: &Article) -> Result<Article>;
}
