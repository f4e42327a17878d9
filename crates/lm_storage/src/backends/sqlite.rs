use async_trait::async_trait;
use lm_core::storage::clamp_limit;
use lm_core::types::{format_timestamp, parse_timestamp};
use lm_core::{Article, ArticleStorage, ArticlesPage, Error, Result};
use serde_json::Value;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;
use std::path::{Path, PathBuf};
use tracing::{error, info};

use crate::row::{split_page, ArticleRow};
use crate::{StorageBackend, StorageConfig, FETCH_FAILED, SAVE_FAILED};

const MIGRATIONS: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS articles (
        id TEXT PRIMARY KEY,
        title TEXT NOT NULL,
        author TEXT NOT NULL,
        subtitle TEXT,
        excerpt TEXT NOT NULL,
        sections TEXT,
        created_at TEXT NOT NULL,
        reading_time_minutes INTEGER,
        image_url TEXT
    )
    "#,
    "CREATE INDEX IF NOT EXISTS articles_created_at ON articles (created_at DESC)",
    // Add future migrations here
];

const COLUMNS: &str =
    "id, title, author, subtitle, excerpt, sections, created_at, reading_time_minutes, image_url";

pub struct SQLiteStorage {
    pool: SqlitePool,
    db_path: PathBuf,
}

#[async_trait]
impl StorageBackend for SQLiteStorage {
    fn name() -> &'static str {
        "sqlite"
    }

    async fn from_config(config: &StorageConfig) -> Result<Self> {
        Self::new_with_path(&config.sqlite_path).await
    }
}

impl SQLiteStorage {
    pub async fn new_with_path(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(|e| Error::Storage(format!("Failed to connect to database: {}", e)))?;

        for (i, migration) in MIGRATIONS.iter().enumerate() {
            sqlx::query(migration)
                .execute(&pool)
                .await
                .map_err(|e| Error::Storage(format!("Failed to run migration {}: {}", i, e)))?;
        }
        info!("💾 SQLite article store ready at {}", db_path.display());

        Ok(Self {
            pool,
            db_path: db_path.to_path_buf(),
        })
    }

    pub fn get_db_path(&self) -> &Path {
        &self.db_path
    }
}

fn read_row(row: &SqliteRow) -> std::result::Result<ArticleRow, sqlx::Error> {
    let sections: Option<String> = row.try_get("sections")?;
    Ok(ArticleRow {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        author: row.try_get("author")?,
        subtitle: row.try_get("subtitle")?,
        excerpt: row.try_get("excerpt")?,
        sections: sections.map(Value::String).unwrap_or(Value::Null),
        created_at: row.try_get("created_at")?,
        reading_time_minutes: row.try_get("reading_time_minutes")?,
        image_url: row.try_get("image_url")?,
    })
}

#[async_trait]
impl ArticleStorage for SQLiteStorage {
    async fn fetch_page(&self, cursor: Option<&str>, limit: usize) -> Result<ArticlesPage> {
        let limit = clamp_limit(limit);
        // stored timestamps share one text format, so compare in that format
        let before = match cursor.filter(|c| !c.is_empty()) {
            Some(cursor) => Some(format_timestamp(&parse_timestamp(cursor).ok_or_else(|| {
                Error::InvalidInput(format!("Invalid cursor '{}'", cursor))
            })?)),
            None => None,
        };

        let sql = format!(
            "SELECT {} FROM articles WHERE (?1 IS NULL OR created_at < ?1) ORDER BY created_at DESC LIMIT ?2",
            COLUMNS
        );
        let rows = sqlx::query(&sql)
            .bind(before)
            .bind((limit + 1) as i64)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                error!(error = %e, "💥 Failed to fetch articles from SQLite");
                Error::Storage(FETCH_FAILED.to_string())
            })?;

        let rows = rows
            .iter()
            .map(read_row)
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| {
                error!(error = %e, "💥 Unreadable article row in SQLite");
                Error::Storage(FETCH_FAILED.to_string())
            })?;
        split_page(rows, limit)
    }

    async fn persist_article(&self, article: &Article) -> Result<Article> {
        let row = ArticleRow::from_article(article)?;
        let sections = serde_json::to_string(&row.sections)?;

        let sql = format!(
            "INSERT INTO articles ({}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?) RETURNING {}",
            COLUMNS, COLUMNS
        );
        let stored = sqlx::query(&sql)
            .bind(&row.id)
            .bind(&row.title)
            .bind(&row.author)
            .bind(row.subtitle.as_deref())
            .bind(&row.excerpt)
            .bind(sections)
            .bind(&row.created_at)
            .bind(row.reading_time_minutes)
            .bind(row.image_url.as_deref())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                error!(error = %e, id = %row.id, "💥 Failed to persist article to SQLite");
                Error::Storage(SAVE_FAILED.to_string())
            })?;

        read_row(&stored)
            .map_err(|e| {
                error!(error = %e, "💥 Unreadable article row returned by SQLite");
                Error::Storage(SAVE_FAILED.to_string())
            })?
            .into_article()
    }
}
