use crate::types::{ArticleState, LinkState, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use std::str::FromStr;
use tracing::debug;

/// Persisted dismissal/queue facts. Records are append-only: marking is an
/// insert, never an update, and lookups read the first matching row for a
/// URL. A "not found" result is an `Ok(None)`, distinct from real store
/// errors.
#[async_trait]
pub trait StateStore: Send + Sync {
    async fn find_article_state(&self, url: &str) -> Result<Option<ArticleState>>;

    async fn mark_article_dismissed(&self, url: &str) -> Result<()>;

    async fn find_link_state(&self, url: &str) -> Result<Option<LinkState>>;

    async fn mark_link_queued(&self, url: &str) -> Result<()>;
}

pub struct SqliteStore {
    db: SqlitePool,
}

impl SqliteStore {
    pub async fn new(path: &str) -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);
        let db = SqlitePool::connect_with(options).await?;
        Self::init_schema(&db).await?;
        Ok(Self { db })
    }

    /// In-memory store. Pinned to a single pooled connection: every sqlite
    /// connection gets its own private memory database.
    pub async fn in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;
        let db = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;
        Self::init_schema(&db).await?;
        Ok(Self { db })
    }

    async fn init_schema(db: &SqlitePool) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS articles (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                url TEXT NOT NULL,
                dismissed_at TEXT
            )
            "#,
        )
        .execute(db)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS links (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                url TEXT NOT NULL,
                article_url TEXT,
                queued_at TEXT NOT NULL
            )
            "#,
        )
        .execute(db)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl StateStore for SqliteStore {
    async fn find_article_state(&self, url: &str) -> Result<Option<ArticleState>> {
        let row = sqlx::query(
            "SELECT id, url, dismissed_at FROM articles WHERE url = ? ORDER BY id LIMIT 1",
        )
        .bind(url)
        .fetch_optional(&self.db)
        .await?;

        match row {
            Some(row) => Ok(Some(ArticleState {
                id: row.try_get("id")?,
                url: row.try_get("url")?,
                dismissed_at: row.try_get::<Option<DateTime<Utc>>, _>("dismissed_at")?,
            })),
            None => Ok(None),
        }
    }

    async fn mark_article_dismissed(&self, url: &str) -> Result<()> {
        debug!("inserting dismissal for {}", url);
        sqlx::query("INSERT INTO articles (url, dismissed_at) VALUES (?, ?)")
            .bind(url)
            .bind(Utc::now())
            .execute(&self.db)
            .await?;
        Ok(())
    }

    async fn find_link_state(&self, url: &str) -> Result<Option<LinkState>> {
        let row = sqlx::query(
            "SELECT id, url, article_url, queued_at FROM links WHERE url = ? ORDER BY id LIMIT 1",
        )
        .bind(url)
        .fetch_optional(&self.db)
        .await?;

        match row {
            Some(row) => Ok(Some(LinkState {
                id: row.try_get("id")?,
                url: row.try_get("url")?,
                article_url: row.try_get("article_url")?,
                queued_at: row.try_get::<DateTime<Utc>, _>("queued_at")?,
            })),
            None => Ok(None),
        }
    }

    async fn mark_link_queued(&self, url: &str) -> Result<()> {
        debug!("inserting queue record for {}", url);
        sqlx::query("INSERT INTO links (url, article_url, queued_at) VALUES (?, NULL, ?)")
            .bind(url)
            .bind(Utc::now())
            .execute(&self.db)
            .await?;
        Ok(())
    }
}
