//! # ac-db-sqlite
//!
//! SQLite implementation of the `PostStore` port. One `posts` table holds
//! both threads (`parent = 0`) and replies; secondary indexes on `parent`
//! and `bumped` keep the board listing and reply counts sub-linear.

use async_trait::async_trait;
use ac_core::error::AppError;
use ac_core::models::{NewPost, Post, ThreadSummary};
use ac_core::traits::PostStore;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;
use std::str::FromStr;

const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS posts (
        id             INTEGER PRIMARY KEY AUTOINCREMENT,
        parent         INTEGER NOT NULL DEFAULT 0,
        timestamp      INTEGER NOT NULL,
        bumped         INTEGER NOT NULL,
        client_id      TEXT    NOT NULL,
        title          TEXT,
        message        TEXT    NOT NULL,
        file           TEXT,
        thumbnail_file TEXT
    )",
    "CREATE INDEX IF NOT EXISTS idx_posts_parent ON posts (parent)",
    "CREATE INDEX IF NOT EXISTS idx_posts_bumped ON posts (bumped)",
];

pub struct SqlitePostStore {
    pool: SqlitePool,
}

impl SqlitePostStore {
    /// Connects (creating the database file if needed) and applies the
    /// schema idempotently.
    pub async fn new(url: &str) -> anyhow::Result<Self> {
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
        let mut pool_options = SqlitePoolOptions::new();
        if url.contains(":memory:") {
            // An in-memory database exists per connection; more than one
            // connection in the pool would each see an empty schema.
            pool_options = pool_options.max_connections(1);
        }
        let pool = pool_options.connect_with(options).await?;
        for statement in SCHEMA {
            sqlx::query(statement).execute(&pool).await?;
        }
        Ok(Self { pool })
    }
}

fn row_to_post(row: &SqliteRow) -> Post {
    Post {
        id: row.get("id"),
        parent: row.get("parent"),
        timestamp: row.get("timestamp"),
        bumped: row.get("bumped"),
        client_id: row.get("client_id"),
        title: row.get("title"),
        message: row.get("message"),
        file: row.get("file"),
        thumbnail_file: row.get("thumbnail_file"),
    }
}

fn persistence(op: &str, e: sqlx::Error) -> AppError {
    log::error!("{op}: {e}");
    AppError::Persistence(format!("{op}: {e}"))
}

#[async_trait]
impl PostStore for SqlitePostStore {
    async fn create_post(&self, post: NewPost, now: i64) -> Result<i64, AppError> {
        let result = sqlx::query(
            "INSERT INTO posts (parent, timestamp, bumped, client_id, title, message, file, thumbnail_file)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(post.parent)
        .bind(now)
        .bind(now)
        .bind(&post.client_id)
        .bind(&post.title)
        .bind(&post.message)
        .bind(&post.file)
        .bind(&post.thumbnail_file)
        .execute(&self.pool)
        .await
        .map_err(|e| persistence("insert post", e))?;

        Ok(result.last_insert_rowid())
    }

    /// Last-writer-wins on `bumped`; a missing id updates zero rows and is
    /// deliberately not an error.
    async fn bump_thread(&self, thread_id: i64, now: i64) -> Result<(), AppError> {
        sqlx::query("UPDATE posts SET bumped = ? WHERE id = ? AND parent = 0")
            .bind(now)
            .bind(thread_id)
            .execute(&self.pool)
            .await
            .map_err(|e| persistence("bump thread", e))?;
        Ok(())
    }

    async fn get_thread_page(&self, page: u64, per_page: u64) -> Result<Vec<ThreadSummary>, AppError> {
        let offset = page.saturating_sub(1).saturating_mul(per_page);
        let rows = sqlx::query(
            "SELECT p.*, (SELECT COUNT(*) FROM posts r WHERE r.parent = p.id) AS reply_count
             FROM posts p WHERE p.parent = 0
             ORDER BY p.bumped DESC
             LIMIT ? OFFSET ?",
        )
        .bind(per_page as i64)
        .bind(offset as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| persistence("list threads", e))?;

        Ok(rows
            .iter()
            .map(|row| ThreadSummary {
                post: row_to_post(row),
                reply_count: row.get("reply_count"),
            })
            .collect())
    }

    async fn get_thread_count(&self) -> Result<u64, AppError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM posts WHERE parent = 0")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| persistence("count threads", e))?;
        Ok(count as u64)
    }

    async fn get_thread(&self, id: i64) -> Result<Option<Post>, AppError> {
        let row = sqlx::query("SELECT * FROM posts WHERE id = ? AND parent = 0")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| persistence("fetch thread", e))?;
        Ok(row.as_ref().map(row_to_post))
    }

    async fn get_replies(&self, thread_id: i64) -> Result<Vec<Post>, AppError> {
        let rows = sqlx::query("SELECT * FROM posts WHERE parent = ? ORDER BY timestamp ASC, id ASC")
            .bind(thread_id)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| persistence("fetch replies", e))?;
        Ok(rows.iter().map(row_to_post).collect())
    }

    async fn get_reply_count(&self, thread_id: i64) -> Result<i64, AppError> {
        sqlx::query_scalar("SELECT COUNT(*) FROM posts WHERE parent = ?")
            .bind(thread_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| persistence("count replies", e))
    }

    async fn get_last_post_time(&self, client_id: &str) -> Result<Option<i64>, AppError> {
        let row = sqlx::query("SELECT timestamp FROM posts WHERE client_id = ? ORDER BY timestamp DESC LIMIT 1")
            .bind(client_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| persistence("last post time", e))?;
        Ok(row.map(|r| r.get(0)))
    }
}
