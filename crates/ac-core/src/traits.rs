//! # Core Traits (Ports)
//!
//! Any plugin must implement these traits to be used by the binary.

use async_trait::async_trait;
use crate::error::AppError;
use crate::models::{NewPost, Post, StoredImage, ThreadSummary};

/// Data persistence contract for posts. Reads are side-effect-free; writes
/// must be atomic with respect to the id they return.
#[async_trait]
pub trait PostStore: Send + Sync {
    /// Inserts a row with `timestamp = bumped = now` and returns the id of
    /// exactly that row.
    async fn create_post(&self, post: NewPost, now: i64) -> Result<i64, AppError>;

    /// Sets `bumped = now` on the thread row. A missing id is a no-op, not
    /// an error: the caller validated existence when it inserted the reply,
    /// and a lost race here must never fail the request.
    async fn bump_thread(&self, thread_id: i64, now: i64) -> Result<(), AppError>;

    /// Threads ordered by `bumped` descending, windowed to the given page,
    /// each with its reply count.
    async fn get_thread_page(&self, page: u64, per_page: u64) -> Result<Vec<ThreadSummary>, AppError>;

    async fn get_thread_count(&self) -> Result<u64, AppError>;

    /// The row with this id and `parent = 0`, if any.
    async fn get_thread(&self, id: i64) -> Result<Option<Post>, AppError>;

    /// Replies to a thread, ordered by `timestamp` ascending.
    async fn get_replies(&self, thread_id: i64) -> Result<Vec<Post>, AppError>;

    async fn get_reply_count(&self, thread_id: i64) -> Result<i64, AppError>;

    /// Most recent `timestamp` among posts from this client identifier, or
    /// `None` if it has never posted. Backs the rate limiter.
    async fn get_last_post_time(&self, client_id: &str) -> Result<Option<i64>, AppError>;
}

/// Image ingestion contract: validate, store, thumbnail.
#[async_trait]
pub trait MediaIngest: Send + Sync {
    /// Runs the full pipeline (size gate, content sniff, store original,
    /// decode, thumbnail) and returns the stored filename pair. On any
    /// failure after the original was written, the original is deleted
    /// before the error is returned — no orphaned uploads.
    async fn ingest(&self, data: &[u8], declared_size: u64) -> Result<StoredImage, AppError>;

    /// Best-effort removal of an already-ingested pair. Used by the service
    /// layer to roll back when persistence fails after a successful ingest.
    async fn discard(&self, stored: &StoredImage);
}

/// Form-token boundary capability (the session/CSRF provider). Verified
/// once per write request before any other validation.
pub trait TokenVerifier: Send + Sync {
    fn issue(&self) -> String;
    fn verify(&self, token: &str) -> bool;
}
