//! In-memory port implementations for tests.
//!
//! These back the service-level tests in this crate and, behind the
//! `testing` feature, the handler tests in `ac-api`. They follow the
//! same contracts as the real plugins, just over a `Vec` under a mutex.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::AppError;
use crate::models::{NewPost, Post, StoredImage, ThreadSummary};
use crate::traits::{MediaIngest, PostStore, TokenVerifier};

#[derive(Default)]
struct MemInner {
    posts: Vec<Post>,
    next_id: i64,
}

/// `PostStore` over a plain `Vec<Post>`.
#[derive(Default)]
pub struct MemStore {
    inner: Mutex<MemInner>,
    fail_create: AtomicBool,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next `create_post` fail with a persistence error.
    pub fn fail_next_create(&self) {
        self.fail_create.store(true, Ordering::SeqCst);
    }

    /// Inserts a post directly, bypassing validation. For threads the
    /// title doubles as the message.
    pub fn seed(&self, title: &str, parent: i64, client_id: &str, timestamp: i64) -> i64 {
        let mut inner = self.inner.lock().unwrap();
        inner.next_id += 1;
        let id = inner.next_id;
        inner.posts.push(Post {
            id,
            parent,
            timestamp,
            bumped: timestamp,
            client_id: client_id.to_string(),
            title: if parent == 0 { Some(title.to_string()) } else { None },
            message: title.to_string(),
            file: None,
            thumbnail_file: None,
        });
        id
    }

    pub fn seed_reply(&self, parent: i64, message: &str, timestamp: i64) -> i64 {
        self.seed(message, parent, "seed-client", timestamp)
    }

    pub fn all(&self) -> Vec<Post> {
        self.inner.lock().unwrap().posts.clone()
    }
}

#[async_trait]
impl PostStore for MemStore {
    async fn create_post(&self, post: NewPost, now: i64) -> Result<i64, AppError> {
        if self.fail_create.swap(false, Ordering::SeqCst) {
            return Err(AppError::Persistence("simulated insert failure".to_string()));
        }
        let mut inner = self.inner.lock().unwrap();
        inner.next_id += 1;
        let id = inner.next_id;
        inner.posts.push(Post {
            id,
            parent: post.parent,
            timestamp: now,
            bumped: now,
            client_id: post.client_id,
            title: post.title,
            message: post.message,
            file: post.file,
            thumbnail_file: post.thumbnail_file,
        });
        Ok(id)
    }

    async fn bump_thread(&self, thread_id: i64, now: i64) -> Result<(), AppError> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(thread) = inner
            .posts
            .iter_mut()
            .find(|p| p.id == thread_id && p.parent == 0)
        {
            thread.bumped = now;
        }
        Ok(())
    }

    async fn get_thread_page(&self, page: u64, per_page: u64) -> Result<Vec<ThreadSummary>, AppError> {
        let inner = self.inner.lock().unwrap();
        let mut threads: Vec<&Post> = inner.posts.iter().filter(|p| p.parent == 0).collect();
        threads.sort_by_key(|p| std::cmp::Reverse(p.bumped));
        let offset = page.saturating_sub(1).saturating_mul(per_page) as usize;
        Ok(threads
            .into_iter()
            .skip(offset)
            .take(per_page as usize)
            .map(|t| ThreadSummary {
                post: t.clone(),
                reply_count: inner.posts.iter().filter(|p| p.parent == t.id).count() as i64,
            })
            .collect())
    }

    async fn get_thread_count(&self) -> Result<u64, AppError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.posts.iter().filter(|p| p.parent == 0).count() as u64)
    }

    async fn get_thread(&self, id: i64) -> Result<Option<Post>, AppError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .posts
            .iter()
            .find(|p| p.id == id && p.parent == 0)
            .cloned())
    }

    async fn get_replies(&self, thread_id: i64) -> Result<Vec<Post>, AppError> {
        let inner = self.inner.lock().unwrap();
        let mut replies: Vec<Post> = inner
            .posts
            .iter()
            .filter(|p| p.parent == thread_id)
            .cloned()
            .collect();
        replies.sort_by_key(|p| (p.timestamp, p.id));
        Ok(replies)
    }

    async fn get_reply_count(&self, thread_id: i64) -> Result<i64, AppError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.posts.iter().filter(|p| p.parent == thread_id).count() as i64)
    }

    async fn get_last_post_time(&self, client_id: &str) -> Result<Option<i64>, AppError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .posts
            .iter()
            .filter(|p| p.client_id == client_id)
            .map(|p| p.timestamp)
            .max())
    }
}

/// `MediaIngest` that records what was ingested and discarded without
/// touching the filesystem.
#[derive(Default)]
pub struct MemMedia {
    ingested: Mutex<Vec<StoredImage>>,
    discarded: Mutex<Vec<StoredImage>>,
}

impl MemMedia {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ingested(&self) -> Vec<StoredImage> {
        self.ingested.lock().unwrap().clone()
    }

    pub fn discarded(&self) -> Vec<StoredImage> {
        self.discarded.lock().unwrap().clone()
    }
}

#[async_trait]
impl MediaIngest for MemMedia {
    async fn ingest(&self, _data: &[u8], _declared_size: u64) -> Result<StoredImage, AppError> {
        let mut ingested = self.ingested.lock().unwrap();
        let stored = StoredImage {
            file: format!("{:04}.png", ingested.len()),
            thumbnail: format!("thumb_{:04}.png", ingested.len()),
        };
        ingested.push(stored.clone());
        Ok(stored)
    }

    async fn discard(&self, stored: &StoredImage) {
        self.discarded.lock().unwrap().push(stored.clone());
    }
}

/// `TokenVerifier` with a fixed token and a configurable verdict.
pub struct StaticTokens {
    accept: bool,
}

impl StaticTokens {
    pub const TOKEN: &'static str = "test-token";

    pub fn accepting() -> Self {
        Self { accept: true }
    }

    pub fn rejecting() -> Self {
        Self { accept: false }
    }
}

impl TokenVerifier for StaticTokens {
    fn issue(&self) -> String {
        Self::TOKEN.to_string()
    }

    fn verify(&self, token: &str) -> bool {
        self.accept && token == Self::TOKEN
    }
}
