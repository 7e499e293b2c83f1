//! # ThreadService
//!
//! Orchestrates a post submission across the ports: token check, field
//! validation, rate limiting, image ingestion, persistence, and the bump of
//! the parent thread for replies. This is the only place that decides
//! rollback when one of those steps fails after another has side effects.

use std::sync::Arc;

use chrono::Utc;
use log::{error, warn};

use crate::error::AppError;
use crate::limit::RateLimiter;
use crate::models::{
    BoardPage, NewPost, PostRequest, ThreadView, MESSAGE_MAX_CHARS, TITLE_MAX_CHARS,
};
use crate::pagination::page_window;
use crate::traits::{MediaIngest, PostStore, TokenVerifier};

#[derive(Clone)]
pub struct ThreadService {
    store: Arc<dyn PostStore>,
    media: Arc<dyn MediaIngest>,
    tokens: Arc<dyn TokenVerifier>,
    limiter: RateLimiter,
}

impl ThreadService {
    pub fn new(
        store: Arc<dyn PostStore>,
        media: Arc<dyn MediaIngest>,
        tokens: Arc<dyn TokenVerifier>,
        limiter: RateLimiter,
    ) -> Self {
        Self { store, media, tokens, limiter }
    }

    /// Validates and persists one submission, returning the new post id.
    ///
    /// Checks run in a fixed order — token, title, message, parent
    /// existence, rate limit, ingestion — and the first failure rejects the
    /// request with its specific reason; nothing is persisted on any
    /// rejection. If the store insert fails after an upload was ingested,
    /// the stored files are discarded before the error propagates.
    pub async fn submit_post(&self, req: PostRequest) -> Result<i64, AppError> {
        if !self.tokens.verify(&req.token) {
            return Err(AppError::Validation("invalid or missing form token".to_string()));
        }

        let is_thread = req.parent == 0;

        let title = clip(req.title.as_deref().unwrap_or(""), TITLE_MAX_CHARS);
        if is_thread && title.is_empty() {
            return Err(AppError::Validation("a thread needs a title".to_string()));
        }

        let message = clip(&req.message, MESSAGE_MAX_CHARS);
        if message.is_empty() {
            return Err(AppError::Validation("a post needs a message".to_string()));
        }

        if !is_thread && self.store.get_thread(req.parent).await?.is_none() {
            return Err(AppError::Validation(format!(
                "thread {} does not exist",
                req.parent
            )));
        }

        let now = Utc::now().timestamp();
        let last = self.store.get_last_post_time(&req.client_id).await?;
        if !self.limiter.allows(last, now) {
            return Err(AppError::RateLimited(self.limiter.cooldown_secs() as u64));
        }

        let stored = match &req.upload {
            Some(upload) => Some(self.media.ingest(&upload.data, upload.declared_size).await?),
            None => None,
        };

        let new_post = NewPost {
            parent: req.parent,
            client_id: req.client_id.clone(),
            title: if is_thread { Some(title) } else { None },
            message,
            file: stored.as_ref().map(|s| s.file.clone()),
            thumbnail_file: stored.as_ref().map(|s| s.thumbnail.clone()),
        };

        let id = match self.store.create_post(new_post, now).await {
            Ok(id) => id,
            Err(e) => {
                if let Some(stored) = &stored {
                    self.media.discard(stored).await;
                }
                error!("create_post failed for client {}: {e}", req.client_id);
                return Err(e);
            }
        };

        if !is_thread {
            // Sort order only; a failed bump must not fail the reply.
            if let Err(e) = self.store.bump_thread(req.parent, now).await {
                warn!("bump of thread {} after post {id} failed: {e}", req.parent);
            }
        }

        Ok(id)
    }

    /// One page of the board listing, threads ordered by `bumped`
    /// descending. `page` is clamped to >= 1 here; a page past the end
    /// comes back empty with the true `total_pages`.
    pub async fn board_page(&self, page: u64, per_page: u64) -> Result<BoardPage, AppError> {
        let page = page.max(1);
        let total = self.store.get_thread_count().await?;
        let window = page_window(page, per_page, total);
        let threads = self.store.get_thread_page(page, per_page).await?;
        Ok(BoardPage { threads, page, total_pages: window.total_pages })
    }

    /// A thread and its replies in posting order.
    pub async fn thread_view(&self, id: i64) -> Result<ThreadView, AppError> {
        let thread = self
            .store
            .get_thread(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("thread {id}")))?;
        let replies = self.store.get_replies(id).await?;
        Ok(ThreadView { thread, replies })
    }
}

/// Trims, then caps at `max_chars` characters.
fn clip(s: &str, max_chars: usize) -> String {
    s.trim().chars().take(max_chars).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Upload;
    use crate::testing::{MemMedia, MemStore, StaticTokens};

    fn service(store: Arc<MemStore>, media: Arc<MemMedia>) -> ThreadService {
        ThreadService::new(
            store,
            media,
            Arc::new(StaticTokens::accepting()),
            RateLimiter::default(),
        )
    }

    fn thread_request(title: &str, message: &str) -> PostRequest {
        PostRequest {
            token: StaticTokens::TOKEN.to_string(),
            parent: 0,
            client_id: "198.51.100.7".to_string(),
            title: Some(title.to_string()),
            message: message.to_string(),
            upload: None,
        }
    }

    fn reply_request(parent: i64, message: &str) -> PostRequest {
        PostRequest { parent, title: None, ..thread_request("", message) }
    }

    #[tokio::test]
    async fn bad_token_short_circuits() {
        let store = Arc::new(MemStore::new());
        let svc = ThreadService::new(
            store.clone(),
            Arc::new(MemMedia::new()),
            Arc::new(StaticTokens::rejecting()),
            RateLimiter::default(),
        );
        let err = svc.submit_post(thread_request("hi", "hello")).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert!(store.all().is_empty());
    }

    #[tokio::test]
    async fn a_thread_needs_a_title_but_a_reply_does_not() {
        let store = Arc::new(MemStore::new());
        let svc = service(store.clone(), Arc::new(MemMedia::new()));

        let err = svc.submit_post(thread_request("   ", "hello")).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let thread = svc.submit_post(thread_request("first", "hello")).await.unwrap();
        // Different client so the cooldown does not interfere.
        let mut reply = reply_request(thread, "me too");
        reply.client_id = "203.0.113.9".to_string();
        svc.submit_post(reply).await.unwrap();
    }

    #[tokio::test]
    async fn empty_message_is_rejected() {
        let svc = service(Arc::new(MemStore::new()), Arc::new(MemMedia::new()));
        let err = svc.submit_post(thread_request("hi", " \n ")).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn overlong_fields_are_capped_not_rejected() {
        let store = Arc::new(MemStore::new());
        let svc = service(store.clone(), Arc::new(MemMedia::new()));
        let id = svc
            .submit_post(thread_request(&"t".repeat(200), &"m".repeat(9000)))
            .await
            .unwrap();
        let post = store.get_thread(id).await.unwrap().unwrap();
        assert_eq!(post.title.unwrap().chars().count(), TITLE_MAX_CHARS);
        assert_eq!(post.message.chars().count(), MESSAGE_MAX_CHARS);
    }

    #[tokio::test]
    async fn replying_to_a_missing_thread_is_rejected() {
        let store = Arc::new(MemStore::new());
        let svc = service(store.clone(), Arc::new(MemMedia::new()));
        let err = svc.submit_post(reply_request(999, "hello?")).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert!(store.all().is_empty());
    }

    #[tokio::test]
    async fn second_post_inside_cooldown_is_rate_limited() {
        let store = Arc::new(MemStore::new());
        let svc = service(store.clone(), Arc::new(MemMedia::new()));
        let now = Utc::now().timestamp();

        store.seed("first", 0, "198.51.100.7", now - 5);
        let err = svc.submit_post(thread_request("again", "too soon")).await.unwrap_err();
        assert!(matches!(err, AppError::RateLimited(_)));
    }

    #[tokio::test]
    async fn post_after_cooldown_succeeds() {
        let store = Arc::new(MemStore::new());
        let svc = service(store.clone(), Arc::new(MemMedia::new()));
        let now = Utc::now().timestamp();

        store.seed("first", 0, "198.51.100.7", now - 16);
        svc.submit_post(thread_request("again", "patience pays")).await.unwrap();
    }

    #[tokio::test]
    async fn ids_increase_across_sequential_inserts() {
        let store = Arc::new(MemStore::new());
        let svc = service(store.clone(), Arc::new(MemMedia::new()));
        let mut last = 0;
        for n in 0..3 {
            let mut req = thread_request(&format!("thread {n}"), "body");
            req.client_id = format!("client-{n}");
            let id = svc.submit_post(req).await.unwrap();
            assert!(id > last);
            last = id;
        }
    }

    #[tokio::test]
    async fn a_reply_bumps_its_parent_and_a_thread_bumps_nothing() {
        let store = Arc::new(MemStore::new());
        let svc = service(store.clone(), Arc::new(MemMedia::new()));
        let now = Utc::now().timestamp();

        let thread = store.seed("old", 0, "10.0.0.1", now - 100);
        let other = store.seed("older", 0, "10.0.0.2", now - 200);
        let before = store.get_thread(thread).await.unwrap().unwrap().bumped;

        svc.submit_post(reply_request(thread, "bump")).await.unwrap();

        let after = store.get_thread(thread).await.unwrap().unwrap();
        assert!(after.bumped >= before);
        let replies = store.get_replies(thread).await.unwrap();
        assert_eq!(after.bumped, replies.last().unwrap().timestamp);

        // The unrelated thread is untouched.
        assert_eq!(store.get_thread(other).await.unwrap().unwrap().bumped, now - 200);
    }

    #[tokio::test]
    async fn ingested_files_are_discarded_when_persistence_fails() {
        let store = Arc::new(MemStore::new());
        let media = Arc::new(MemMedia::new());
        let svc = service(store.clone(), media.clone());

        store.fail_next_create();
        let mut req = thread_request("doomed", "this will not persist");
        req.upload = Some(Upload { data: vec![1, 2, 3], declared_size: 3 });

        let err = svc.submit_post(req).await.unwrap_err();
        assert!(matches!(err, AppError::Persistence(_)));
        assert_eq!(media.ingested().len(), 1);
        assert_eq!(media.discarded(), media.ingested());
        assert!(store.all().is_empty());
    }

    #[tokio::test]
    async fn board_page_reports_window_and_ordering() {
        let store = Arc::new(MemStore::new());
        let svc = service(store.clone(), Arc::new(MemMedia::new()));
        let now = Utc::now().timestamp();
        for n in 0..25 {
            store.seed(&format!("t{n}"), 0, "10.0.0.9", now - 1000 + n);
        }

        let page = svc.board_page(3, 10).await.unwrap();
        assert_eq!(page.total_pages, 3);
        assert_eq!(page.threads.len(), 5);
        // Newest bumped first, so page 3 holds the oldest threads.
        assert!(page.threads.windows(2).all(|w| w[0].post.bumped >= w[1].post.bumped));

        let past_the_end = svc.board_page(9, 10).await.unwrap();
        assert!(past_the_end.threads.is_empty());
        assert_eq!(past_the_end.total_pages, 3);
    }

    #[tokio::test]
    async fn thread_view_returns_replies_in_posting_order() {
        let store = Arc::new(MemStore::new());
        let svc = service(store.clone(), Arc::new(MemMedia::new()));
        let now = Utc::now().timestamp();
        let thread = store.seed("op", 0, "10.0.0.1", now - 50);
        store.seed_reply(thread, "second", now - 20);
        store.seed_reply(thread, "first", now - 40);

        let view = svc.thread_view(thread).await.unwrap();
        assert_eq!(view.replies.len(), 2);
        assert!(view.replies[0].timestamp <= view.replies[1].timestamp);
        assert_eq!(
            view.replies.len() as i64,
            store.get_reply_count(thread).await.unwrap()
        );

        let missing = svc.thread_view(424242).await.unwrap_err();
        assert!(matches!(missing, AppError::NotFound(_)));
    }
}
