//! # Domain Models
//!
//! The sole persisted entity is [`Post`]; a thread is simply a post with
//! `parent = 0`. Everything else here is a read model or request payload
//! built around it.

use serde::{Deserialize, Serialize};

/// Titles are trimmed and capped at this many characters.
pub const TITLE_MAX_CHARS: usize = 75;
/// Messages are trimmed and capped at this many characters.
pub const MESSAGE_MAX_CHARS: usize = 8000;

/// One row of the board. `parent = 0` makes it a thread, anything else a
/// reply to the thread with that id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    /// Monotonically assigned by the store.
    pub id: i64,
    pub parent: i64,
    /// Creation time, epoch seconds. Immutable.
    pub timestamp: i64,
    /// Sort key for the board listing. Equals `timestamp` at creation and
    /// is touched only when a reply lands in this thread.
    pub bumped: i64,
    /// Opaque poster identifier (e.g. source address). Keyed on by the
    /// rate limiter, never shown to other posters.
    #[serde(skip_serializing, default)]
    pub client_id: String,
    /// Only meaningful for threads.
    pub title: Option<String>,
    pub message: String,
    /// Stored filename of the original upload, if any.
    pub file: Option<String>,
    /// Stored filename of the generated thumbnail. Set exactly when `file`
    /// is set.
    pub thumbnail_file: Option<String>,
}

impl Post {
    pub fn is_thread(&self) -> bool {
        self.parent == 0
    }
}

/// Insert payload for [`crate::traits::PostStore::create_post`]. The store
/// assigns the id and stamps `timestamp = bumped = now`.
#[derive(Debug, Clone)]
pub struct NewPost {
    pub parent: i64,
    pub client_id: String,
    pub title: Option<String>,
    pub message: String,
    pub file: Option<String>,
    pub thumbnail_file: Option<String>,
}

/// A thread row plus its reply count, as listed on a board page.
#[derive(Debug, Clone, Serialize)]
pub struct ThreadSummary {
    #[serde(flatten)]
    pub post: Post,
    pub reply_count: i64,
}

/// Result of a successful image ingestion: the pair of filenames now on
/// disk. Both are always present together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredImage {
    pub file: String,
    pub thumbnail: String,
}

/// An uploaded file as received from the form layer.
#[derive(Debug, Clone)]
pub struct Upload {
    pub data: Vec<u8>,
    /// Size as declared by the transport, checked against the cap before
    /// any decode work.
    pub declared_size: u64,
}

/// An inbound post submission, assembled by the API layer and handed to
/// [`crate::service::ThreadService::submit_post`].
#[derive(Debug, Clone)]
pub struct PostRequest {
    /// Form token from the session provider, verified before anything else.
    pub token: String,
    /// `0` to open a new thread, otherwise the thread id being replied to.
    pub parent: i64,
    pub client_id: String,
    pub title: Option<String>,
    pub message: String,
    pub upload: Option<Upload>,
}

/// One page of the board listing.
#[derive(Debug, Clone, Serialize)]
pub struct BoardPage {
    pub threads: Vec<ThreadSummary>,
    pub page: u64,
    pub total_pages: u64,
}

/// A thread and its replies in posting order.
#[derive(Debug, Clone, Serialize)]
pub struct ThreadView {
    pub thread: Post,
    pub replies: Vec<Post>,
}
