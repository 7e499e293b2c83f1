//! Per-client post throttle.
//!
//! A coarse cooldown, not a token bucket: the store's last-post-time lookup
//! makes the check O(1) per identifier, which is all a board needs.

/// Default seconds a client must wait between posts.
pub const POST_COOLDOWN_SECS: i64 = 15;

#[derive(Debug, Clone, Copy)]
pub struct RateLimiter {
    cooldown_secs: i64,
}

impl RateLimiter {
    pub fn new(cooldown_secs: i64) -> Self {
        Self { cooldown_secs }
    }

    pub fn cooldown_secs(&self) -> i64 {
        self.cooldown_secs
    }

    /// True if this client may post at `now`, given the timestamp of its
    /// most recent post. The boundary is exclusive on the blocked side:
    /// elapsed time must be strictly greater than the cooldown.
    pub fn allows(&self, last_post: Option<i64>, now: i64) -> bool {
        match last_post {
            None => true,
            Some(last) => now - last > self.cooldown_secs,
        }
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(POST_COOLDOWN_SECS)
    }
}
