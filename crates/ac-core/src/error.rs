//! # AppError
//!
//! Centralized error handling for the ashchan ecosystem. Validation-class
//! failures carry a user-facing reason; infrastructure failures keep their
//! detail for the logs and surface only a generic message.

use thiserror::Error;

/// The primary error type for all ac-core operations.
#[derive(Error, Debug)]
pub enum AppError {
    /// Bad or missing input. User-correctable, no side effects occurred.
    #[error("validation error: {0}")]
    Validation(String),

    /// The client posted again inside the cooldown window.
    #[error("you must wait {0} seconds between posts")]
    RateLimited(u64),

    /// Declared upload size exceeds the configured cap. Checked before any
    /// decode work, so nothing was written.
    #[error("file exceeds the maximum size of {limit} bytes")]
    FileTooLarge { declared: u64, limit: u64 },

    /// The sniffed content type is not in the allow-list.
    #[error("unsupported file type: {0}")]
    UnsupportedType(String),

    /// The bytes do not decode as a valid image of the detected type.
    #[error("file could not be decoded as an image: {0}")]
    DecodeFailure(String),

    /// The resampler could not produce the target canvas.
    #[error("image could not be resampled: {0}")]
    ResampleFailure(String),

    /// Resource not found (e.g., a thread id with no row).
    #[error("{0} not found")]
    NotFound(String),

    /// Filesystem fault while persisting an upload or thumbnail.
    #[error("storage failure: {0}")]
    Storage(String),

    /// Relational store fault.
    #[error("persistence failure: {0}")]
    Persistence(String),
}

impl AppError {
    /// The message shown to the poster. Validation-class reasons pass
    /// through verbatim; storage and persistence detail never leaves the
    /// server logs.
    pub fn user_message(&self) -> String {
        match self {
            AppError::Storage(_) | AppError::Persistence(_) => {
                "something went wrong on our end, please try again later".to_string()
            }
            other => other.to_string(),
        }
    }
}

/// A specialized Result type for ashchan logic.
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn infrastructure_detail_stays_generic() {
        let err = AppError::Persistence("disk I/O error at /var/lib/ashchan".to_string());
        assert!(!err.user_message().contains("/var/lib"));

        let err = AppError::Storage("permission denied: /srv/uploads".to_string());
        assert!(!err.user_message().contains("/srv"));
    }

    #[test]
    fn validation_reason_passes_through() {
        let err = AppError::Validation("a thread needs a title".to_string());
        assert!(err.user_message().contains("a thread needs a title"));
    }
}
