//! Shared middleware for the ashchan API.

use actix_cors::Cors;
use actix_web::middleware::Logger;

/// Standard request logging:
/// remote-ip "request-line" status-code response-size "referrer" "user-agent"
pub fn request_logger() -> Logger {
    Logger::default()
}

/// CORS for deployments where the frontend lives on another origin. The
/// board only ever reads and posts.
pub fn cors_policy() -> Cors {
    Cors::default()
        .allow_any_origin()
        .allowed_methods(vec!["GET", "POST"])
        .max_age(3600)
}
