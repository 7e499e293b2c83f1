//! # ac-api
//!
//! The JSON routing layer for ashchan. Handlers translate HTTP into
//! `ThreadService` calls and domain errors into status codes; no HTML is
//! produced here.

pub mod handlers;
pub mod middleware;

use actix_web::web;

/// Configures the board routes under `/api`.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .route("/token", web::get().to(handlers::issue_token))
            .route("/board", web::get().to(handlers::board_index))
            .route("/thread/{id}", web::get().to(handlers::view_thread))
            .route("/post", web::post().to(handlers::create_post)),
    );
}
