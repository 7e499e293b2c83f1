//! # ashchan binary
//!
//! The entry point that assembles the board from the compiled-in plugins.

use std::sync::Arc;

use actix_web::{web, App, HttpServer};

use ac_api::handlers::AppState;
use ac_core::limit::RateLimiter;
use ac_core::service::ThreadService;
use ac_core::traits::TokenVerifier;

#[cfg(feature = "db-sqlite")]
use ac_db_sqlite::SqlitePostStore;

#[cfg(feature = "media-local")]
use ac_media_local::{LocalMediaStore, DEFAULT_THUMB_BOUND};

#[cfg(feature = "auth-hmac")]
use ac_auth_token::HmacTokenProvider;

mod config;
use config::Config;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let config = Config::from_env()?;

    // Storage directories are expected to exist at request time; create
    // them here so a fresh checkout runs.
    tokio::fs::create_dir_all(&config.upload_dir).await?;
    tokio::fs::create_dir_all(&config.thumb_dir).await?;

    #[cfg(feature = "db-sqlite")]
    let store = SqlitePostStore::new(&config.database_url).await?;

    #[cfg(feature = "media-local")]
    let media = LocalMediaStore::new(config.upload_dir.clone(), config.thumb_dir.clone())
        .with_limits(config.max_upload_bytes, DEFAULT_THUMB_BOUND, DEFAULT_THUMB_BOUND);

    #[cfg(feature = "auth-hmac")]
    let tokens: Arc<dyn TokenVerifier> = Arc::new(HmacTokenProvider::new(config.secret.as_bytes()));

    let service = ThreadService::new(
        Arc::new(store),
        Arc::new(media),
        tokens.clone(),
        RateLimiter::default(),
    );

    let state = web::Data::new(AppState {
        service,
        tokens,
        per_page: config.per_page,
        max_upload_bytes: config.max_upload_bytes,
    });

    log::info!("ashchan listening on http://{}", config.bind_addr);

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(ac_api::middleware::request_logger())
            .wrap(ac_api::middleware::cors_policy())
            .configure(ac_api::configure_routes)
    })
    .bind(&config.bind_addr)?
    .run()
    .await?;

    Ok(())
}
