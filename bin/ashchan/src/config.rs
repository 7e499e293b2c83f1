//! Environment-backed configuration, read once at startup.

use std::env;
use std::path::PathBuf;

use anyhow::Context;

pub struct Config {
    pub bind_addr: String,
    pub database_url: String,
    pub upload_dir: PathBuf,
    pub thumb_dir: PathBuf,
    pub secret: String,
    pub per_page: u64,
    pub max_upload_bytes: u64,
}

fn var_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let secret = match env::var("ASHCHAN_SECRET") {
            Ok(secret) if !secret.is_empty() => secret,
            _ => {
                log::warn!(
                    "ASHCHAN_SECRET is not set; falling back to a development secret, \
                     form tokens will not be safe in production"
                );
                "ashchan-dev-secret".to_string()
            }
        };

        Ok(Self {
            bind_addr: var_or("ASHCHAN_ADDR", "127.0.0.1:8080"),
            database_url: var_or("ASHCHAN_DB", "sqlite:ashchan.db"),
            upload_dir: PathBuf::from(var_or("ASHCHAN_UPLOAD_DIR", "./data/uploads")),
            thumb_dir: PathBuf::from(var_or("ASHCHAN_THUMB_DIR", "./data/thumbs")),
            secret,
            per_page: var_or("ASHCHAN_PER_PAGE", "10")
                .parse()
                .context("ASHCHAN_PER_PAGE must be a positive integer")?,
            max_upload_bytes: var_or("ASHCHAN_MAX_UPLOAD_BYTES", "2097152")
                .parse()
                .context("ASHCHAN_MAX_UPLOAD_BYTES must be an integer")?,
        })
    }
}
