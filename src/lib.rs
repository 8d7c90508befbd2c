pub mod app;
pub mod config;
pub mod domain;
pub mod http;
pub mod infra;

use crate::config::rate_limits::RateLimits;
use crate::config::AppConfig;
use crate::infra::{cache::RedisCache, changes::ChangeFeed, db::Db};

/// Everything a request handler needs, cloned per request.
#[derive(Clone)]
pub struct AppState {
    pub db: Db,
    pub cache: RedisCache,
    pub changes: ChangeFeed,
    pub paseto_access_key: [u8; 32],
    pub paseto_refresh_key: [u8; 32],
    pub access_ttl_minutes: u64,
    pub refresh_ttl_days: u64,
    pub max_post_chars: usize,
    pub max_comment_chars: usize,
    pub rate_limits: RateLimits,
}

impl AppState {
    pub fn new(config: &AppConfig, db: Db, cache: RedisCache, changes: ChangeFeed) -> Self {
        Self {
            db,
            cache,
            changes,
            paseto_access_key: config.paseto_access_key,
            paseto_refresh_key: config.paseto_refresh_key,
            access_ttl_minutes: config.access_ttl_minutes,
            refresh_ttl_days: config.refresh_ttl_days,
            max_post_chars: config.max_post_chars,
            max_comment_chars: config.max_comment_chars,
            rate_limits: config.rate_limits,
        }
    }
}
