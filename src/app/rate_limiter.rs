use anyhow::Result;
use uuid::Uuid;

use crate::config::rate_limits::{current_window, IpAction, RateLimits, RateWindow, WriteAction};
use crate::infra::cache::RedisCache;

pub struct RateLimitInfo {
    pub limited: bool,
    pub limit: u32,
    pub remaining: u32,
}

#[derive(Clone)]
pub struct RateLimiter {
    cache: RedisCache,
    limits: RateLimits,
}

fn window_key(subject: &str, action: &str, window: RateWindow) -> String {
    let window_seconds = window.seconds();
    format!(
        "ratelimit:{}:{}:{}",
        subject,
        action,
        current_window(window_seconds)
    )
}

impl RateLimiter {
    pub fn new(cache: RedisCache, limits: RateLimits) -> Self {
        Self { cache, limits }
    }

    /// Checks a user's hourly quota for a write without consuming it.
    pub async fn check(&self, user_id: Uuid, action: WriteAction) -> Result<RateLimitInfo> {
        let limit = self.limits.for_write(action);
        let key = window_key(&user_id.to_string(), action.as_str(), RateWindow::Hour);
        let count = self.cache.counter(&key).await?;

        if count >= limit {
            tracing::debug!(
                user_id = %user_id,
                action = action.as_str(),
                count = count,
                limit = limit,
                "rate limit exceeded"
            );
        }

        Ok(RateLimitInfo {
            limited: count >= limit,
            limit,
            remaining: limit.saturating_sub(count),
        })
    }

    pub async fn increment(&self, user_id: Uuid, action: WriteAction) -> Result<()> {
        let window = RateWindow::Hour;
        let key = window_key(&user_id.to_string(), action.as_str(), window);
        self.cache.bump_counter(&key, window.seconds()).await?;
        Ok(())
    }

    /// Checks the per-IP quota for an unauthenticated action.
    pub async fn check_ip(&self, ip: &str, action: IpAction) -> Result<bool> {
        let limit = self.limits.for_ip(action);
        let key = window_key(&format!("ip:{}", ip), action.as_str(), action.window());
        let count = self.cache.counter(&key).await?;

        if count >= limit {
            tracing::debug!(ip = ip, action = action.as_str(), count, limit, "IP rate limit exceeded");
            return Ok(true);
        }

        Ok(false)
    }

    pub async fn increment_ip(&self, ip: &str, action: IpAction) -> Result<()> {
        let window = action.window();
        let key = window_key(&format!("ip:{}", ip), action.as_str(), window);
        self.cache.bump_counter(&key, window.seconds()).await?;
        Ok(())
    }
}
