use axum::extract::{ConnectInfo, Request, State};
use axum::middleware::Next;
use axum::response::Response;
use std::net::SocketAddr;

use crate::app::rate_limiter::RateLimiter;
use crate::config::rate_limits::{IpAction, WriteAction};
use crate::http::{AppError, AuthUser};
use crate::AppState;

/// Per-user quota on posts, comments and reactions.
///
/// Anonymous writes pass through untouched; the handlers reject them.
pub async fn write_rate_limit_middleware(
    State(state): State<AppState>,
    auth: Option<AuthUser>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let action = WriteAction::classify(request.method().as_str(), request.uri().path());

    if let (Some(action), Some(auth_user)) = (action, auth) {
        let rate_limiter = RateLimiter::new(state.cache.clone(), state.rate_limits);
        match rate_limiter.check(auth_user.user_id, action).await {
            Ok(info) if info.limited => {
                return Err(AppError::rate_limited(format!(
                    "Rate limit exceeded for action: {}. Please try again later.",
                    action.as_str()
                )));
            }
            Ok(_) => {
                if let Err(err) = rate_limiter.increment(auth_user.user_id, action).await {
                    tracing::warn!(error = ?err, "failed to increment rate limit counter");
                }
            }
            Err(err) => {
                tracing::warn!(error = ?err, action = action.as_str(), "rate limit check unavailable; allowing request");
            }
        }
    }

    Ok(next.run(request).await)
}

/// Per-IP quota on sign-in and sign-up.
pub async fn ip_rate_limit_middleware(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let action = match IpAction::classify(request.method().as_str(), request.uri().path()) {
        Some(action) => action,
        None => return Ok(next.run(request).await),
    };

    let ip = addr.ip().to_string();
    let rate_limiter = RateLimiter::new(state.cache.clone(), state.rate_limits);

    match rate_limiter.check_ip(&ip, action).await {
        Ok(true) => {
            tracing::warn!(ip = ip, action = action.as_str(), "IP rate limit exceeded");
            return Err(AppError::rate_limited(
                "Too many attempts from your IP address. Please try again later.",
            ));
        }
        Ok(false) => {
            if let Err(err) = rate_limiter.increment_ip(&ip, action).await {
                tracing::warn!(error = ?err, "failed to increment IP rate limit counter");
            }
        }
        Err(err) => {
            tracing::warn!(error = ?err, action = action.as_str(), "IP rate limit check unavailable; allowing request");
        }
    }

    Ok(next.run(request).await)
}
