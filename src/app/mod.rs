pub mod auth;
pub mod comments;
pub mod live;
pub mod posts;
pub mod profiles;
pub mod rate_limiter;
pub mod reactions;
mod rows;
