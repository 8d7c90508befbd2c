use serde::Serialize;

/// Per-user write quotas and per-IP auth quotas.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct RateLimits {
    pub posts_per_hour: u32,
    pub comments_per_hour: u32,
    pub reactions_per_hour: u32,
    pub logins_per_ip_per_hour: u32,
    pub signups_per_ip_per_day: u32,
}

impl Default for RateLimits {
    fn default() -> Self {
        Self {
            posts_per_hour: 30,
            comments_per_hour: 120,
            reactions_per_hour: 600,
            logins_per_ip_per_hour: 20,
            signups_per_ip_per_day: 5,
        }
    }
}

/// Writes that count against a user's hourly quota.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteAction {
    Post,
    Comment,
    Reaction,
}

impl WriteAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Post => "post",
            Self::Comment => "comment",
            Self::Reaction => "reaction",
        }
    }

    /// Maps a request onto the write it performs, if any.
    ///
    /// Paths are expected with the `/v1` prefix still attached.
    pub fn classify(method: &str, path: &str) -> Option<Self> {
        if method != "POST" {
            return None;
        }
        let rest = path.strip_prefix("/v1/")?;
        let segments: Vec<&str> = rest.trim_end_matches('/').split('/').collect();

        match segments.as_slice() {
            ["posts"] => Some(Self::Post),
            ["posts", _, "comments"] | ["comments", _, "replies"] => Some(Self::Comment),
            ["posts", _, "reactions"] | ["comments", _, "reactions"] => Some(Self::Reaction),
            _ => None,
        }
    }
}

/// Unauthenticated actions limited per client IP.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IpAction {
    Login,
    Signup,
}

impl IpAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Login => "login",
            Self::Signup => "signup",
        }
    }

    pub fn classify(method: &str, path: &str) -> Option<Self> {
        match (method, path) {
            ("POST", "/v1/auth/login") => Some(Self::Login),
            ("POST", "/v1/auth/signup") => Some(Self::Signup),
            _ => None,
        }
    }

    pub fn window(&self) -> RateWindow {
        match self {
            Self::Login => RateWindow::Hour,
            Self::Signup => RateWindow::Day,
        }
    }
}

impl RateLimits {
    pub fn for_write(&self, action: WriteAction) -> u32 {
        match action {
            WriteAction::Post => self.posts_per_hour,
            WriteAction::Comment => self.comments_per_hour,
            WriteAction::Reaction => self.reactions_per_hour,
        }
    }

    pub fn for_ip(&self, action: IpAction) -> u32 {
        match action {
            IpAction::Login => self.logins_per_ip_per_hour,
            IpAction::Signup => self.signups_per_ip_per_day,
        }
    }
}

/// Time window for rate limiting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateWindow {
    Hour,
    Day,
}

impl RateWindow {
    pub fn seconds(&self) -> u64 {
        match self {
            RateWindow::Hour => 3600,
            RateWindow::Day => 86400,
        }
    }
}

/// Index of the fixed window containing the current time.
pub fn current_window(window_seconds: u64) -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or(0);
    now / window_seconds
}
