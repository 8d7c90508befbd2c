use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

/// Shown wherever an author has no profile or no username yet.
pub const ANONYMOUS: &str = "Anonymous";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub id: Uuid,
    pub username: Option<String>,
    pub avatar_url: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// The slice of a profile joined onto posts and comments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileSummary {
    pub id: Uuid,
    pub username: Option<String>,
    pub avatar_url: Option<String>,
}

impl ProfileSummary {
    pub fn display_name(&self) -> &str {
        self.username.as_deref().unwrap_or(ANONYMOUS)
    }
}

pub fn author_name(author: Option<&ProfileSummary>) -> String {
    match author {
        Some(author) => author.display_name().to_string(),
        None => ANONYMOUS.to_string(),
    }
}
