use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::domain::profile::{author_name, ProfileSummary};
use crate::domain::reaction::ReactionKind;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub id: Uuid,
    pub user_id: Uuid,
    pub content: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// A post as one viewer sees it.
#[derive(Debug, Clone, Serialize)]
pub struct PostView {
    #[serde(flatten)]
    pub post: Post,
    pub author: Option<ProfileSummary>,
    pub author_name: String,
    pub reaction_count: i64,
    pub viewer_reaction: Option<ReactionKind>,
    pub can_delete: bool,
}

impl PostView {
    pub fn new(
        post: Post,
        author: Option<ProfileSummary>,
        reaction_count: i64,
        viewer_reaction: Option<ReactionKind>,
        viewer_id: Option<Uuid>,
    ) -> Self {
        let can_delete = crate::domain::ownership::can_delete(viewer_id, post.user_id);
        let author_name = author_name(author.as_ref());
        Self {
            post,
            author,
            author_name,
            reaction_count,
            viewer_reaction,
            can_delete,
        }
    }
}
