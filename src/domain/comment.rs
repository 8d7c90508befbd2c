use std::collections::{HashMap, HashSet};

use anyhow::{anyhow, Result};
use serde::Serialize;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::domain::profile::{author_name, ProfileSummary};
use crate::domain::reaction::ReactionKind;

/// Where a comment hangs. Top-level comments belong to a post, replies to
/// another comment; never both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(into = "ParentColumns")]
pub enum CommentParent {
    Post(Uuid),
    Comment(Uuid),
}

#[derive(Serialize)]
struct ParentColumns {
    post_id: Option<Uuid>,
    parent_comment_id: Option<Uuid>,
}

impl From<CommentParent> for ParentColumns {
    fn from(parent: CommentParent) -> Self {
        Self {
            post_id: parent.post_id(),
            parent_comment_id: parent.parent_comment_id(),
        }
    }
}

impl CommentParent {
    pub fn from_columns(post_id: Option<Uuid>, parent_comment_id: Option<Uuid>) -> Result<Self> {
        match (post_id, parent_comment_id) {
            (Some(post_id), None) => Ok(Self::Post(post_id)),
            (None, Some(parent_id)) => Ok(Self::Comment(parent_id)),
            (Some(_), Some(_)) => Err(anyhow!("comment has both a post and a parent comment")),
            (None, None) => Err(anyhow!("comment has neither a post nor a parent comment")),
        }
    }

    pub fn post_id(&self) -> Option<Uuid> {
        match self {
            Self::Post(id) => Some(*id),
            Self::Comment(_) => None,
        }
    }

    pub fn parent_comment_id(&self) -> Option<Uuid> {
        match self {
            Self::Post(_) => None,
            Self::Comment(id) => Some(*id),
        }
    }

    pub fn is_top_level(&self) -> bool {
        matches!(self, Self::Post(_))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Comment {
    pub id: Uuid,
    #[serde(flatten)]
    pub parent: CommentParent,
    pub user_id: Uuid,
    pub content: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize)]
pub struct CommentView {
    #[serde(flatten)]
    pub comment: Comment,
    pub author: Option<ProfileSummary>,
    pub author_name: String,
    pub reaction_count: i64,
    pub viewer_reaction: Option<ReactionKind>,
    pub reply_count: i64,
    pub can_delete: bool,
}

impl CommentView {
    pub fn new(
        comment: Comment,
        author: Option<ProfileSummary>,
        reaction_count: i64,
        viewer_reaction: Option<ReactionKind>,
        reply_count: i64,
        viewer_id: Option<Uuid>,
    ) -> Self {
        let can_delete = crate::domain::ownership::can_delete(viewer_id, comment.user_id);
        let author_name = author_name(author.as_ref());
        Self {
            comment,
            author,
            author_name,
            reaction_count,
            viewer_reaction,
            reply_count,
            can_delete,
        }
    }
}

/// Replies under a top-level comment are only carried once asked for.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "state", content = "items", rename_all = "lowercase")]
pub enum Replies {
    Collapsed,
    Expanded(Vec<CommentView>),
}

#[derive(Debug, Clone, Serialize)]
pub struct CommentNode {
    #[serde(flatten)]
    pub view: CommentView,
    pub replies: Replies,
}

/// Builds the two-level thread of a post.
///
/// `top_level` and `replies` arrive oldest-first; that order is kept. Replies
/// whose parent is not both present and in `expanded` are dropped.
pub fn assemble_thread(
    top_level: Vec<CommentView>,
    replies: Vec<CommentView>,
    expanded: &HashSet<Uuid>,
) -> Vec<CommentNode> {
    let mut by_parent: HashMap<Uuid, Vec<CommentView>> = HashMap::new();
    for reply in replies {
        if let Some(parent_id) = reply.comment.parent.parent_comment_id() {
            if expanded.contains(&parent_id) {
                by_parent.entry(parent_id).or_default().push(reply);
            }
        }
    }

    top_level
        .into_iter()
        .map(|view| {
            let replies = if expanded.contains(&view.comment.id) {
                Replies::Expanded(by_parent.remove(&view.comment.id).unwrap_or_default())
            } else {
                Replies::Collapsed
            };
            CommentNode { view, replies }
        })
        .collect()
}

/// Parses the `expand` query value: comma-separated comment ids.
pub fn parse_expanded(raw: Option<&str>) -> Result<HashSet<Uuid>> {
    let Some(raw) = raw else {
        return Ok(HashSet::new());
    };

    raw.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| Uuid::parse_str(part).map_err(|_| anyhow!("invalid comment id: {}", part)))
        .collect()
}
