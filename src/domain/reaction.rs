use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReactionKind {
    Like,
    Dislike,
}

impl ReactionKind {
    pub fn from_db(value: &str) -> Option<Self> {
        match value {
            "like" => Some(Self::Like),
            "dislike" => Some(Self::Dislike),
            _ => None,
        }
    }

    pub fn as_db(&self) -> &'static str {
        match self {
            Self::Like => "like",
            Self::Dislike => "dislike",
        }
    }
}

/// What a reaction points at. Exactly one of the two columns is set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(into = "TargetColumns")]
pub enum ReactionTarget {
    Post(Uuid),
    Comment(Uuid),
}

#[derive(Serialize)]
struct TargetColumns {
    post_id: Option<Uuid>,
    comment_id: Option<Uuid>,
}

impl From<ReactionTarget> for TargetColumns {
    fn from(target: ReactionTarget) -> Self {
        Self {
            post_id: target.post_id(),
            comment_id: target.comment_id(),
        }
    }
}

impl ReactionTarget {
    pub fn from_columns(post_id: Option<Uuid>, comment_id: Option<Uuid>) -> Result<Self> {
        match (post_id, comment_id) {
            (Some(post_id), None) => Ok(Self::Post(post_id)),
            (None, Some(comment_id)) => Ok(Self::Comment(comment_id)),
            (Some(_), Some(_)) => Err(anyhow!("reaction targets both a post and a comment")),
            (None, None) => Err(anyhow!("reaction has no target")),
        }
    }

    pub fn post_id(&self) -> Option<Uuid> {
        match self {
            Self::Post(id) => Some(*id),
            Self::Comment(_) => None,
        }
    }

    pub fn comment_id(&self) -> Option<Uuid> {
        match self {
            Self::Post(_) => None,
            Self::Comment(id) => Some(*id),
        }
    }

    pub fn id(&self) -> Uuid {
        match self {
            Self::Post(id) | Self::Comment(id) => *id,
        }
    }

    /// Column holding this target's id in `reactions`.
    pub fn column(&self) -> &'static str {
        match self {
            Self::Post(_) => "post_id",
            Self::Comment(_) => "comment_id",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Reaction {
    pub id: Uuid,
    pub user_id: Uuid,
    #[serde(flatten)]
    pub target: ReactionTarget,
    #[serde(rename = "type")]
    pub kind: ReactionKind,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// One user's standing on one target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReactionState {
    None,
    Liked,
    Disliked,
}

impl ReactionState {
    pub fn from_kind(kind: Option<ReactionKind>) -> Self {
        match kind {
            None => Self::None,
            Some(ReactionKind::Like) => Self::Liked,
            Some(ReactionKind::Dislike) => Self::Disliked,
        }
    }

    pub fn kind(&self) -> Option<ReactionKind> {
        match self {
            Self::None => None,
            Self::Liked => Some(ReactionKind::Like),
            Self::Disliked => Some(ReactionKind::Dislike),
        }
    }

    /// Pressing the held reaction retracts it; pressing the other one swaps.
    pub fn press(self, pressed: ReactionKind) -> Self {
        match self.kind() {
            Some(held) if held == pressed => Self::None,
            _ => Self::from_kind(Some(pressed)),
        }
    }
}

/// The row a user currently holds on a target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExistingReaction {
    pub id: Uuid,
    pub kind: ReactionKind,
}

/// The single write a press turns into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleWrite {
    Insert(ReactionKind),
    Delete { id: Uuid },
    Update { id: Uuid, kind: ReactionKind },
}

impl ToggleWrite {
    pub fn resulting_state(&self) -> ReactionState {
        match self {
            Self::Insert(kind) | Self::Update { kind, .. } => ReactionState::from_kind(Some(*kind)),
            Self::Delete { .. } => ReactionState::None,
        }
    }
}

pub fn plan_toggle(existing: Option<ExistingReaction>, pressed: ReactionKind) -> ToggleWrite {
    match existing {
        None => ToggleWrite::Insert(pressed),
        Some(existing) if existing.kind == pressed => ToggleWrite::Delete { id: existing.id },
        Some(existing) => ToggleWrite::Update {
            id: existing.id,
            kind: pressed,
        },
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ToggleOutcome {
    #[serde(flatten)]
    pub target: ReactionTarget,
    pub state: ReactionState,
    pub reaction: Option<ReactionKind>,
    pub reaction_count: i64,
}
