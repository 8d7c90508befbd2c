use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeTable {
    Posts,
    Comments,
    Reactions,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeOp {
    Insert,
    Update,
    Delete,
}

/// Identifying columns of the changed row. Which ones are present depends on
/// the table; unknown columns are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangedRow {
    pub id: Uuid,
    #[serde(default)]
    pub user_id: Option<Uuid>,
    #[serde(default)]
    pub post_id: Option<Uuid>,
    #[serde(default)]
    pub parent_comment_id: Option<Uuid>,
    #[serde(default)]
    pub comment_id: Option<Uuid>,
}

/// A row change announced by the database triggers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub table: ChangeTable,
    pub op: ChangeOp,
    pub row: ChangedRow,
}

impl ChangeEvent {
    pub fn from_payload(payload: &str) -> serde_json::Result<Self> {
        serde_json::from_str(payload)
    }
}

/// The collection a live view watches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeFilter {
    AllPosts,
    UserPosts(Uuid),
    PostComments(Uuid),
    Replies(Uuid),
}

impl ChangeFilter {
    /// Whether `event` can alter the watched collection.
    ///
    /// Reaction changes only carry their target id, so every reaction on the
    /// watched kind of record counts. Any reply counts for a post's comments
    /// too, since it moves a top-level comment's `reply_count`.
    pub fn matches(&self, event: &ChangeEvent) -> bool {
        let row = &event.row;
        match (self, event.table) {
            (Self::AllPosts, ChangeTable::Posts) => true,
            (Self::UserPosts(user_id), ChangeTable::Posts) => row.user_id == Some(*user_id),
            (Self::AllPosts | Self::UserPosts(_), ChangeTable::Reactions) => row.post_id.is_some(),
            (Self::PostComments(post_id), ChangeTable::Comments) => {
                row.post_id == Some(*post_id) || row.parent_comment_id.is_some()
            }
            (Self::Replies(parent_id), ChangeTable::Comments) => {
                row.parent_comment_id == Some(*parent_id)
            }
            (Self::PostComments(_) | Self::Replies(_), ChangeTable::Reactions) => {
                row.comment_id.is_some()
            }
            (Self::PostComments(post_id), ChangeTable::Posts) => row.id == *post_id,
            (Self::AllPosts | Self::UserPosts(_), ChangeTable::Comments) => false,
            (Self::Replies(_), ChangeTable::Posts) => false,
        }
    }
}
