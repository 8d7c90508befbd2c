//! Column mapping shared by the post and comment queries.

use anyhow::{anyhow, Result};
use sqlx::postgres::PgRow;
use sqlx::Row;
use uuid::Uuid;

use crate::domain::profile::ProfileSummary;
use crate::domain::reaction::ReactionKind;

/// Author columns as selected by the view queries: `LEFT JOIN profiles`
/// aliased to `author_id`, `author_username`, `author_avatar_url`.
pub(crate) const AUTHOR_COLUMNS: &str =
    "pr.id AS author_id, pr.username AS author_username, pr.avatar_url AS author_avatar_url";

pub(crate) fn author_from_row(row: &PgRow) -> Option<ProfileSummary> {
    let id: Option<Uuid> = row.get("author_id");
    id.map(|id| ProfileSummary {
        id,
        username: row.get("author_username"),
        avatar_url: row.get("author_avatar_url"),
    })
}

pub(crate) fn viewer_reaction_from_row(row: &PgRow) -> Result<Option<ReactionKind>> {
    let value: Option<String> = row.get("viewer_reaction");
    value
        .map(|value| {
            ReactionKind::from_db(&value).ok_or_else(|| anyhow!("unknown reaction type: {}", value))
        })
        .transpose()
}
