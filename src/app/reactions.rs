use anyhow::{anyhow, Result};
use sqlx::Row;
use uuid::Uuid;

use crate::domain::reaction::{
    plan_toggle, ExistingReaction, Reaction, ReactionKind, ReactionTarget, ToggleOutcome,
    ToggleWrite,
};
use crate::infra::db::Db;

#[derive(Clone)]
pub struct ReactionService {
    db: Db,
}

impl ReactionService {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    pub async fn target_exists(&self, target: ReactionTarget) -> Result<bool> {
        let sql = match target {
            ReactionTarget::Post(_) => "SELECT EXISTS(SELECT 1 FROM posts WHERE id = $1)",
            ReactionTarget::Comment(_) => "SELECT EXISTS(SELECT 1 FROM comments WHERE id = $1)",
        };
        let exists: bool = sqlx::query_scalar(sql)
            .bind(target.id())
            .fetch_one(self.db.pool())
            .await?;
        Ok(exists)
    }

    /// The reaction `user_id` currently holds on `target`, newest first if a
    /// race ever left more than one.
    pub async fn find_existing(
        &self,
        user_id: Uuid,
        target: ReactionTarget,
    ) -> Result<Option<ExistingReaction>> {
        let sql = format!(
            "SELECT id, type FROM reactions \
             WHERE {} = $1 AND user_id = $2 \
             ORDER BY created_at DESC LIMIT 1",
            target.column()
        );
        let row = sqlx::query(&sql)
            .bind(target.id())
            .bind(user_id)
            .fetch_optional(self.db.pool())
            .await?;

        row.map(|row| {
            let kind: String = row.get("type");
            let kind = ReactionKind::from_db(&kind)
                .ok_or_else(|| anyhow!("unknown reaction type: {}", kind))?;
            Ok(ExistingReaction {
                id: row.get("id"),
                kind,
            })
        })
        .transpose()
    }

    /// Applies one press of `pressed` by `user_id` on `target`.
    ///
    /// Lookup and write are separate statements with no lock between them;
    /// two concurrent presses by the same user resolve last-write-wins.
    /// Returns `None` when the target does not exist.
    pub async fn toggle(
        &self,
        user_id: Uuid,
        target: ReactionTarget,
        pressed: ReactionKind,
    ) -> Result<Option<ToggleOutcome>> {
        if !self.target_exists(target).await? {
            return Ok(None);
        }

        let existing = self.find_existing(user_id, target).await?;
        let write = plan_toggle(existing, pressed);

        match write {
            ToggleWrite::Insert(kind) => {
                sqlx::query(
                    "INSERT INTO reactions (user_id, post_id, comment_id, type) \
                     VALUES ($1, $2, $3, $4)",
                )
                .bind(user_id)
                .bind(target.post_id())
                .bind(target.comment_id())
                .bind(kind.as_db())
                .execute(self.db.pool())
                .await?;
            }
            ToggleWrite::Delete { id } => {
                sqlx::query("DELETE FROM reactions WHERE id = $1")
                    .bind(id)
                    .execute(self.db.pool())
                    .await?;
            }
            ToggleWrite::Update { id, kind } => {
                sqlx::query("UPDATE reactions SET type = $2 WHERE id = $1")
                    .bind(id)
                    .bind(kind.as_db())
                    .execute(self.db.pool())
                    .await?;
            }
        }

        let state = write.resulting_state();
        tracing::debug!(user_id = %user_id, target = ?target, state = ?state, "reaction toggled");

        Ok(Some(ToggleOutcome {
            target,
            state,
            reaction: state.kind(),
            reaction_count: self.count(target).await?,
        }))
    }

    pub async fn count(&self, target: ReactionTarget) -> Result<i64> {
        let sql = format!("SELECT COUNT(*) FROM reactions WHERE {} = $1", target.column());
        let count: i64 = sqlx::query_scalar(&sql)
            .bind(target.id())
            .fetch_one(self.db.pool())
            .await?;
        Ok(count)
    }

    pub async fn list_for_user(&self, user_id: Uuid, target: ReactionTarget) -> Result<Vec<Reaction>> {
        let sql = format!(
            "SELECT id, user_id, post_id, comment_id, type, created_at \
             FROM reactions WHERE {} = $1 AND user_id = $2 \
             ORDER BY created_at ASC",
            target.column()
        );
        let rows = sqlx::query(&sql)
            .bind(target.id())
            .bind(user_id)
            .fetch_all(self.db.pool())
            .await?;

        rows.iter()
            .map(|row| {
                let kind: String = row.get("type");
                Ok(Reaction {
                    id: row.get("id"),
                    user_id: row.get("user_id"),
                    target: ReactionTarget::from_columns(row.get("post_id"), row.get("comment_id"))?,
                    kind: ReactionKind::from_db(&kind)
                        .ok_or_else(|| anyhow!("unknown reaction type: {}", kind))?,
                    created_at: row.get("created_at"),
                })
            })
            .collect()
    }
}
