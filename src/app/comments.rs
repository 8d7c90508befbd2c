use std::collections::HashSet;

use anyhow::{anyhow, Result};
use sqlx::postgres::PgRow;
use sqlx::Row;
use uuid::Uuid;

use crate::app::rows::{author_from_row, viewer_reaction_from_row, AUTHOR_COLUMNS};
use crate::domain::comment::{assemble_thread, Comment, CommentNode, CommentParent, CommentView};
use crate::domain::ownership::DeleteOutcome;
use crate::infra::db::Db;

#[derive(Clone)]
pub struct CommentService {
    db: Db,
}

/// Every comment query binds the viewer (possibly NULL) as `$1`.
fn comment_view_sql(tail: &str) -> String {
    format!(
        "SELECT c.id, c.post_id, c.parent_comment_id, c.user_id, c.content, \
                c.created_at, c.updated_at, {}, \
                (SELECT COUNT(*) FROM reactions r WHERE r.comment_id = c.id) AS reaction_count, \
                (SELECT r.type FROM reactions r \
                 WHERE r.comment_id = c.id AND r.user_id = $1 \
                 ORDER BY r.created_at DESC LIMIT 1) AS viewer_reaction, \
                (SELECT COUNT(*) FROM comments rc WHERE rc.parent_comment_id = c.id) AS reply_count \
         FROM comments c \
         LEFT JOIN profiles pr ON pr.id = c.user_id \
         {}",
        AUTHOR_COLUMNS, tail
    )
}

fn comment_view_from_row(row: &PgRow, viewer_id: Option<Uuid>) -> Result<CommentView> {
    let parent = CommentParent::from_columns(row.get("post_id"), row.get("parent_comment_id"))?;
    let comment = Comment {
        id: row.get("id"),
        parent,
        user_id: row.get("user_id"),
        content: row.get("content"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    };
    Ok(CommentView::new(
        comment,
        author_from_row(row),
        row.get("reaction_count"),
        viewer_reaction_from_row(row)?,
        row.get("reply_count"),
        viewer_id,
    ))
}

impl CommentService {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    /// Returns `None` when the post or parent comment does not exist.
    pub async fn create_comment(
        &self,
        user_id: Uuid,
        parent: CommentParent,
        content: String,
    ) -> Result<Option<CommentView>> {
        let parent_exists: bool = match parent {
            CommentParent::Post(post_id) => {
                sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM posts WHERE id = $1)")
                    .bind(post_id)
                    .fetch_one(self.db.pool())
                    .await?
            }
            CommentParent::Comment(comment_id) => {
                sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM comments WHERE id = $1)")
                    .bind(comment_id)
                    .fetch_one(self.db.pool())
                    .await?
            }
        };
        if !parent_exists {
            return Ok(None);
        }

        let comment_id: Uuid = sqlx::query_scalar(
            "INSERT INTO comments (post_id, parent_comment_id, user_id, content) \
             VALUES ($1, $2, $3, $4) RETURNING id",
        )
        .bind(parent.post_id())
        .bind(parent.parent_comment_id())
        .bind(user_id)
        .bind(content)
        .fetch_one(self.db.pool())
        .await?;

        let view = self
            .get_comment(comment_id, Some(user_id))
            .await?
            .ok_or_else(|| anyhow!("comment {} vanished after insert", comment_id))?;
        Ok(Some(view))
    }

    pub async fn exists(&self, comment_id: Uuid) -> Result<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM comments WHERE id = $1)")
                .bind(comment_id)
                .fetch_one(self.db.pool())
                .await?;
        Ok(exists)
    }

    pub async fn get_comment(
        &self,
        comment_id: Uuid,
        viewer_id: Option<Uuid>,
    ) -> Result<Option<CommentView>> {
        let sql = comment_view_sql("WHERE c.id = $2");
        let row = sqlx::query(&sql)
            .bind(viewer_id)
            .bind(comment_id)
            .fetch_optional(self.db.pool())
            .await?;

        row.map(|row| comment_view_from_row(&row, viewer_id))
            .transpose()
    }

    /// Comments attached directly to a post, oldest first.
    pub async fn list_top_level(
        &self,
        post_id: Uuid,
        viewer_id: Option<Uuid>,
    ) -> Result<Vec<CommentView>> {
        let sql = comment_view_sql(
            "WHERE c.post_id = $2 AND c.parent_comment_id IS NULL \
             ORDER BY c.created_at ASC",
        );
        let rows = sqlx::query(&sql)
            .bind(viewer_id)
            .bind(post_id)
            .fetch_all(self.db.pool())
            .await?;

        rows.iter()
            .map(|row| comment_view_from_row(row, viewer_id))
            .collect()
    }

    /// Direct replies to one comment, oldest first.
    pub async fn list_replies(
        &self,
        comment_id: Uuid,
        viewer_id: Option<Uuid>,
    ) -> Result<Vec<CommentView>> {
        self.list_replies_of(&[comment_id], viewer_id).await
    }

    async fn list_replies_of(
        &self,
        parent_ids: &[Uuid],
        viewer_id: Option<Uuid>,
    ) -> Result<Vec<CommentView>> {
        if parent_ids.is_empty() {
            return Ok(Vec::new());
        }

        let sql = comment_view_sql(
            "WHERE c.parent_comment_id = ANY($2) \
             ORDER BY c.created_at ASC",
        );
        let rows = sqlx::query(&sql)
            .bind(viewer_id)
            .bind(parent_ids)
            .fetch_all(self.db.pool())
            .await?;

        rows.iter()
            .map(|row| comment_view_from_row(row, viewer_id))
            .collect()
    }

    /// A post's top-level comments with the replies of `expanded` ones filled in.
    pub async fn thread(
        &self,
        post_id: Uuid,
        viewer_id: Option<Uuid>,
        expanded: &HashSet<Uuid>,
    ) -> Result<Vec<CommentNode>> {
        let top_level = self.list_top_level(post_id, viewer_id).await?;
        let wanted: Vec<Uuid> = top_level
            .iter()
            .map(|view| view.comment.id)
            .filter(|id| expanded.contains(id))
            .collect();
        let replies = self.list_replies_of(&wanted, viewer_id).await?;

        Ok(assemble_thread(top_level, replies, expanded))
    }

    pub async fn delete_comment(&self, comment_id: Uuid, user_id: Uuid) -> Result<DeleteOutcome> {
        let owner: Option<Uuid> =
            sqlx::query_scalar("SELECT user_id FROM comments WHERE id = $1")
                .bind(comment_id)
                .fetch_optional(self.db.pool())
                .await?;

        if let Some(outcome) = DeleteOutcome::precheck(owner, user_id) {
            return Ok(outcome);
        }

        let result = sqlx::query("DELETE FROM comments WHERE id = $1 AND user_id = $2")
            .bind(comment_id)
            .bind(user_id)
            .execute(self.db.pool())
            .await?;

        if result.rows_affected() > 0 {
            Ok(DeleteOutcome::Deleted)
        } else {
            Ok(DeleteOutcome::NotFound)
        }
    }
}
