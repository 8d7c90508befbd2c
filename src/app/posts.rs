use anyhow::{anyhow, Result};
use sqlx::postgres::PgRow;
use sqlx::Row;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::app::rows::{author_from_row, viewer_reaction_from_row, AUTHOR_COLUMNS};
use crate::domain::ownership::DeleteOutcome;
use crate::domain::post::{Post, PostView};
use crate::infra::db::Db;

#[derive(Clone)]
pub struct PostService {
    db: Db,
}

/// Every post query binds the viewer (possibly NULL) as `$1`.
fn post_view_sql(tail: &str) -> String {
    format!(
        "SELECT p.id, p.user_id, p.content, p.created_at, p.updated_at, {}, \
                (SELECT COUNT(*) FROM reactions r WHERE r.post_id = p.id) AS reaction_count, \
                (SELECT r.type FROM reactions r \
                 WHERE r.post_id = p.id AND r.user_id = $1 \
                 ORDER BY r.created_at DESC LIMIT 1) AS viewer_reaction \
         FROM posts p \
         LEFT JOIN profiles pr ON pr.id = p.user_id \
         {}",
        AUTHOR_COLUMNS, tail
    )
}

fn post_view_from_row(row: &PgRow, viewer_id: Option<Uuid>) -> Result<PostView> {
    let post = Post {
        id: row.get("id"),
        user_id: row.get("user_id"),
        content: row.get("content"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    };
    Ok(PostView::new(
        post,
        author_from_row(row),
        row.get("reaction_count"),
        viewer_reaction_from_row(row)?,
        viewer_id,
    ))
}

impl PostService {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    pub async fn create_post(&self, user_id: Uuid, content: String) -> Result<PostView> {
        let post_id: Uuid = sqlx::query_scalar(
            "INSERT INTO posts (user_id, content) VALUES ($1, $2) RETURNING id",
        )
        .bind(user_id)
        .bind(content)
        .fetch_one(self.db.pool())
        .await?;

        self.get_post(post_id, Some(user_id))
            .await?
            .ok_or_else(|| anyhow!("post {} vanished after insert", post_id))
    }

    pub async fn exists(&self, post_id: Uuid) -> Result<bool> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM posts WHERE id = $1)")
            .bind(post_id)
            .fetch_one(self.db.pool())
            .await?;
        Ok(exists)
    }

    pub async fn get_post(&self, post_id: Uuid, viewer_id: Option<Uuid>) -> Result<Option<PostView>> {
        let sql = post_view_sql("WHERE p.id = $2");
        let row = sqlx::query(&sql)
            .bind(viewer_id)
            .bind(post_id)
            .fetch_optional(self.db.pool())
            .await?;

        row.map(|row| post_view_from_row(&row, viewer_id)).transpose()
    }

    /// The top-level feed, newest first.
    pub async fn list_feed(
        &self,
        viewer_id: Option<Uuid>,
        cursor: Option<(OffsetDateTime, Uuid)>,
        limit: i64,
    ) -> Result<Vec<PostView>> {
        let rows = match cursor {
            Some((created_at, post_id)) => {
                let sql = post_view_sql(
                    "WHERE (p.created_at < $2 OR (p.created_at = $2 AND p.id < $3)) \
                     ORDER BY p.created_at DESC, p.id DESC \
                     LIMIT $4",
                );
                sqlx::query(&sql)
                    .bind(viewer_id)
                    .bind(created_at)
                    .bind(post_id)
                    .bind(limit)
                    .fetch_all(self.db.pool())
                    .await?
            }
            None => {
                let sql = post_view_sql("ORDER BY p.created_at DESC, p.id DESC LIMIT $2");
                sqlx::query(&sql)
                    .bind(viewer_id)
                    .bind(limit)
                    .fetch_all(self.db.pool())
                    .await?
            }
        };

        rows.iter()
            .map(|row| post_view_from_row(row, viewer_id))
            .collect()
    }

    /// One author's posts, newest first.
    pub async fn list_by_user(
        &self,
        user_id: Uuid,
        viewer_id: Option<Uuid>,
        cursor: Option<(OffsetDateTime, Uuid)>,
        limit: i64,
    ) -> Result<Vec<PostView>> {
        let rows = match cursor {
            Some((created_at, post_id)) => {
                let sql = post_view_sql(
                    "WHERE p.user_id = $2 \
                       AND (p.created_at < $3 OR (p.created_at = $3 AND p.id < $4)) \
                     ORDER BY p.created_at DESC, p.id DESC \
                     LIMIT $5",
                );
                sqlx::query(&sql)
                    .bind(viewer_id)
                    .bind(user_id)
                    .bind(created_at)
                    .bind(post_id)
                    .bind(limit)
                    .fetch_all(self.db.pool())
                    .await?
            }
            None => {
                let sql = post_view_sql(
                    "WHERE p.user_id = $2 \
                     ORDER BY p.created_at DESC, p.id DESC \
                     LIMIT $3",
                );
                sqlx::query(&sql)
                    .bind(viewer_id)
                    .bind(user_id)
                    .bind(limit)
                    .fetch_all(self.db.pool())
                    .await?
            }
        };

        rows.iter()
            .map(|row| post_view_from_row(row, viewer_id))
            .collect()
    }

    pub async fn delete_post(&self, post_id: Uuid, user_id: Uuid) -> Result<DeleteOutcome> {
        let owner: Option<Uuid> = sqlx::query_scalar("SELECT user_id FROM posts WHERE id = $1")
            .bind(post_id)
            .fetch_optional(self.db.pool())
            .await?;

        if let Some(outcome) = DeleteOutcome::precheck(owner, user_id) {
            return Ok(outcome);
        }

        let result = sqlx::query("DELETE FROM posts WHERE id = $1 AND user_id = $2")
            .bind(post_id)
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
