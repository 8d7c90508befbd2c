use anyhow::Result;
use sqlx::Row;
use uuid::Uuid;

use crate::domain::profile::Profile;
use crate::infra::db::Db;

#[derive(Clone)]
pub struct ProfileService {
    db: Db,
}

impl ProfileService {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    pub async fn get_profile(&self, user_id: Uuid) -> Result<Option<Profile>> {
        let row = sqlx::query(
            "SELECT id, username, avatar_url, created_at, updated_at \
             FROM profiles WHERE id = $1",
        )
        .bind(user_id)
        .fetch_optional(self.db.pool())
        .await?;

        let profile = row.map(|row| Profile {
            id: row.get("id"),
            username: row.get("username"),
            avatar_url: row.get("avatar_url"),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
        });

        Ok(profile)
    }
}
