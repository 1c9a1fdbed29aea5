use anyhow::Result;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use crate::domain::comment::Comment;
use crate::domain::now_utc;
use crate::infra::db::Db;

#[derive(Debug, Clone)]
pub struct NewComment {
    pub name: String,
    pub email: String,
    pub body: String,
}

#[derive(Clone)]
pub struct CommentService {
    db: Db,
}

impl CommentService {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    pub async fn create(&self, post_id: i64, new_comment: NewComment) -> Result<Comment> {
        let now = now_utc();
        let row = sqlx::query(
            "INSERT INTO comments (post_id, name, email, body, active, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, 1, ?5, ?5) \
             RETURNING id, post_id, name, email, body, active, created_at, updated_at",
        )
        .bind(post_id)
        .bind(&new_comment.name)
        .bind(&new_comment.email)
        .bind(&new_comment.body)
        .bind(now)
        .fetch_one(self.db.pool())
        .await?;

        comment_from_row(&row)
    }

    /// Active comments of a post, oldest first.
    pub async fn list_active(&self, post_id: i64) -> Result<Vec<Comment>> {
        let rows = sqlx::query(
            "SELECT id, post_id, name, email, body, active, created_at, updated_at \
             FROM comments \
             WHERE post_id = ?1 AND active = 1 \
             ORDER BY created_at ASC, id ASC",
        )
        .bind(post_id)
        .fetch_all(self.db.pool())
        .await?;

        rows.iter().map(comment_from_row).collect()
    }

    pub async fn count_for_post(&self, post_id: i64) -> Result<i64> {
        let count = sqlx::query_scalar("SELECT COUNT(*) FROM comments WHERE post_id = ?1")
            .bind(post_id)
            .fetch_one(self.db.pool())
            .await?;

        Ok(count)
    }
}

fn comment_from_row(row: &SqliteRow) -> Result<Comment> {
    Ok(Comment {
        id: row.try_get("id")?,
        post_id: row.try_get("post_id")?,
        name: row.try_get("name")?,
        email: row.try_get("email")?,
        body: row.try_get("body")?,
        active: row.try_get("active")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}
