use anyhow::Result;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use crate::domain::author::Author;
use crate::domain::now_utc;
use crate::infra::db::Db;

#[derive(Clone)]
pub struct AuthorService {
    db: Db,
}

impl AuthorService {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    pub async fn create(&self, username: &str, email: &str) -> Result<Author> {
        let row = sqlx::query(
            "INSERT INTO authors (username, email, created_at) VALUES (?1, ?2, ?3) \
             RETURNING id, username, email, created_at",
        )
        .bind(username)
        .bind(email)
        .bind(now_utc())
        .fetch_one(self.db.pool())
        .await?;

        tracing::info!(username, "author created");

        author_from_row(&row)
    }

    pub async fn get(&self, author_id: i64) -> Result<Option<Author>> {
        let row = sqlx::query("SELECT id, username, email, created_at FROM authors WHERE id = ?1")
            .bind(author_id)
            .fetch_optional(self.db.pool())
            .await?;

        row.as_ref().map(author_from_row).transpose()
    }

    pub async fn username_taken(&self, username: &str) -> Result<bool> {
        let taken: i64 =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM authors WHERE username = ?1)")
                .bind(username)
                .fetch_one(self.db.pool())
                .await?;

        Ok(taken != 0)
    }
}

fn author_from_row(row: &SqliteRow) -> Result<Author> {
    Ok(Author {
        id: row.try_get("id")?,
        username: row.try_get("username")?,
        email: row.try_get("email")?,
        created_at: row.try_get("created_at")?,
    })
}
