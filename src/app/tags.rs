use anyhow::{anyhow, Result};
use sqlx::{Row, Sqlite, Transaction};
use std::collections::HashMap;

use crate::app::slug::slugify;
use crate::domain::tag::Tag;
use crate::infra::db::Db;

#[derive(Clone)]
pub struct TagService {
    db: Db,
}

impl TagService {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    pub async fn find_by_slug(&self, slug: &str) -> Result<Option<Tag>> {
        let row = sqlx::query("SELECT id, name, slug FROM tags WHERE slug = ?1")
            .bind(slug)
            .fetch_optional(self.db.pool())
            .await?;

        Ok(row.map(|row| Tag {
            id: row.get("id"),
            name: row.get("name"),
            slug: row.get("slug"),
        }))
    }

    /// Loads the tags of every post in `post_ids`, keyed by post id and
    /// ordered by tag name.
    pub async fn tags_for_posts(&self, post_ids: &[i64]) -> Result<HashMap<i64, Vec<Tag>>> {
        let mut tags: HashMap<i64, Vec<Tag>> = HashMap::new();
        if post_ids.is_empty() {
            return Ok(tags);
        }

        let placeholders = vec!["?"; post_ids.len()].join(", ");
        let sql = format!(
            "SELECT pt.post_id, t.id, t.name, t.slug \
             FROM post_tags pt \
             JOIN tags t ON t.id = pt.tag_id \
             WHERE pt.post_id IN ({}) \
             ORDER BY t.name ASC",
            placeholders
        );
        let mut query = sqlx::query(&sql);
        for id in post_ids {
            query = query.bind(*id);
        }
        let rows = query.fetch_all(self.db.pool()).await?;

        for row in rows {
            tags.entry(row.get("post_id")).or_default().push(Tag {
                id: row.get("id"),
                name: row.get("name"),
                slug: row.get("slug"),
            });
        }

        Ok(tags)
    }

    /// Replaces the tag set of a post inside the caller's transaction,
    /// creating tags that do not exist yet.
    pub async fn set_post_tags(
        tx: &mut Transaction<'_, Sqlite>,
        post_id: i64,
        names: &[String],
    ) -> Result<()> {
        sqlx::query("DELETE FROM post_tags WHERE post_id = ?1")
            .bind(post_id)
            .execute(&mut **tx)
            .await?;

        for name in names {
            let name = name.trim();
            if name.is_empty() {
                continue;
            }
            let slug = slugify(name);
            if slug.is_empty() {
                return Err(anyhow!("tag {:?} has no usable slug", name));
            }

            sqlx::query("INSERT INTO tags (name, slug) VALUES (?1, ?2) ON CONFLICT DO NOTHING")
                .bind(name)
                .bind(&slug)
                .execute(&mut **tx)
                .await?;

            let tag_id: i64 =
                sqlx::query_scalar("SELECT id FROM tags WHERE name = ?1 OR slug = ?2 LIMIT 1")
                    .bind(name)
                    .bind(&slug)
                    .fetch_one(&mut **tx)
                    .await?;

            sqlx::query(
                "INSERT INTO post_tags (post_id, tag_id) VALUES (?1, ?2) ON CONFLICT DO NOTHING",
            )
            .bind(post_id)
            .bind(tag_id)
            .execute(&mut **tx)
            .await?;
        }

        Ok(())
    }
}
