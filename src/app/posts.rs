use anyhow::{anyhow, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use time::macros::format_description;
use time::{Date, OffsetDateTime};

use crate::app::tags::TagService;
use crate::domain::now_utc;
use crate::domain::post::{Post, PostStatus};
use crate::infra::db::Db;

const POST_SELECT: &str = "SELECT p.id, p.author_id, a.username AS author_username, \
            p.title, p.slug, p.body, p.publish, p.created_at, p.updated_at, p.status \
     FROM posts p \
     JOIN authors a ON a.id = p.author_id";

const HAS_TAG: &str = "EXISTS ( \
        SELECT 1 FROM post_tags pt \
        JOIN tags t ON t.id = pt.tag_id \
        WHERE pt.post_id = p.id AND t.slug = ?2 \
     )";

const DEFAULT_ORDER: &str = "ORDER BY p.publish DESC, p.id DESC";

#[derive(Debug, Clone)]
pub struct NewPost {
    pub author_id: i64,
    pub title: String,
    pub slug: String,
    pub body: String,
    pub status: PostStatus,
    pub publish: OffsetDateTime,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct PostChanges {
    pub title: Option<String>,
    pub slug: Option<String>,
    pub body: Option<String>,
    pub status: Option<PostStatus>,
    pub publish: Option<OffsetDateTime>,
    pub tags: Option<Vec<String>>,
}

#[derive(Clone)]
pub struct PostService {
    db: Db,
}

impl PostService {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    // ------------------------------------------------------------------
    // Published posts
    // ------------------------------------------------------------------

    pub async fn count_published(&self, tag_slug: Option<&str>) -> Result<i64> {
        let count = match tag_slug {
            Some(tag_slug) => {
                let sql = format!(
                    "SELECT COUNT(*) FROM posts p WHERE p.status = ?1 AND {}",
                    HAS_TAG
                );
                sqlx::query_scalar(&sql)
                    .bind(PostStatus::Published.as_db())
                    .bind(tag_slug)
                    .fetch_one(self.db.pool())
                    .await?
            }
            None => {
                sqlx::query_scalar("SELECT COUNT(*) FROM posts p WHERE p.status = ?1")
                    .bind(PostStatus::Published.as_db())
                    .fetch_one(self.db.pool())
                    .await?
            }
        };

        Ok(count)
    }

    /// One page of published posts, optionally narrowed to a tag slug.
    pub async fn list_published(
        &self,
        tag_slug: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Post>> {
        let rows = match tag_slug {
            Some(tag_slug) => {
                let sql = format!(
                    "{} WHERE p.status = ?1 AND {} {} LIMIT ?3 OFFSET ?4",
                    POST_SELECT, HAS_TAG, DEFAULT_ORDER
                );
                sqlx::query(&sql)
                    .bind(PostStatus::Published.as_db())
                    .bind(tag_slug)
                    .bind(limit)
                    .bind(offset)
                    .fetch_all(self.db.pool())
                    .await?
            }
            None => {
                let sql = format!(
                    "{} WHERE p.status = ?1 {} LIMIT ?2 OFFSET ?3",
                    POST_SELECT, DEFAULT_ORDER
                );
                sqlx::query(&sql)
                    .bind(PostStatus::Published.as_db())
                    .bind(limit)
                    .bind(offset)
                    .fetch_all(self.db.pool())
                    .await?
            }
        };

        self.hydrate(rows).await
    }

    pub async fn latest_published(&self, limit: i64) -> Result<Vec<Post>> {
        self.list_published(None, limit, 0).await
    }

    pub async fn all_published(&self) -> Result<Vec<Post>> {
        let sql = format!("{} WHERE p.status = ?1 {}", POST_SELECT, DEFAULT_ORDER);
        let rows = sqlx::query(&sql)
            .bind(PostStatus::Published.as_db())
            .fetch_all(self.db.pool())
            .await?;

        self.hydrate(rows).await
    }

    /// Looks up a published post by its UTC publish date and slug.
    pub async fn get_published_by_date(&self, date: Date, slug: &str) -> Result<Option<Post>> {
        let sql = format!(
            "{} WHERE p.publish_date = ?1 AND p.slug = ?2 AND p.status = ?3",
            POST_SELECT
        );
        let row = sqlx::query(&sql)
            .bind(format_date(date)?)
            .bind(slug)
            .bind(PostStatus::Published.as_db())
            .fetch_optional(self.db.pool())
            .await?;

        self.hydrate_one(row).await
    }

    pub async fn get_published(&self, post_id: i64) -> Result<Option<Post>> {
        let sql = format!("{} WHERE p.id = ?1 AND p.status = ?2", POST_SELECT);
        let row = sqlx::query(&sql)
            .bind(post_id)
            .bind(PostStatus::Published.as_db())
            .fetch_optional(self.db.pool())
            .await?;

        self.hydrate_one(row).await
    }

    /// Published posts whose title or body contains `term`, case-insensitively.
    pub async fn search_published(&self, term: &str) -> Result<Vec<Post>> {
        let pattern = format!("%{}%", escape_like_pattern(term));
        let sql = format!(
            "{} WHERE p.status = ?1 \
               AND (p.title LIKE ?2 ESCAPE '\\' OR p.body LIKE ?2 ESCAPE '\\') \
             {}",
            POST_SELECT, DEFAULT_ORDER
        );
        let rows = sqlx::query(&sql)
            .bind(PostStatus::Published.as_db())
            .bind(&pattern)
            .fetch_all(self.db.pool())
            .await?;

        self.hydrate(rows).await
    }

    /// Published posts sharing tags with `post_id`, most shared tags first.
    pub async fn similar_published(&self, post_id: i64, limit: i64) -> Result<Vec<Post>> {
        let sql = format!(
            "{} \
             JOIN post_tags spt ON spt.post_id = p.id \
             WHERE p.status = ?1 \
               AND p.id != ?2 \
               AND spt.tag_id IN (SELECT tag_id FROM post_tags WHERE post_id = ?2) \
             GROUP BY p.id \
             ORDER BY COUNT(spt.tag_id) DESC, p.publish DESC, p.id DESC \
             LIMIT ?3",
            POST_SELECT
        );
        let rows = sqlx::query(&sql)
            .bind(PostStatus::Published.as_db())
            .bind(post_id)
            .bind(limit)
            .fetch_all(self.db.pool())
            .await?;

        self.hydrate(rows).await
    }

    // ------------------------------------------------------------------
    // Authoring
    // ------------------------------------------------------------------

    pub async fn get(&self, post_id: i64) -> Result<Option<Post>> {
        let sql = format!("{} WHERE p.id = ?1", POST_SELECT);
        let row = sqlx::query(&sql)
            .bind(post_id)
            .fetch_optional(self.db.pool())
            .await?;

        self.hydrate_one(row).await
    }

    /// Whether another post already uses `slug` on the UTC date of `publish`.
    pub async fn slug_taken(
        &self,
        slug: &str,
        publish: OffsetDateTime,
        exclude_post_id: Option<i64>,
    ) -> Result<bool> {
        let taken: i64 = sqlx::query_scalar(
            "SELECT EXISTS( \
                SELECT 1 FROM posts \
                WHERE slug = ?1 AND publish_date = ?2 AND id != ?3 \
             )",
        )
        .bind(slug)
        .bind(publish_date(publish)?)
        .bind(exclude_post_id.unwrap_or(-1))
        .fetch_one(self.db.pool())
        .await?;

        Ok(taken != 0)
    }

    pub async fn create(&self, new_post: NewPost) -> Result<Post> {
        let now = now_utc();
        let mut tx = self.db.pool().begin().await?;

        let result = sqlx::query(
            "INSERT INTO posts \
                (author_id, title, slug, body, publish, publish_date, created_at, updated_at, status) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7, ?8)",
        )
        .bind(new_post.author_id)
        .bind(&new_post.title)
        .bind(&new_post.slug)
        .bind(&new_post.body)
        .bind(new_post.publish)
        .bind(publish_date(new_post.publish)?)
        .bind(now)
        .bind(new_post.status.as_db())
        .execute(&mut *tx)
        .await?;
        let post_id = result.last_insert_rowid();

        TagService::set_post_tags(&mut tx, post_id, &new_post.tags).await?;
        tx.commit().await?;

        tracing::info!(post_id, slug = %new_post.slug, "post created");

        self.get(post_id)
            .await?
            .ok_or_else(|| anyhow!("post {} vanished after insert", post_id))
    }

    /// Applies `changes` and refreshes `updated_at`. Returns `None` when the
    /// post does not exist.
    pub async fn update(&self, post_id: i64, changes: PostChanges) -> Result<Option<Post>> {
        let Some(current) = self.get(post_id).await? else {
            return Ok(None);
        };

        let title = changes.title.unwrap_or(current.title);
        let slug = changes.slug.unwrap_or(current.slug);
        let body = changes.body.unwrap_or(current.body);
        let status = changes.status.unwrap_or(current.status);
        let publish = changes.publish.unwrap_or(current.publish);

        let mut tx = self.db.pool().begin().await?;
        sqlx::query(
            "UPDATE posts \
             SET title = ?2, slug = ?3, body = ?4, status = ?5, \
                 publish = ?6, publish_date = ?7, updated_at = ?8 \
             WHERE id = ?1",
        )
        .bind(post_id)
        .bind(&title)
        .bind(&slug)
        .bind(&body)
        .bind(status.as_db())
        .bind(publish)
        .bind(publish_date(publish)?)
        .bind(now_utc())
        .execute(&mut *tx)
        .await?;

        if let Some(tags) = changes.tags {
            TagService::set_post_tags(&mut tx, post_id, &tags).await?;
        }
        tx.commit().await?;

        tracing::info!(post_id, status = status.as_db(), "post updated");

        self.get(post_id).await
    }

    // ------------------------------------------------------------------
    // Row mapping
    // ------------------------------------------------------------------

    async fn hydrate(&self, rows: Vec<SqliteRow>) -> Result<Vec<Post>> {
        let mut posts = rows
            .iter()
            .map(post_from_row)
            .collect::<Result<Vec<_>>>()?;

        let ids: Vec<i64> = posts.iter().map(|post| post.id).collect();
        let mut tags = TagService::new(self.db.clone()).tags_for_posts(&ids).await?;
        for post in &mut posts {
            post.tags = tags.remove(&post.id).unwrap_or_default();
        }

        Ok(posts)
    }

    async fn hydrate_one(&self, row: Option<SqliteRow>) -> Result<Option<Post>> {
        match row {
            Some(row) => Ok(self.hydrate(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }
}

fn post_from_row(row: &SqliteRow) -> Result<Post> {
    let status: String = row.try_get("status")?;
    let status = PostStatus::from_db(&status)
        .ok_or_else(|| anyhow!("unknown post status: {}", status))?;

    Ok(Post {
        id: row.try_get("id")?,
        author_id: row.try_get("author_id")?,
        author_username: row.try_get("author_username")?,
        title: row.try_get("title")?,
        slug: row.try_get("slug")?,
        body: row.try_get("body")?,
        publish: row.try_get("publish")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
        status,
        tags: Vec::new(),
    })
}

fn format_date(date: Date) -> Result<String> {
    Ok(date.format(format_description!("[year]-[month]-[day]"))?)
}

/// Calendar date (UTC) that scopes slug uniqueness.
pub fn publish_date(publish: OffsetDateTime) -> Result<String> {
    format_date(publish.to_offset(time::UtcOffset::UTC).date())
}

fn escape_like_pattern(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '%' | '_' | '\\' => {
                escaped.push('\\');
                escaped.push(ch);
            }
            _ => escaped.push(ch),
        }
    }
    escaped
}
