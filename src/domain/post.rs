use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::domain::tag::Tag;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub id: i64,
    pub author_id: i64,
    pub author_username: String,
    pub title: String,
    pub slug: String,
    pub body: String,
    #[serde(with = "time::serde::rfc3339")]
    pub publish: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
    pub status: PostStatus,
    #[serde(default)]
    pub tags: Vec<Tag>,
}

impl Post {
    /// Canonical site-relative URL, scoped by the UTC publish date.
    pub fn absolute_url(&self) -> String {
        let date = self.publish.to_offset(time::UtcOffset::UTC).date();
        format!(
            "/{}/{}/{}/{}/",
            date.year(),
            u8::from(date.month()),
            date.day(),
            self.slug
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PostStatus {
    Draft,
    Published,
}

impl PostStatus {
    pub fn from_db(value: &str) -> Option<Self> {
        match value {
            "draft" => Some(Self::Draft),
            "published" => Some(Self::Published),
            _ => None,
        }
    }

    pub fn as_db(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Published => "published",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn absolute_url_uses_unpadded_date_parts() {
        let post = Post {
            id: 1,
            author_id: 1,
            author_username: "admin".into(),
            title: "Hello".into(),
            slug: "hello".into(),
            body: String::new(),
            publish: datetime!(2024-01-05 10:00 UTC),
            created_at: datetime!(2024-01-05 10:00 UTC),
            updated_at: datetime!(2024-01-05 10:00 UTC),
            status: PostStatus::Published,
            tags: Vec::new(),
        };
        assert_eq!(post.absolute_url(), "/2024/1/5/hello/");
    }

    #[test]
    fn status_round_trips_through_db_names() {
        assert_eq!(PostStatus::from_db("draft"), Some(PostStatus::Draft));
        assert_eq!(PostStatus::from_db("published"), Some(PostStatus::Published));
        assert_eq!(PostStatus::from_db("PB"), None);
        assert_eq!(PostStatus::Published.as_db(), "published");
    }
}
