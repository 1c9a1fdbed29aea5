use serde::Serialize;
use time::macros::format_description;
use time::OffsetDateTime;

use crate::app::syndication::truncate_words;
use crate::config::SiteSettings;
use crate::domain::comment::Comment;
use crate::domain::post::Post;
use crate::domain::tag::Tag;

const EXCERPT_WORDS: usize = 30;

#[derive(Debug, Serialize)]
pub struct PostView {
    pub id: i64,
    pub title: String,
    pub slug: String,
    pub body: String,
    pub excerpt: String,
    pub author: String,
    pub publish: String,
    pub url: String,
    pub absolute_url: String,
    pub share_url: String,
    pub comment_url: String,
    pub tags: Vec<TagView>,
}

impl PostView {
    pub fn new(post: &Post, site: &SiteSettings) -> Self {
        let url = post.absolute_url();
        Self {
            id: post.id,
            title: post.title.clone(),
            slug: post.slug.clone(),
            body: post.body.clone(),
            excerpt: truncate_words(&post.body, EXCERPT_WORDS),
            author: post.author_username.clone(),
            publish: display_datetime(post.publish),
            absolute_url: site.absolute(&url),
            url,
            share_url: format!("/{}/share/", post.id),
            comment_url: format!("/{}/comment/", post.id),
            tags: post.tags.iter().map(TagView::from).collect(),
        }
    }

    pub fn many(posts: &[Post], site: &SiteSettings) -> Vec<Self> {
        posts.iter().map(|post| Self::new(post, site)).collect()
    }
}

#[derive(Debug, Serialize)]
pub struct TagView {
    pub name: String,
    pub slug: String,
    pub url: String,
}

impl From<&Tag> for TagView {
    fn from(tag: &Tag) -> Self {
        Self {
            name: tag.name.clone(),
            slug: tag.slug.clone(),
            url: tag.absolute_url(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CommentView {
    pub name: String,
    pub body: String,
    pub created: String,
}

impl From<&Comment> for CommentView {
    fn from(comment: &Comment) -> Self {
        Self {
            name: comment.name.clone(),
            body: comment.body.clone(),
            created: display_datetime(comment.created_at),
        }
    }
}

fn display_datetime(value: OffsetDateTime) -> String {
    value
        .format(format_description!(
            "[month repr:short] [day padding:none], [year], [hour]:[minute]"
        ))
        .unwrap_or_default()
}
