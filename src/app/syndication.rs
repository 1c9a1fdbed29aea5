//! RSS and sitemap projections of the published-post set.

use anyhow::Result;
use serde::Serialize;
use time::format_description::well_known::Rfc2822;
use time::macros::format_description;

use crate::config::SiteSettings;
use crate::domain::post::Post;

pub const FEED_DESCRIPTION: &str = "New posts of my blog";
const FEED_DESCRIPTION_WORDS: usize = 30;

#[derive(Debug, Serialize)]
pub struct FeedChannel {
    pub title: String,
    pub link: String,
    pub description: String,
    pub last_build_date: Option<String>,
    pub items: Vec<FeedItem>,
}

#[derive(Debug, Serialize)]
pub struct FeedItem {
    pub title: String,
    pub link: String,
    pub description: String,
    pub pub_date: String,
}

#[derive(Debug, Serialize)]
pub struct SitemapEntry {
    pub loc: String,
    pub lastmod: String,
    pub changefreq: &'static str,
    pub priority: &'static str,
}

/// Builds the RSS channel for `posts`, newest first.
pub fn feed_channel(site: &SiteSettings, posts: &[Post]) -> Result<FeedChannel> {
    let mut items = Vec::with_capacity(posts.len());
    for post in posts {
        items.push(FeedItem {
            title: post.title.clone(),
            link: site.absolute(&post.absolute_url()),
            description: truncate_words(&post.body, FEED_DESCRIPTION_WORDS),
            pub_date: post.publish.format(&Rfc2822)?,
        });
    }

    let last_build_date = match posts.first() {
        Some(post) => Some(post.publish.format(&Rfc2822)?),
        None => None,
    };

    Ok(FeedChannel {
        title: site.blog_title.clone(),
        link: site.absolute("/"),
        description: FEED_DESCRIPTION.to_string(),
        last_build_date,
        items,
    })
}

pub fn sitemap_entries(site: &SiteSettings, posts: &[Post]) -> Result<Vec<SitemapEntry>> {
    posts
        .iter()
        .map(|post| {
            Ok(SitemapEntry {
                loc: site.absolute(&post.absolute_url()),
                lastmod: post
                    .updated_at
                    .date()
                    .format(format_description!("[year]-[month]-[day]"))?,
                changefreq: "weekly",
                priority: "0.9",
            })
        })
        .collect()
}

/// Keeps the first `max_words` whitespace-separated words, appending `…`
/// when anything was cut.
pub fn truncate_words(text: &str, max_words: usize) -> String {
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.len() <= max_words {
        return words.join(" ");
    }
    let mut truncated = words[..max_words].join(" ");
    truncated.push_str(" …");
    truncated
}
