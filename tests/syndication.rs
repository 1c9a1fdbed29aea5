//! RSS feed, sitemap and health endpoints.

mod common;

use axum::http::StatusCode;
use common::app;

#[tokio::test]
async fn feed_lists_latest_published_posts() {
    let app = app().await;
    let author = app.create_author("feeder").await;
    for day in 1..=6 {
        app.create_post(
            author,
            &format!("Feed post {}", day),
            "published",
            &format!("2024-05-{:02}T07:00:00Z", day),
            &[],
        )
        .await;
    }
    app.create_post(author, "Unpublished idea", "draft", "2024-05-10T07:00:00Z", &[])
        .await;

    let resp = app.get("/feed/").await;

    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(
        resp.content_type.as_deref(),
        Some("application/rss+xml; charset=utf-8")
    );
    assert!(resp.contains("<rss version=\"2.0\">"));
    assert!(resp.contains("<title>My blog</title>"));
    assert_eq!(resp.text().matches("<item>").count(), 5);
    assert!(resp.contains("<title>Feed post 6</title>"));
    assert!(!resp.contains("Feed post 1<"));
    assert!(!resp.contains("Unpublished idea"));
    assert!(resp.contains("<link>http://testserver/2024/5/6/feed-post-6/</link>"));
    assert!(resp.contains("<pubDate>Mon, 06 May 2024 07:00:00 +0000</pubDate>"));
}

#[tokio::test]
async fn feed_escapes_markup_in_titles() {
    let app = app().await;
    let author = app.create_author("escaper").await;
    app.create_post(author, "Fish & Chips", "published", "2024-05-01T07:00:00Z", &[])
        .await;

    let resp = app.get("/feed/").await;

    assert!(resp.contains("<title>Fish &amp; Chips</title>"));
}

#[tokio::test]
async fn sitemap_has_one_entry_per_published_post() {
    let app = app().await;
    let author = app.create_author("mapper").await;
    app.create_post(author, "Mapped one", "published", "2024-01-01T10:00:00Z", &[])
        .await;
    app.create_post(author, "Mapped two", "published", "2024-01-02T10:00:00Z", &[])
        .await;
    app.create_post(author, "Not mapped", "draft", "2024-01-03T10:00:00Z", &[])
        .await;

    let resp = app.get("/sitemap.xml").await;

    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.content_type.as_deref(), Some("application/xml"));
    assert_eq!(resp.text().matches("<url>").count(), 2);
    assert!(resp.contains("<loc>http://testserver/2024/1/1/mapped-one/</loc>"));
    assert!(resp.contains("<loc>http://testserver/2024/1/2/mapped-two/</loc>"));
    assert!(!resp.contains("not-mapped"));
    assert!(resp.contains("<changefreq>weekly</changefreq>"));
    assert!(resp.contains("<priority>0.9</priority>"));
}

#[tokio::test]
async fn health_reports_ok() {
    let app = app().await;

    let resp = app.get("/health").await;

    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.json()["status"], "ok");
}
