#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use sqlx::SqlitePool;
use tempfile::TempDir;
use tower::ServiceExt;
use url::Url;

use quill::app::comments::CommentService;
use quill::config::{AppConfig, SiteSettings};
use quill::infra::mail::{EmailMessage, MemoryMailer};
use quill::infra::{db::Db, templates};
use quill::AppState;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

pub const TEST_ADMIN_TOKEN: &str = "test-admin-token-12345";
pub const SITE_URL: &str = "http://testserver";
pub const POSTS_PER_PAGE: i64 = 3;

// ---------------------------------------------------------------------------
// TestApp: one per test, backed by a throwaway SQLite file
// ---------------------------------------------------------------------------

pub struct TestApp {
    router: Router,
    pub state: AppState,
    pub mailer: Arc<MemoryMailer>,
    _dir: TempDir,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub content_type: Option<String>,
    body: String,
}

impl TestResponse {
    pub fn text(&self) -> &str {
        &self.body
    }

    pub fn json(&self) -> Value {
        serde_json::from_str(&self.body).unwrap_or(Value::Null)
    }

    pub fn error_message(&self) -> String {
        self.json()["error"].as_str().unwrap_or("").to_string()
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.body.contains(needle)
    }
}

pub struct TestPost {
    pub id: i64,
    pub title: String,
    pub url: String,
}

pub async fn app() -> TestApp {
    TestApp::setup().await
}

impl TestApp {
    async fn setup() -> Self {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        let database_url = format!("sqlite://{}", dir.path().join("blog.db").display());

        let config = AppConfig {
            http_addr: "127.0.0.1:0".into(),
            database_url,
            db_max_connections: 5,
            db_connect_timeout_seconds: 5,
            email_backend: "memory".into(),
            admin_token: Some(TEST_ADMIN_TOKEN.into()),
            site: SiteSettings {
                site_url: Url::parse(SITE_URL).unwrap(),
                blog_title: "My blog".into(),
                posts_per_page: POSTS_PER_PAGE,
                feed_items: 5,
                email_from: "blog@testserver".into(),
            },
        };

        let db = Db::connect(&config).await.expect("Db::connect failed");
        db.migrate().await.expect("migrations failed");

        let mailer = Arc::new(MemoryMailer::new());
        let state = AppState {
            db,
            templates: Arc::new(templates::load().expect("templates failed to load")),
            mailer: mailer.clone(),
            site: config.site.clone(),
            admin_token: config.admin_token.clone(),
        };

        let router = quill::http::router(state.clone());

        TestApp {
            router,
            state,
            mailer,
            _dir: dir,
        }
    }

    // ------------------------------------------------------------------
    // Low-level request helper
    // ------------------------------------------------------------------
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<(&str, String)>,
        headers: &[(&str, &str)],
    ) -> TestResponse {
        let mut builder = Request::builder()
            .method(method)
            .uri(path)
            .header("host", "testserver");

        for &(key, value) in headers {
            builder = builder.header(key, value);
        }

        let request = match body {
            Some((content_type, body)) => builder
                .header("content-type", content_type)
                .body(Body::from(body))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("oneshot failed");

        let status = response.status();
        let content_type = response
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("failed to collect body")
            .to_bytes();

        TestResponse {
            status,
            content_type,
            body: String::from_utf8(body_bytes.to_vec()).expect("body is not utf-8"),
        }
    }

    // ------------------------------------------------------------------
    // Convenience HTTP helpers
    // ------------------------------------------------------------------
    pub async fn get(&self, path: &str) -> TestResponse {
        self.request(Method::GET, path, None, &[]).await
    }

    pub async fn post_form(&self, path: &str, fields: &[(&str, &str)]) -> TestResponse {
        let body = fields
            .iter()
            .map(|(k, v)| format!("{}={}", encode(k), encode(v)))
            .collect::<Vec<_>>()
            .join("&");
        self.request(
            Method::POST,
            path,
            Some(("application/x-www-form-urlencoded", body)),
            &[],
        )
        .await
    }

    pub async fn post_admin(&self, path: &str, body: Value, admin_token: Option<&str>) -> TestResponse {
        self.admin_json(Method::POST, path, body, admin_token).await
    }

    pub async fn patch_admin(&self, path: &str, body: Value, admin_token: Option<&str>) -> TestResponse {
        self.admin_json(Method::PATCH, path, body, admin_token).await
    }

    async fn admin_json(
        &self,
        method: Method,
        path: &str,
        body: Value,
        admin_token: Option<&str>,
    ) -> TestResponse {
        let mut headers = vec![];
        if let Some(t) = admin_token {
            headers.push(("x-admin-token", t));
        }
        self.request(
            method,
            path,
            Some(("application/json", body.to_string())),
            &headers,
        )
        .await
    }

    // ------------------------------------------------------------------
    // Test data helpers
    // ------------------------------------------------------------------

    pub fn admin_token(&self) -> &str {
        TEST_ADMIN_TOKEN
    }

    pub fn pool(&self) -> &SqlitePool {
        self.state.db.pool()
    }

    pub fn outbox(&self) -> Vec<EmailMessage> {
        self.mailer.outbox()
    }

    /// Create an author through the admin API. Returns the author id.
    pub async fn create_author(&self, username: &str) -> i64 {
        let resp = self
            .post_admin(
                "/admin/authors",
                json!({ "username": username, "email": format!("{}@example.com", username) }),
                Some(TEST_ADMIN_TOKEN),
            )
            .await;
        assert_eq!(resp.status, StatusCode::OK, "create author: {}", resp.text());
        resp.json()["id"].as_i64().expect("author id")
    }

    /// Create a post through the admin API.
    pub async fn create_post(
        &self,
        author_id: i64,
        title: &str,
        status: &str,
        publish: &str,
        tags: &[&str],
    ) -> TestPost {
        let resp = self
            .post_admin(
                "/admin/posts",
                json!({
                    "author_id": author_id,
                    "title": title,
                    "body": format!("Body of {}.", title),
                    "status": status,
                    "publish": publish,
                    "tags": tags,
                }),
                Some(TEST_ADMIN_TOKEN),
            )
            .await;
        assert_eq!(resp.status, StatusCode::OK, "create post: {}", resp.text());
        let body = resp.json();
        let post: quill::domain::post::Post =
            serde_json::from_value(body).expect("post payload");
        TestPost {
            id: post.id,
            title: post.title.clone(),
            url: post.absolute_url(),
        }
    }

    pub async fn comment_count(&self, post_id: i64) -> i64 {
        CommentService::new(self.state.db.clone())
            .count_for_post(post_id)
            .await
            .expect("count comments")
    }
}

fn encode(value: &str) -> String {
    url::form_urlencoded::byte_serialize(value.as_bytes()).collect()
}
