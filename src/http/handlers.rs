use axum::{
    extract::{Form, Path, Query, State},
    http::header,
    response::{Html, IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tera::Context;
use time::format_description::well_known::Rfc3339;
use time::{Date, Month, OffsetDateTime};
use validator::ValidateEmail;

use crate::app::authors::AuthorService;
use crate::app::comments::{CommentService, NewComment};
use crate::app::pagination::PageInfo;
use crate::app::posts::{NewPost, PostChanges, PostService};
use crate::app::slug::{is_valid_slug, slugify};
use crate::app::syndication::{feed_channel, sitemap_entries};
use crate::app::tags::TagService;
use crate::domain::author::Author;
use crate::domain::post::{Post, PostStatus};
use crate::domain::{now_utc, truncate_to_seconds};
use crate::http::forms::{CommentForm, FieldErrors, ShareForm};
use crate::http::views::{CommentView, PostView, TagView};
use crate::http::{AdminToken, AppError};
use crate::infra::db::is_unique_violation;
use crate::infra::mail::EmailMessage;
use crate::AppState;

const SIMILAR_POSTS: i64 = 4;

#[derive(Serialize)]
pub(crate) struct HealthResponse {
    status: &'static str,
}

pub(crate) async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let status = if state.db.ping().await.is_ok() {
        "ok"
    } else {
        "degraded"
    };

    Json(HealthResponse { status })
}

fn page_context(state: &AppState) -> Context {
    let mut ctx = Context::new();
    ctx.insert("blog_title", &state.site.blog_title);
    ctx
}

fn render(state: &AppState, template: &str, ctx: &Context) -> Result<Html<String>, AppError> {
    state.templates.render(template, ctx).map(Html).map_err(|err| {
        tracing::error!(error = ?err, template, "failed to render template");
        AppError::internal("failed to render page")
    })
}

fn render_xml(
    state: &AppState,
    template: &str,
    ctx: &Context,
    content_type: &'static str,
) -> Result<Response, AppError> {
    let body = state.templates.render(template, ctx).map_err(|err| {
        tracing::error!(error = ?err, template, "failed to render template");
        AppError::internal("failed to render document")
    })?;

    Ok(([(header::CONTENT_TYPE, content_type)], body).into_response())
}

fn parse_post_id(raw: &str) -> Result<i64, AppError> {
    raw.parse::<i64>()
        .ok()
        .filter(|id| *id > 0)
        .ok_or_else(|| AppError::not_found("post not found"))
}

fn parse_publish_date(year: &str, month: &str, day: &str) -> Option<Date> {
    let all_digits = |part: &str| !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit());
    if !(all_digits(year) && all_digits(month) && all_digits(day)) {
        return None;
    }
    let year: i32 = year.parse().ok()?;
    let month: u8 = month.parse().ok()?;
    let day: u8 = day.parse().ok()?;
    Date::from_calendar_date(year, Month::try_from(month).ok()?, day).ok()
}

async fn load_published(state: &AppState, raw_id: &str) -> Result<Post, AppError> {
    let post_id = parse_post_id(raw_id)?;
    let service = PostService::new(state.db.clone());
    let post = service.get_published(post_id).await.map_err(|err| {
        tracing::error!(error = ?err, post_id, "failed to fetch post");
        AppError::internal("failed to fetch post")
    })?;

    post.ok_or_else(|| AppError::not_found("post not found"))
}

// ============================================================================
// Post list and detail
// ============================================================================

#[derive(Deserialize)]
pub struct PageQuery {
    pub page: Option<String>,
}

pub async fn post_list(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Result<Html<String>, AppError> {
    list_posts(&state, None, query.page.as_deref()).await
}

pub async fn post_list_by_tag(
    Path(tag_slug): Path<String>,
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Result<Html<String>, AppError> {
    list_posts(&state, Some(&tag_slug), query.page.as_deref()).await
}

async fn list_posts(
    state: &AppState,
    tag_slug: Option<&str>,
    raw_page: Option<&str>,
) -> Result<Html<String>, AppError> {
    let tag = match tag_slug {
        Some(slug) => {
            let found = TagService::new(state.db.clone())
                .find_by_slug(slug)
                .await
                .map_err(|err| {
                    tracing::error!(error = ?err, tag = %slug, "failed to fetch tag");
                    AppError::internal("failed to fetch tag")
                })?;
            // Unknown tags render as an empty list rather than an error.
            Some(match found {
                Some(tag) => TagView::from(&tag),
                None => TagView {
                    name: slug.to_string(),
                    slug: slug.to_string(),
                    url: format!("/tag/{}/", slug),
                },
            })
        }
        None => None,
    };

    let service = PostService::new(state.db.clone());
    let total = service.count_published(tag_slug).await.map_err(|err| {
        tracing::error!(error = ?err, "failed to count posts");
        AppError::internal("failed to list posts")
    })?;
    let page = PageInfo::resolve(raw_page, total, state.site.posts_per_page);

    let posts = service
        .list_published(tag_slug, page.limit(), page.offset())
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, page = page.number, "failed to list posts");
            AppError::internal("failed to list posts")
        })?;

    let base_path = match tag_slug {
        Some(slug) => format!("/tag/{}/", slug),
        None => "/".to_string(),
    };

    let mut ctx = page_context(state);
    ctx.insert("posts", &PostView::many(&posts, &state.site));
    ctx.insert("tag", &tag);
    ctx.insert("page", &page);
    ctx.insert("base_path", &base_path);

    render(state, "post/list.html", &ctx)
}

pub async fn post_detail(
    Path((year, month, day, slug)): Path<(String, String, String, String)>,
    State(state): State<AppState>,
) -> Result<Html<String>, AppError> {
    let date = parse_publish_date(&year, &month, &day)
        .ok_or_else(|| AppError::not_found("post not found"))?;

    let service = PostService::new(state.db.clone());
    let post = service
        .get_published_by_date(date, &slug)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, slug = %slug, "failed to fetch post");
            AppError::internal("failed to fetch post")
        })?
        .ok_or_else(|| AppError::not_found("post not found"))?;

    let comments = CommentService::new(state.db.clone())
        .list_active(post.id)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, post_id = post.id, "failed to list comments");
            AppError::internal("failed to fetch post")
        })?;

    let similar = service
        .similar_published(post.id, SIMILAR_POSTS)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, post_id = post.id, "failed to list similar posts");
            AppError::internal("failed to fetch post")
        })?;

    let comments: Vec<CommentView> = comments.iter().map(CommentView::from).collect();

    let mut ctx = page_context(&state);
    ctx.insert("post", &PostView::new(&post, &state.site));
    ctx.insert("comments", &comments);
    ctx.insert("similar_posts", &PostView::many(&similar, &state.site));
    ctx.insert("form", &CommentForm::default());
    ctx.insert("errors", &FieldErrors::new());

    render(&state, "post/detail.html", &ctx)
}

// ============================================================================
// Share by email
// ============================================================================

fn render_share(
    state: &AppState,
    post: &Post,
    form: &ShareForm,
    errors: &FieldErrors,
    sent: bool,
) -> Result<Html<String>, AppError> {
    let mut ctx = page_context(state);
    ctx.insert("post", &PostView::new(post, &state.site));
    ctx.insert("form", form);
    ctx.insert("errors", errors);
    ctx.insert("sent", &sent);

    render(state, "post/share.html", &ctx)
}

pub async fn share_form(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> Result<Html<String>, AppError> {
    let post = load_published(&state, &id).await?;
    render_share(&state, &post, &ShareForm::default(), &FieldErrors::new(), false)
}

pub async fn share_submit(
    Path(id): Path<String>,
    State(state): State<AppState>,
    Form(form): Form<ShareForm>,
) -> Result<Html<String>, AppError> {
    let post = load_published(&state, &id).await?;

    let form = form.trimmed();
    let errors = form.errors();
    if !errors.is_empty() {
        return render_share(&state, &post, &form, &errors, false);
    }

    let post_url = state.site.absolute(&post.absolute_url());
    let message = EmailMessage {
        subject: format!(
            "{} ({}) recommends you read {}",
            form.name, form.email, post.title
        ),
        body: format!(
            "Read {} at {}\n\n{}'s comments: {}",
            post.title, post_url, form.name, form.comments
        ),
        from: state.site.email_from.clone(),
        to: vec![form.to.clone()],
    };

    state.mailer.send(message).await.map_err(|err| {
        tracing::error!(error = ?err, post_id = post.id, "failed to send share email");
        AppError::internal("failed to send email")
    })?;
    tracing::info!(post_id = post.id, "post shared by email");

    render_share(&state, &post, &form, &FieldErrors::new(), true)
}

// ============================================================================
// Comments
// ============================================================================

pub async fn post_comment(
    Path(id): Path<String>,
    State(state): State<AppState>,
    Form(form): Form<CommentForm>,
) -> Result<Html<String>, AppError> {
    let post = load_published(&state, &id).await?;

    let form = form.trimmed();
    let errors = form.errors();

    let comment = if errors.is_empty() {
        let comment = CommentService::new(state.db.clone())
            .create(
                post.id,
                NewComment {
                    name: form.name.clone(),
                    email: form.email.clone(),
                    body: form.body.clone(),
                },
            )
            .await
            .map_err(|err| {
                tracing::error!(error = ?err, post_id = post.id, "failed to add comment");
                AppError::internal("failed to add comment")
            })?;
        tracing::info!(post_id = post.id, comment_id = comment.id, "comment added");
        Some(CommentView::from(&comment))
    } else {
        None
    };

    let mut ctx = page_context(&state);
    ctx.insert("post", &PostView::new(&post, &state.site));
    ctx.insert("form", &form);
    ctx.insert("errors", &errors);
    ctx.insert("comment", &comment);

    render(&state, "post/comment.html", &ctx)
}

// ============================================================================
// Search
// ============================================================================

#[derive(Deserialize)]
pub struct SearchQuery {
    pub query: Option<String>,
}

pub async fn post_search(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Html<String>, AppError> {
    let term = query
        .query
        .as_deref()
        .map(str::trim)
        .filter(|term| !term.is_empty());

    let results = match term {
        Some(term) => PostService::new(state.db.clone())
            .search_published(term)
            .await
            .map_err(|err| {
                tracing::error!(error = ?err, "failed to search posts");
                AppError::internal("failed to search posts")
            })?,
        None => Vec::new(),
    };

    let mut ctx = page_context(&state);
    ctx.insert("query", &term);
    ctx.insert("results", &PostView::many(&results, &state.site));

    render(&state, "post/search.html", &ctx)
}

// ============================================================================
// Feed and sitemap
// ============================================================================

pub async fn feed(State(state): State<AppState>) -> Result<Response, AppError> {
    let posts = PostService::new(state.db.clone())
        .latest_published(state.site.feed_items)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, "failed to fetch feed posts");
            AppError::internal("failed to build feed")
        })?;

    let channel = feed_channel(&state.site, &posts).map_err(|err| {
        tracing::error!(error = ?err, "failed to build feed");
        AppError::internal("failed to build feed")
    })?;
    let ctx = Context::from_serialize(&channel).map_err(|err| {
        tracing::error!(error = ?err, "failed to build feed context");
        AppError::internal("failed to build feed")
    })?;

    render_xml(&state, "feed.xml", &ctx, "application/rss+xml; charset=utf-8")
}

pub async fn sitemap(State(state): State<AppState>) -> Result<Response, AppError> {
    let posts = PostService::new(state.db.clone())
        .all_published()
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, "failed to fetch sitemap posts");
            AppError::internal("failed to build sitemap")
        })?;

    let entries = sitemap_entries(&state.site, &posts).map_err(|err| {
        tracing::error!(error = ?err, "failed to build sitemap");
        AppError::internal("failed to build sitemap")
    })?;

    let mut ctx = Context::new();
    ctx.insert("entries", &entries);

    render_xml(&state, "sitemap.xml", &ctx, "application/xml")
}

// ============================================================================
// Admin API
// ============================================================================

const MAX_USERNAME_LEN: usize = 150;
const MAX_TITLE_LEN: usize = 250;
const MAX_SLUG_LEN: usize = 250;

#[derive(Deserialize)]
pub struct CreateAuthorRequest {
    pub username: String,
    #[serde(default)]
    pub email: String,
}

pub async fn create_author(
    _admin: AdminToken,
    State(state): State<AppState>,
    Json(payload): Json<CreateAuthorRequest>,
) -> Result<Json<Author>, AppError> {
    let username = payload.username.trim();
    if username.is_empty() {
        return Err(AppError::bad_request("username is required"));
    }
    if username.chars().count() > MAX_USERNAME_LEN {
        return Err(AppError::bad_request(
            "username must be at most 150 characters",
        ));
    }
    let email = payload.email.trim();
    if !email.is_empty() && !email.validate_email() {
        return Err(AppError::bad_request("invalid email"));
    }

    let service = AuthorService::new(state.db.clone());
    let taken = service.username_taken(username).await.map_err(|err| {
        tracing::error!(error = ?err, "failed to check username");
        AppError::internal("failed to create author")
    })?;
    if taken {
        return Err(AppError::conflict("username already taken"));
    }

    let author = service.create(username, email).await.map_err(|err| {
        if is_unique_violation(&err) {
            return AppError::conflict("username already taken");
        }
        tracing::error!(error = ?err, "failed to create author");
        AppError::internal("failed to create author")
    })?;

    Ok(Json(author))
}

#[derive(Deserialize)]
pub struct CreatePostRequest {
    pub author_id: i64,
    pub title: String,
    pub slug: Option<String>,
    pub body: String,
    pub status: Option<PostStatus>,
    pub publish: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

fn clean_title(title: &str) -> Result<String, AppError> {
    let title = title.trim();
    if title.is_empty() {
        return Err(AppError::bad_request("title is required"));
    }
    if title.chars().count() > MAX_TITLE_LEN {
        return Err(AppError::bad_request("title must be at most 250 characters"));
    }
    Ok(title.to_string())
}

fn clean_slug(slug: &str) -> Result<String, AppError> {
    let slug = slug.trim();
    if !is_valid_slug(slug) {
        return Err(AppError::bad_request(
            "slug must contain only letters, numbers, hyphens or underscores",
        ));
    }
    if slug.len() > MAX_SLUG_LEN {
        return Err(AppError::bad_request("slug must be at most 250 characters"));
    }
    Ok(slug.to_string())
}

fn parse_publish(raw: &str) -> Result<OffsetDateTime, AppError> {
    OffsetDateTime::parse(raw.trim(), &Rfc3339)
        .map(truncate_to_seconds)
        .map_err(|_| AppError::bad_request("publish must be an RFC 3339 timestamp"))
}

fn clean_tags(tags: &[String]) -> Result<Vec<String>, AppError> {
    let mut cleaned = Vec::with_capacity(tags.len());
    for tag in tags {
        let tag = tag.trim();
        if tag.is_empty() {
            continue;
        }
        if slugify(tag).is_empty() {
            return Err(AppError::bad_request(format!(
                "tag {:?} must contain at least one ASCII letter or digit",
                tag
            )));
        }
        cleaned.push(tag.to_string());
    }
    Ok(cleaned)
}

const SLUG_CONFLICT: &str = "slug already used by another post on this publish date";

fn save_error(err: anyhow::Error, post_id: Option<i64>) -> AppError {
    if is_unique_violation(&err) {
        return AppError::conflict(SLUG_CONFLICT);
    }
    tracing::error!(error = ?err, post_id = ?post_id, "failed to save post");
    AppError::internal("failed to save post")
}

async fn ensure_slug_free(
    service: &PostService,
    slug: &str,
    publish: OffsetDateTime,
    exclude_post_id: Option<i64>,
) -> Result<(), AppError> {
    let taken = service
        .slug_taken(slug, publish, exclude_post_id)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, slug = %slug, "failed to check slug");
            AppError::internal("failed to save post")
        })?;

    if taken {
        return Err(AppError::conflict(SLUG_CONFLICT));
    }
    Ok(())
}

pub async fn create_post(
    _admin: AdminToken,
    State(state): State<AppState>,
    Json(payload): Json<CreatePostRequest>,
) -> Result<Json<Post>, AppError> {
    let title = clean_title(&payload.title)?;
    let slug = match payload.slug.as_deref() {
        Some(slug) => clean_slug(slug)?,
        None => clean_slug(&slugify(&title))?,
    };
    let publish = match payload.publish.as_deref() {
        Some(raw) => parse_publish(raw)?,
        None => now_utc(),
    };
    let tags = clean_tags(&payload.tags)?;

    let author = AuthorService::new(state.db.clone())
        .get(payload.author_id)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, author_id = payload.author_id, "failed to fetch author");
            AppError::internal("failed to save post")
        })?;
    if author.is_none() {
        return Err(AppError::bad_request("unknown author_id"));
    }

    let service = PostService::new(state.db.clone());
    ensure_slug_free(&service, &slug, publish, None).await?;

    let post = service
        .create(NewPost {
            author_id: payload.author_id,
            title,
            slug,
            body: payload.body,
            status: payload.status.unwrap_or(PostStatus::Draft),
            publish,
            tags,
        })
        .await
        .map_err(|err| save_error(err, None))?;

    Ok(Json(post))
}

#[derive(Deserialize)]
pub struct UpdatePostRequest {
    pub title: Option<String>,
    pub slug: Option<String>,
    pub body: Option<String>,
    pub status: Option<PostStatus>,
    pub publish: Option<String>,
    pub tags: Option<Vec<String>>,
}

pub async fn update_post(
    _admin: AdminToken,
    Path(id): Path<String>,
    State(state): State<AppState>,
    Json(payload): Json<UpdatePostRequest>,
) -> Result<Json<Post>, AppError> {
    let id = parse_post_id(&id)?;
    let service = PostService::new(state.db.clone());
    let current = service
        .get(id)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, post_id = id, "failed to fetch post");
            AppError::internal("failed to save post")
        })?
        .ok_or_else(|| AppError::not_found("post not found"))?;

    let changes = PostChanges {
        title: payload.title.as_deref().map(clean_title).transpose()?,
        slug: payload.slug.as_deref().map(clean_slug).transpose()?,
        body: payload.body,
        status: payload.status,
        publish: payload.publish.as_deref().map(parse_publish).transpose()?,
        tags: payload.tags.as_deref().map(clean_tags).transpose()?,
    };

    if changes.slug.is_some() || changes.publish.is_some() {
        let slug = changes.slug.as_deref().unwrap_or(&current.slug);
        let publish = changes.publish.unwrap_or(current.publish);
        ensure_slug_free(&service, slug, publish, Some(id)).await?;
    }

    let post = service
        .update(id, changes)
        .await
        .map_err(|err| save_error(err, Some(id)))?
        .ok_or_else(|| AppError::not_found("post not found"))?;

    Ok(Json(post))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn publish_date_parts_must_form_a_real_date() {
        assert!(parse_publish_date("2024", "2", "29").is_some());
        assert!(parse_publish_date("2023", "2", "29").is_none());
        assert!(parse_publish_date("2024", "13", "1").is_none());
        assert!(parse_publish_date("2024", "01", "05").is_some());
        assert!(parse_publish_date("year", "1", "1").is_none());
        assert!(parse_publish_date("+2024", "1", "5").is_none());
        assert!(parse_publish_date("2024", "+1", "5").is_none());
        assert!(parse_publish_date("-2024", "1", "5").is_none());
    }

    #[test]
    fn tags_need_a_usable_slug() {
        let tags = vec![" Rust ".to_string(), String::new(), "Web Dev".to_string()];
        assert_eq!(clean_tags(&tags).unwrap(), vec!["Rust", "Web Dev"]);

        let err = clean_tags(&["日本語".to_string()]).unwrap_err();
        assert_eq!(err.status(), axum::http::StatusCode::BAD_REQUEST);
    }

    #[test]
    fn post_ids_must_be_positive_integers() {
        assert_eq!(parse_post_id("42").unwrap(), 42);
        assert_eq!(parse_post_id("0").unwrap_err().status(), axum::http::StatusCode::NOT_FOUND);
        assert!(parse_post_id("abc").is_err());
    }
}
