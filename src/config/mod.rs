use anyhow::{anyhow, Result};
use std::net::SocketAddr;
use std::str::FromStr;
use url::Url;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub http_addr: String,
    pub database_url: String,
    pub db_max_connections: u32,
    pub db_connect_timeout_seconds: u64,
    pub email_backend: String,
    pub admin_token: Option<String>,
    pub site: SiteSettings,
}

/// Settings the views need at request time.
#[derive(Clone, Debug)]
pub struct SiteSettings {
    pub site_url: Url,
    pub blog_title: String,
    pub posts_per_page: i64,
    pub feed_items: i64,
    pub email_from: String,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let http_addr = env_or("HTTP_ADDR", "0.0.0.0:8080");
        let _parsed_http_addr = SocketAddr::from_str(&http_addr)
            .map_err(|err| anyhow!("invalid HTTP_ADDR: {}", err))?;

        let site_url = env_or("SITE_URL", "http://localhost:8080");
        let site_url =
            Url::parse(&site_url).map_err(|err| anyhow!("invalid SITE_URL: {}", err))?;

        let posts_per_page: i64 = env_or_parse("POSTS_PER_PAGE", "3")?;
        if posts_per_page < 1 {
            return Err(anyhow!("invalid POSTS_PER_PAGE: must be at least 1"));
        }
        let feed_items: i64 = env_or_parse("FEED_ITEMS", "5")?;
        if feed_items < 1 {
            return Err(anyhow!("invalid FEED_ITEMS: must be at least 1"));
        }

        Ok(Self {
            http_addr,
            database_url: env_or_err("DATABASE_URL")?,
            db_max_connections: env_or_parse("DB_MAX_CONNECTIONS", "5")?,
            db_connect_timeout_seconds: env_or_parse("DB_CONNECT_TIMEOUT_SECONDS", "5")?,
            email_backend: env_or("EMAIL_BACKEND", "log"),
            admin_token: std::env::var("ADMIN_TOKEN").ok().filter(|t| !t.is_empty()),
            site: SiteSettings {
                site_url,
                blog_title: env_or("BLOG_TITLE", "My blog"),
                posts_per_page,
                feed_items,
                email_from: env_or("EMAIL_FROM", "blog@localhost"),
            },
        })
    }
}

impl SiteSettings {
    /// Joins a site-relative path onto `SITE_URL`.
    pub fn absolute(&self, path: &str) -> String {
        match self.site_url.join(path) {
            Ok(url) => url.to_string(),
            Err(_) => path.to_string(),
        }
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_or_err(key: &str) -> Result<String> {
    std::env::var(key).map_err(|_| anyhow!("missing required env var: {}", key))
}

fn env_or_parse<T>(key: &str, default: &str) -> Result<T>
where
    T: FromStr,
    <T as FromStr>::Err: std::fmt::Display,
{
    let value = std::env::var(key).unwrap_or_else(|_| default.to_string());
    value
        .parse::<T>()
        .map_err(|err| anyhow!("invalid {}: {}", key, err))
}
