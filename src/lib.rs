pub mod app;
pub mod config;
pub mod domain;
pub mod http;
pub mod infra;

use std::sync::Arc;

use tera::Tera;

use crate::config::SiteSettings;
use crate::infra::{db::Db, mail::Mailer};

#[derive(Clone)]
pub struct AppState {
    pub db: Db,
    pub templates: Arc<Tera>,
    pub mailer: Arc<dyn Mailer>,
    pub site: SiteSettings,
    pub admin_token: Option<String>,
}
