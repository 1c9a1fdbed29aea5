pub mod db;
pub mod mail;
pub mod templates;
