//! Outbound email backends.
//!
//! `LogMailer` writes every message through `tracing` and is the default for
//! local runs. `MemoryMailer` keeps an in-process outbox that tests (and
//! development tooling) can inspect.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde::Serialize;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmailMessage {
    pub subject: String,
    pub body: String,
    pub from: String,
    pub to: Vec<String>,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: EmailMessage) -> Result<()>;
}

pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, message: EmailMessage) -> Result<()> {
        tracing::info!(
            from = %message.from,
            to = ?message.to,
            subject = %message.subject,
            body = %message.body,
            "email sent"
        );
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryMailer {
    outbox: Mutex<Vec<EmailMessage>>,
}

impl MemoryMailer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every message sent so far, oldest first.
    pub fn outbox(&self) -> Vec<EmailMessage> {
        match self.outbox.lock() {
            Ok(outbox) => outbox.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

#[async_trait]
impl Mailer for MemoryMailer {
    async fn send(&self, message: EmailMessage) -> Result<()> {
        let mut outbox = self
            .outbox
            .lock()
            .map_err(|_| anyhow!("mail outbox lock poisoned"))?;
        outbox.push(message);
        Ok(())
    }
}

pub fn from_backend(name: &str) -> Result<Arc<dyn Mailer>> {
    match name {
        "log" => Ok(Arc::new(LogMailer)),
        "memory" => Ok(Arc::new(MemoryMailer::new())),
        other => Err(anyhow!("unknown EMAIL_BACKEND: {}", other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(subject: &str) -> EmailMessage {
        EmailMessage {
            subject: subject.to_string(),
            body: "body".into(),
            from: "blog@localhost".into(),
            to: vec!["reader@example.com".into()],
        }
    }

    #[tokio::test]
    async fn memory_mailer_records_messages_in_order() {
        let mailer = MemoryMailer::new();
        mailer.send(message("first")).await.unwrap();
        mailer.send(message("second")).await.unwrap();

        let outbox = mailer.outbox();
        assert_eq!(outbox.len(), 2);
        assert_eq!(outbox[0].subject, "first");
        assert_eq!(outbox[1].subject, "second");
    }

    #[test]
    fn unknown_backend_is_rejected() {
        assert!(from_backend("smtp").is_err());
        assert!(from_backend("log").is_ok());
        assert!(from_backend("memory").is_ok());
    }
}
