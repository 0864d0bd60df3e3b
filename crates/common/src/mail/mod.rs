//! Outgoing email
//!
//! Messages go through the `Mailer` trait so the delivery backend is chosen
//! from configuration: the log, a directory of files, or process memory.

use crate::config::{MailBackend, MailConfig};
use crate::errors::{AppError, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tracing::info;
use uuid::Uuid;

/// A rendered message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMail {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub body: String,
}

impl OutgoingMail {
    /// The message carrying a confirmation code
    pub fn confirmation_code(from: &str, to: &str, username: &str, code: &str) -> Self {
        Self {
            from: from.to_string(),
            to: to.to_string(),
            subject: "YaMDb confirmation code".to_string(),
            body: format!(
                "Hello, {}!\n\nYour confirmation code: {}\n\nExchange it for an access token at /v1/auth/token/.",
                username, code
            ),
        }
    }

    fn render(&self) -> String {
        format!(
            "From: {}\nTo: {}\nSubject: {}\nDate: {}\n\n{}\n",
            self.from,
            self.to,
            self.subject,
            Utc::now().to_rfc2822(),
            self.body
        )
    }
}

/// Mail delivery backend
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, mail: OutgoingMail) -> Result<()>;
}

/// Writes messages to the log
pub struct ConsoleMailer;

#[async_trait]
impl Mailer for ConsoleMailer {
    async fn send(&self, mail: OutgoingMail) -> Result<()> {
        info!(to = %mail.to, subject = %mail.subject, body = %mail.body, "Email sent");
        Ok(())
    }
}

/// Writes each message to its own `.eml` file
pub struct FileMailer {
    dir: PathBuf,
}

impl FileMailer {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

#[async_trait]
impl Mailer for FileMailer {
    async fn send(&self, mail: OutgoingMail) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir).await?;

        let path = self.dir.join(format!(
            "{}-{}.eml",
            Utc::now().format("%Y%m%d-%H%M%S"),
            Uuid::new_v4().simple()
        ));
        tokio::fs::write(&path, mail.render())
            .await
            .map_err(|e| AppError::Mail {
                message: format!("Failed to write {}: {}", path.display(), e),
            })?;

        info!(to = %mail.to, path = %path.display(), "Email written");
        Ok(())
    }
}

/// Keeps messages in memory; clones share the outbox
#[derive(Clone, Default)]
pub struct MemoryMailer {
    outbox: Arc<Mutex<Vec<OutgoingMail>>>,
}

impl MemoryMailer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything sent so far
    pub fn sent(&self) -> Vec<OutgoingMail> {
        self.outbox
            .lock()
            .map(|outbox| outbox.clone())
            .unwrap_or_default()
    }

    /// Most recent message to `address`
    pub fn last_to(&self, address: &str) -> Option<OutgoingMail> {
        self.sent().into_iter().rev().find(|m| m.to == address)
    }
}

#[async_trait]
impl Mailer for MemoryMailer {
    async fn send(&self, mail: OutgoingMail) -> Result<()> {
        let mut outbox = self.outbox.lock().map_err(|_| AppError::Mail {
            message: "Outbox lock poisoned".to_string(),
        })?;
        outbox.push(mail);
        Ok(())
    }
}

/// Build the configured mailer
pub fn mailer_from_config(config: &MailConfig) -> Arc<dyn Mailer> {
    match config.backend {
        MailBackend::Console => Arc::new(ConsoleMailer),
        MailBackend::File => Arc::new(FileMailer::new(&config.file_dir)),
        MailBackend::Memory => Arc::new(MemoryMailer::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message() -> OutgoingMail {
        OutgoingMail::confirmation_code("noreply@yamdb.local", "reader@example.com", "reader", "abc-123")
    }

    #[test]
    fn test_confirmation_message() {
        let mail = message();
        assert!(mail.body.contains("abc-123"));
        assert!(mail.body.contains("reader"));
        assert_eq!(mail.to, "reader@example.com");
    }

    #[tokio::test]
    async fn test_memory_mailer_shares_outbox() {
        let mailer = MemoryMailer::new();
        let handle = mailer.clone();

        mailer.send(message()).await.unwrap();

        assert_eq!(handle.sent().len(), 1);
        assert!(handle.last_to("reader@example.com").is_some());
        assert!(handle.last_to("nobody@example.com").is_none());
    }

    #[tokio::test]
    async fn test_file_mailer_writes_message() {
        let dir = std::env::temp_dir().join(format!("yamdb-mail-{}", Uuid::new_v4()));
        let mailer = FileMailer::new(&dir);

        mailer.send(message()).await.unwrap();

        let mut entries = std::fs::read_dir(&dir).unwrap();
        let path = entries.next().unwrap().unwrap().path();
        let contents = std::fs::read_to_string(path).unwrap();
        assert!(contents.contains("Subject: YaMDb confirmation code"));
        assert!(contents.contains("abc-123"));

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[tokio::test]
    async fn test_console_mailer() {
        assert!(ConsoleMailer.send(message()).await.is_ok());
    }
}
