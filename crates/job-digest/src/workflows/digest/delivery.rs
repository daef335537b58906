use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use tracing::{info, warn};

use super::Digest;
use crate::workflows::discovery::{HistoryEntry, HistoryError, HistoryStore};

/// One rendered digest addressed to one recipient.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMessage {
    pub recipient: String,
    pub subject: String,
    pub html_body: String,
    pub text_body: String,
    pub generated_at: NaiveDateTime,
}

#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    #[error("no email recipients are configured")]
    NoRecipients,
    #[error("failed to send digest to {recipient}: {reason}")]
    Transport { recipient: String, reason: String },
    #[error("sender address {address} is invalid: {reason}")]
    Sender { address: String, reason: String },
    #[error("unable to write {path}: {source}")]
    Outbox {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("digest sent but history could not be saved: {0}")]
    History(#[from] HistoryError),
}

/// Outbound transport for digests.
pub trait DigestMailer: Send + Sync {
    fn send(&self, message: &OutgoingMessage) -> Result<(), DeliveryError>;
}

/// Writes each message as an HTML file instead of sending it.
#[derive(Debug, Clone)]
pub struct OutboxMailer {
    dir: PathBuf,
}

impl OutboxMailer {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn message_path(&self, message: &OutgoingMessage) -> PathBuf {
        self.dir.join(format!(
            "digest-{}-{}.html",
            message.generated_at.format("%Y%m%d-%H%M%S"),
            slugify_recipient(&message.recipient)
        ))
    }
}

impl DigestMailer for OutboxMailer {
    fn send(&self, message: &OutgoingMessage) -> Result<(), DeliveryError> {
        let outbox_error = |path: &Path, source| DeliveryError::Outbox {
            path: path.to_path_buf(),
            source,
        };
        fs::create_dir_all(&self.dir).map_err(|source| outbox_error(&self.dir, source))?;

        let path = self.message_path(message);
        let contents = format!(
            "<!-- To: {} -->\n<!-- Subject: {} -->\n{}",
            message.recipient.replace("--", "-"),
            message.subject.replace("--", "-"),
            message.html_body
        );
        fs::write(&path, contents).map_err(|source| outbox_error(&path, source))?;
        info!(recipient = %message.recipient, path = %path.display(), "digest written to outbox");
        Ok(())
    }
}

fn slugify_recipient(recipient: &str) -> String {
    let mut slug = recipient
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '-'
            }
        })
        .collect::<String>();
    while slug.contains("--") {
        slug = slug.replace("--", "-");
    }
    let trimmed = slug.trim_matches('-');
    if trimmed.is_empty() {
        "recipient".to_string()
    } else {
        trimmed.to_string()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    pub messages_sent: usize,
    pub jobs_recorded: usize,
}

/// Send the digest to every recipient, then append its postings to history.
///
/// History is only written once every recipient has been sent the digest, so a
/// failed delivery is retried on the next run.
pub fn deliver_and_record(
    digest: &Digest,
    recipients: &[String],
    mailer: &dyn DigestMailer,
    history: &dyn HistoryStore,
    now: NaiveDateTime,
) -> Result<DeliveryReport, DeliveryError> {
    if digest.is_empty() {
        info!("No new jobs to send.");
        return Ok(DeliveryReport::default());
    }

    let recipients: Vec<&str> = recipients
        .iter()
        .map(|recipient| recipient.trim())
        .filter(|recipient| !recipient.is_empty())
        .collect();
    if recipients.is_empty() {
        warn!(jobs = digest.count(), "new jobs found but nobody to send them to");
        return Err(DeliveryError::NoRecipients);
    }

    let subject = digest.subject();
    let html_body = digest.html();
    let text_body = digest.text();
    let mut report = DeliveryReport::default();

    for recipient in recipients {
        let message = OutgoingMessage {
            recipient: recipient.to_string(),
            subject: subject.clone(),
            html_body: html_body.clone(),
            text_body: text_body.clone(),
            generated_at: now,
        };
        mailer.send(&message)?;
        info!(recipient, "email sent successfully");
        report.messages_sent += 1;
    }

    let entries: Vec<HistoryEntry> = digest
        .records()
        .iter()
        .map(|record| HistoryEntry::from_record(record, now))
        .collect();
    history.append(&entries)?;
    report.jobs_recorded = entries.len();
    info!(count = report.jobs_recorded, "saved sent jobs to history");

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recipients_become_file_safe_slugs() {
        assert_eq!(
            slugify_recipient("Ada.Lovelace+jobs@example.com"),
            "ada-lovelace-jobs-example-com"
        );
        assert_eq!(slugify_recipient("@@"), "recipient");
    }
}
