mod delivery;
mod render;
mod smtp;

pub use delivery::{
    deliver_and_record, DeliveryError, DeliveryReport, DigestMailer, OutboxMailer, OutgoingMessage,
};
pub use smtp::SmtpMailer;

use crate::workflows::discovery::FilteredJobRecord;

/// Subjects longer than this are cut and suffixed with `...`.
pub const SUBJECT_LIMIT: usize = 100;

/// The new postings of one run, ready to send.
#[derive(Debug, Clone, Default)]
pub struct Digest {
    records: Vec<FilteredJobRecord>,
}

impl Digest {
    pub fn new(records: Vec<FilteredJobRecord>) -> Self {
        Self { records }
    }

    pub fn records(&self) -> &[FilteredJobRecord] {
        &self.records
    }

    pub fn count(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Companies with postings in this digest, in the order they first appear.
    pub fn companies(&self) -> Vec<&str> {
        let mut companies: Vec<&str> = Vec::new();
        for record in &self.records {
            if !companies.contains(&record.company.as_str()) {
                companies.push(&record.company);
            }
        }
        companies
    }

    pub fn subject(&self) -> String {
        let subject = format!("New Job Postings from {}", self.companies().join(", "));
        if subject.chars().count() > SUBJECT_LIMIT {
            let truncated: String = subject.chars().take(SUBJECT_LIMIT).collect();
            format!("{truncated}...")
        } else {
            subject
        }
    }

    pub fn html(&self) -> String {
        render::render_html(self)
    }

    pub fn text(&self) -> String {
        render::render_text(self)
    }
}
