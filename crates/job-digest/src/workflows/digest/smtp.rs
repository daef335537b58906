use std::time::Duration;

use lettre::message::{Mailbox, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use tracing::{debug, info};

use super::delivery::{DeliveryError, DigestMailer, OutgoingMessage};
use crate::config::SmtpConfig;

/// Sends digests over an implicit-TLS SMTP relay as `text/plain` + `text/html` alternatives.
pub struct SmtpMailer {
    transport: SmtpTransport,
    sender: Mailbox,
    host: String,
}

impl SmtpMailer {
    pub fn new(config: &SmtpConfig, timeout: Duration) -> Result<Self, DeliveryError> {
        let sender = parse_sender(&config.username)?;
        let transport = SmtpTransport::relay(&config.host)
            .map_err(|err| DeliveryError::Transport {
                recipient: config.host.clone(),
                reason: err.to_string(),
            })?
            .port(config.port)
            .credentials(Credentials::new(
                config.username.clone(),
                config.password.clone(),
            ))
            .timeout(Some(timeout))
            .build();

        debug!(host = %config.host, port = config.port, "smtp relay configured");
        Ok(Self {
            transport,
            sender,
            host: config.host.clone(),
        })
    }

    pub fn host(&self) -> &str {
        &self.host
    }
}

impl DigestMailer for SmtpMailer {
    fn send(&self, message: &OutgoingMessage) -> Result<(), DeliveryError> {
        let email = build_message(&self.sender, message)?;
        self.transport
            .send(&email)
            .map_err(|err| DeliveryError::Transport {
                recipient: message.recipient.clone(),
                reason: err.to_string(),
            })?;
        info!(recipient = %message.recipient, "email sent");
        Ok(())
    }
}

fn parse_sender(address: &str) -> Result<Mailbox, DeliveryError> {
    address.parse().map_err(|err: lettre::address::AddressError| {
        DeliveryError::Sender {
            address: address.to_string(),
            reason: err.to_string(),
        }
    })
}

fn build_message(sender: &Mailbox, message: &OutgoingMessage) -> Result<Message, DeliveryError> {
    let transport_error = |reason: String| DeliveryError::Transport {
        recipient: message.recipient.clone(),
        reason,
    };
    let recipient: Mailbox = message
        .recipient
        .parse()
        .map_err(|err: lettre::address::AddressError| transport_error(err.to_string()))?;

    Message::builder()
        .from(sender.clone())
        .to(recipient)
        .subject(message.subject.as_str())
        .multipart(MultiPart::alternative_plain_html(
            message.text_body.clone(),
            message.html_body.clone(),
        ))
        .map_err(|err| transport_error(err.to_string()))
}
