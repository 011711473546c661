//! Digest delivery.
//!
//! The outbound channel is a plain SMTP relay. Delivery sits behind the
//! [`Mailer`] trait so the pipeline can be exercised end-to-end against an
//! in-memory implementation.

use async_trait::async_trait;
use lettre::message::{Mailbox, MultiPart};
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use thiserror::Error;
use tracing::debug;

/// One rendered digest, ready to send.
#[derive(Debug, Clone)]
pub struct OutgoingMail {
    pub to: String,
    pub subject: String,
    pub text: String,
    pub html: String,
}

/// Delivery errors.
#[derive(Error, Debug)]
pub enum MailError {
    #[error("Invalid address: {0}")]
    Address(#[from] lettre::address::AddressError),

    #[error("Malformed message: {0}")]
    Message(#[from] lettre::error::Error),

    #[error("SMTP error: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, mail: &OutgoingMail) -> Result<(), MailError>;
}

/// Sends digests through a fixed outbound relay, as multipart/alternative
/// text + HTML from a fixed sender address.
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    sender: Mailbox,
}

impl SmtpMailer {
    /// `relay` is the SMTP host to hand the message to; no TLS or auth is
    /// negotiated (the relay is on a trusted network).
    pub fn new(relay: &str, sender: &str) -> Result<Self, MailError> {
        let transport = AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(relay).build();
        Ok(Self {
            transport,
            sender: sender.parse()?,
        })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, mail: &OutgoingMail) -> Result<(), MailError> {
        let message = Message::builder()
            .from(self.sender.clone())
            .to(mail.to.parse::<Mailbox>()?)
            .subject(mail.subject.clone())
            .multipart(MultiPart::alternative_plain_html(
                mail.text.clone(),
                mail.html.clone(),
            ))?;

        self.transport.send(message).await?;
        debug!(to = %mail.to, "Digest sent");
        Ok(())
    }
}

/// Collecting mailer used by tests: records every message instead of
/// sending it.
#[derive(Default)]
pub struct MemoryMailer {
    sent: std::sync::Mutex<Vec<OutgoingMail>>,
}

impl MemoryMailer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything sent so far, in order.
    pub fn sent(&self) -> Vec<OutgoingMail> {
        self.sent.lock().expect("mailer lock poisoned").clone()
    }
}

#[async_trait]
impl Mailer for MemoryMailer {
    async fn send(&self, mail: &OutgoingMail) -> Result<(), MailError> {
        self.sent
            .lock()
            .expect("mailer lock poisoned")
            .push(mail.clone());
        Ok(())
    }
}
