//! Best-effort email delivery of download links.
//!
//! Delivery never fails the operation that triggered it: callers receive a
//! [`DeliveryOutcome`] and decide how to report it.

mod smtp;
mod template;

pub use smtp::{well_known_service, SmtpMailer};
pub use template::render_download_email;

use crate::server::metrics::record_email_delivery;
use crate::store::BookFormat;
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMail {
    pub to: String,
    pub subject: String,
    pub text_body: String,
    pub html_body: String,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DeliveryError {
    #[error("Mail server rejected the credentials: {0}")]
    Auth(String),
    #[error("Could not connect to mail server: {0}")]
    Connection(String),
    #[error("Mail server timed out: {0}")]
    Timeout(String),
    #[error("Mail server rejected the message: {0}")]
    Rejected(String),
    #[error("Invalid email address: {0}")]
    InvalidAddress(String),
}

impl DeliveryError {
    pub fn kind(&self) -> &'static str {
        match self {
            DeliveryError::Auth(_) => "auth",
            DeliveryError::Connection(_) => "connection",
            DeliveryError::Timeout(_) => "timeout",
            DeliveryError::Rejected(_) => "rejected",
            DeliveryError::InvalidAddress(_) => "invalid_address",
        }
    }
}

#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn deliver(&self, mail: &OutgoingMail) -> Result<(), DeliveryError>;
}

#[derive(Debug, Clone)]
pub struct DownloadEmail {
    pub to: String,
    pub redemption_url: String,
    pub book_title: String,
    pub format: BookFormat,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Sent,
    NotConfigured,
    Failed(DeliveryError),
}

impl DeliveryOutcome {
    pub fn is_sent(&self) -> bool {
        matches!(self, DeliveryOutcome::Sent)
    }

    fn metric_label(&self) -> &'static str {
        match self {
            DeliveryOutcome::Sent => "sent",
            DeliveryOutcome::NotConfigured => "not_configured",
            DeliveryOutcome::Failed(err) => err.kind(),
        }
    }
}

pub struct DownloadNotifier {
    transport: Option<Arc<dyn MailTransport>>,
}

impl DownloadNotifier {
    pub fn new(transport: Option<Arc<dyn MailTransport>>) -> Self {
        Self { transport }
    }

    pub fn is_configured(&self) -> bool {
        self.transport.is_some()
    }

    pub async fn notify(&self, email: &DownloadEmail) -> DeliveryOutcome {
        let outcome = match &self.transport {
            None => DeliveryOutcome::NotConfigured,
            Some(transport) => {
                let mail = render_download_email(email);
                match transport.deliver(&mail).await {
                    Ok(()) => {
                        info!("Download link for '{}' emailed", email.book_title);
                        DeliveryOutcome::Sent
                    }
                    Err(err) => {
                        warn!("Failed to email download link: {}", err);
                        DeliveryOutcome::Failed(err)
                    }
                }
            }
        };
        record_email_delivery(outcome.metric_label());
        outcome
    }
}
