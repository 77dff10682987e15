//! SMTP transport built on lettre.

use super::{DeliveryError, MailTransport, OutgoingMail};
use crate::config::MailSettings;
use anyhow::{Context, Result};
use async_trait::async_trait;
use lettre::message::{Mailbox, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::transport::smtp::client::{Tls, TlsParameters};
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::time::Duration;
use tracing::debug;

/// Host, port and implicit-TLS flag for the mail services we know by name.
pub fn well_known_service(name: &str) -> Option<(&'static str, u16, bool)> {
    match name.trim().to_ascii_lowercase().as_str() {
        "gmail" => Some(("smtp.gmail.com", 465, true)),
        "outlook" | "hotmail" | "office365" => Some(("smtp.office365.com", 587, false)),
        "yahoo" => Some(("smtp.mail.yahoo.com", 465, true)),
        "zoho" => Some(("smtp.zoho.com", 465, true)),
        "sendgrid" => Some(("smtp.sendgrid.net", 587, false)),
        "mailgun" => Some(("smtp.mailgun.org", 465, true)),
        _ => None,
    }
}

pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn new(settings: &MailSettings) -> Result<Self> {
        let builder = if settings.secure {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&settings.host)
                .with_context(|| format!("Invalid SMTP relay host {}", settings.host))?
        } else {
            let tls = TlsParameters::new(settings.host.clone())
                .context("Failed to build TLS parameters")?;
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&settings.host)
                .tls(Tls::Opportunistic(tls))
        };

        let mut builder = builder
            .port(settings.port)
            .timeout(Some(Duration::from_secs(settings.timeout_secs)));
        if let (Some(username), Some(password)) = (&settings.username, &settings.password) {
            builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
        }

        let from = settings
            .from
            .parse::<Mailbox>()
            .with_context(|| format!("Invalid sender address {}", settings.from))?;

        debug!(
            "SMTP transport configured for {}:{} (implicit TLS: {})",
            settings.host, settings.port, settings.secure
        );
        Ok(Self {
            transport: builder.build(),
            from,
        })
    }

    fn build_message(&self, mail: &OutgoingMail) -> Result<Message, DeliveryError> {
        let to = mail
            .to
            .parse::<Mailbox>()
            .map_err(|e| DeliveryError::InvalidAddress(format!("{}: {}", mail.to, e)))?;
        Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(mail.subject.clone())
            .multipart(MultiPart::alternative_plain_html(
                mail.text_body.clone(),
                mail.html_body.clone(),
            ))
            .map_err(|e| DeliveryError::Rejected(e.to_string()))
    }
}

fn classify_smtp_error(err: &lettre::transport::smtp::Error) -> DeliveryError {
    let message = err.to_string();
    if err.is_timeout() {
        return DeliveryError::Timeout(message);
    }
    if let Some(code) = err.status() {
        let code = code.to_string();
        if matches!(code.as_str(), "530" | "534" | "535") {
            return DeliveryError::Auth(message);
        }
    }
    if err.is_response() {
        DeliveryError::Rejected(message)
    } else {
        DeliveryError::Connection(message)
    }
}

#[async_trait]
impl MailTransport for SmtpMailer {
    async fn deliver(&self, mail: &OutgoingMail) -> Result<(), DeliveryError> {
        let message = self.build_message(mail)?;
        self.transport
            .send(message)
            .await
            .map(|_| ())
            .map_err(|e| classify_smtp_error(&e))
    }
}
