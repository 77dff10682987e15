//! Re-sending the latest download link for an (email, book) pair.
//!
//! Resend limits live in [`ResendThrottle`], a value owned by the caller: the
//! client sends back the state it received last time and gets the updated one.

use super::error::DownloadError;
use super::issuer::validate_email;
use super::links::DownloadLinks;
use crate::notifications::{DownloadEmail, DownloadNotifier};
use crate::store::StorefrontStore;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

pub const RESEND_COOLDOWN_SECS: i64 = 120;
pub const MAX_RESENDS: u32 = 3;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ResendDenied {
    #[error("Please wait {retry_after_secs}s before requesting another email")]
    CoolingDown { retry_after_secs: i64 },
    #[error("Resend limit reached for this download")]
    LimitReached,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResendThrottle {
    #[serde(default)]
    pub last_sent_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub resend_count: u32,
}

impl ResendThrottle {
    pub fn check(&self, now: DateTime<Utc>) -> Result<(), ResendDenied> {
        if self.resend_count >= MAX_RESENDS {
            return Err(ResendDenied::LimitReached);
        }
        if let Some(last_sent_at) = self.last_sent_at {
            let ready_at = last_sent_at + Duration::seconds(RESEND_COOLDOWN_SECS);
            if now < ready_at {
                let remaining_ms = (ready_at - now).num_milliseconds();
                return Err(ResendDenied::CoolingDown {
                    retry_after_secs: (remaining_ms + 999) / 1000,
                });
            }
        }
        Ok(())
    }

    pub fn record(&self, now: DateTime<Utc>) -> ResendThrottle {
        ResendThrottle {
            last_sent_at: Some(now),
            resend_count: self.resend_count.saturating_add(1),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResendRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default, deserialize_with = "super::issuer::lenient_id")]
    pub book_id: Option<i64>,
    #[serde(default)]
    pub throttle: Option<ResendThrottle>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResendOutcome {
    pub email_sent: bool,
    /// Only handed back when the email could not be delivered.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub download_link: Option<String>,
    pub expires_at: DateTime<Utc>,
    pub throttle: ResendThrottle,
}

pub struct LinkResender {
    store: Arc<dyn StorefrontStore>,
    links: DownloadLinks,
    notifier: Arc<DownloadNotifier>,
}

impl LinkResender {
    pub fn new(
        store: Arc<dyn StorefrontStore>,
        links: DownloadLinks,
        notifier: Arc<DownloadNotifier>,
    ) -> Self {
        Self {
            store,
            links,
            notifier,
        }
    }

    pub async fn resend(&self, request: &ResendRequest) -> Result<ResendOutcome, DownloadError> {
        self.resend_at(request, Utc::now()).await
    }

    pub async fn resend_at(
        &self,
        request: &ResendRequest,
        now: DateTime<Utc>,
    ) -> Result<ResendOutcome, DownloadError> {
        let email = validate_email(request.email.as_deref())?;
        let book_id = request
            .book_id
            .ok_or_else(|| DownloadError::InvalidRequest("bookId is required".to_string()))?;

        let download = self
            .store
            .get_latest_download(&email, book_id)?
            .ok_or(DownloadError::NotFound("Download"))?;

        let throttle = request.throttle.unwrap_or_default();
        throttle.check(now)?;

        let book = self
            .store
            .get_book(download.book_id)?
            .ok_or(DownloadError::NotFound("Book"))?;

        let link = self.links.absolute(&download.download_link);
        let outcome = self
            .notifier
            .notify(&DownloadEmail {
                to: email.clone(),
                redemption_url: link.clone(),
                book_title: book.title.clone(),
                format: download.format,
            })
            .await;
        let email_sent = outcome.is_sent();
        if email_sent {
            info!("Resent download {} link by email", download.id);
        } else {
            debug!("Resend of download {} not delivered: {:?}", download.id, outcome);
        }

        Ok(ResendOutcome {
            email_sent,
            download_link: if email_sent { None } else { Some(link) },
            expires_at: download.expires_at,
            throttle: throttle.record(now),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::downloads::issuer::{IssueRequest, LinkIssuer};
    use crate::downloads::testing::{test_store, RecordingTransport, PDF_BOOK};
    use crate::notifications::MailTransport;

    #[test]
    fn throttle_enforces_cooldown_and_limit() {
        let now = Utc::now();
        let fresh = ResendThrottle::default();
        assert!(fresh.check(now).is_ok());

        let sent = fresh.record(now);
        assert_eq!(sent.resend_count, 1);
        assert_eq!(
            sent.check(now + Duration::seconds(30)),
            Err(ResendDenied::CoolingDown {
                retry_after_secs: 90
            })
        );
        assert!(sent.check(now + Duration::seconds(120)).is_ok());

        let exhausted = ResendThrottle {
            last_sent_at: Some(now - Duration::hours(1)),
            resend_count: MAX_RESENDS,
        };
        assert_eq!(exhausted.check(now), Err(ResendDenied::LimitReached));
    }

    fn resender(
        store: Arc<dyn StorefrontStore>,
        transport: Option<Arc<dyn MailTransport>>,
    ) -> LinkResender {
        LinkResender::new(
            store,
            DownloadLinks::new("http://localhost:3001", "/api"),
            Arc::new(DownloadNotifier::new(transport)),
        )
    }

    fn request(throttle: Option<ResendThrottle>) -> ResendRequest {
        ResendRequest {
            email: Some("a@b.com".to_string()),
            book_id: Some(PDF_BOOK),
            throttle,
        }
    }

    fn issue(store: &Arc<dyn StorefrontStore>, now: DateTime<Utc>) -> String {
        LinkIssuer::new(
            store.clone(),
            DownloadLinks::new("http://localhost:3001", "/api"),
            Duration::hours(24),
        )
        .issue_at(
            &IssueRequest {
                book_id: Some(PDF_BOOK),
                email: Some("a@b.com".to_string()),
                format: Some("PDF".to_string()),
                donation: None,
            },
            None,
            now,
        )
        .unwrap()
        .token
    }

    #[tokio::test]
    async fn resend_without_prior_download_is_not_found() {
        let (store, _dir) = test_store();
        let result = resender(store, None).resend(&request(None)).await;
        assert!(matches!(result, Err(DownloadError::NotFound("Download"))));
    }

    #[tokio::test]
    async fn resends_most_recent_link() {
        let (store, _dir) = test_store();
        let now = Utc::now();
        issue(&store, now - Duration::hours(2));
        let latest = issue(&store, now - Duration::hours(1));

        let transport = Arc::new(RecordingTransport::default());
        let outcome = resender(store, Some(transport.clone() as Arc<dyn MailTransport>))
            .resend_at(&request(None), now)
            .await
            .unwrap();

        assert!(outcome.email_sent);
        assert!(outcome.download_link.is_none());
        assert_eq!(outcome.throttle.resend_count, 1);
        let sent = transport.sent();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].html_body.contains(&latest));
    }

    #[tokio::test]
    async fn unconfigured_mail_returns_link_instead() {
        let (store, _dir) = test_store();
        let now = Utc::now();
        let token = issue(&store, now);

        let outcome = resender(store, None)
            .resend_at(&request(None), now)
            .await
            .unwrap();
        assert!(!outcome.email_sent);
        assert_eq!(
            outcome.download_link,
            Some(format!(
                "http://localhost:3001/api/downloads/download/{}",
                token
            ))
        );
    }

    #[tokio::test]
    async fn throttled_resend_is_rejected_without_sending() {
        let (store, _dir) = test_store();
        let now = Utc::now();
        issue(&store, now);

        let transport = Arc::new(RecordingTransport::default());
        let throttle = ResendThrottle {
            last_sent_at: Some(now - Duration::seconds(10)),
            resend_count: 1,
        };
        let result = resender(store, Some(transport.clone() as Arc<dyn MailTransport>))
            .resend_at(&request(Some(throttle)), now)
            .await;
        assert!(matches!(
            result,
            Err(DownloadError::Throttled(ResendDenied::CoolingDown { .. }))
        ));
        assert!(transport.sent().is_empty());
    }
}
