use super::error::DownloadError;
use super::links::DownloadLinks;
use super::token::generate_token;
use crate::store::{Book, BookFormat, NewDownload, StoreError, StorefrontStore};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Deserializer};
use std::sync::Arc;
use tracing::{debug, info, warn};

const MAX_TOKEN_ATTEMPTS: usize = 3;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueRequest {
    #[serde(default, deserialize_with = "lenient_id")]
    pub book_id: Option<i64>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default)]
    pub donation: Option<i64>,
}

/// Accepts ids sent either as JSON numbers or as numeric strings.
pub(crate) fn lenient_id<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Number(i64),
        Text(String),
    }

    Ok(match Option::<RawId>::deserialize(deserializer)? {
        Some(RawId::Number(n)) => Some(n),
        Some(RawId::Text(s)) => s.trim().parse().ok(),
        None => None,
    })
}

pub(crate) fn validate_email(email: Option<&str>) -> Result<String, DownloadError> {
    let email = email.map(str::trim).unwrap_or_default();
    if email.is_empty() {
        return Err(DownloadError::InvalidRequest("email is required".to_string()));
    }
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => {
            Ok(email.to_string())
        }
        _ => Err(DownloadError::InvalidRequest(format!(
            "'{}' is not a valid email address",
            email
        ))),
    }
}

#[derive(Debug)]
struct ValidIssueRequest {
    book_id: i64,
    email: String,
    format: String,
    donation: i64,
}

impl IssueRequest {
    fn validate(&self) -> Result<ValidIssueRequest, DownloadError> {
        let book_id = self
            .book_id
            .ok_or_else(|| DownloadError::InvalidRequest("bookId is required".to_string()))?;
        let email = validate_email(self.email.as_deref())?;
        let format = self
            .format
            .as_deref()
            .map(str::trim)
            .filter(|f| !f.is_empty())
            .ok_or_else(|| DownloadError::InvalidRequest("format is required".to_string()))?;
        let donation = self.donation.unwrap_or(0);
        if donation < 0 {
            return Err(DownloadError::InvalidRequest(
                "donation must not be negative".to_string(),
            ));
        }
        Ok(ValidIssueRequest {
            book_id,
            email,
            format: format.to_string(),
            donation,
        })
    }
}

#[derive(Debug, Clone)]
pub struct IssuedLink {
    pub download_id: i64,
    pub token: String,
    pub email: String,
    pub download_link: String,
    pub format: BookFormat,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub book: Book,
}

/// Mints time-limited download grants.
pub struct LinkIssuer {
    store: Arc<dyn StorefrontStore>,
    links: DownloadLinks,
    ttl: Duration,
}

impl LinkIssuer {
    pub fn new(store: Arc<dyn StorefrontStore>, links: DownloadLinks, ttl: Duration) -> Self {
        Self { store, links, ttl }
    }

    pub fn issue(
        &self,
        request: &IssueRequest,
        ip_address: Option<String>,
    ) -> Result<IssuedLink, DownloadError> {
        self.issue_at(request, ip_address, Utc::now())
    }

    pub fn issue_at(
        &self,
        request: &IssueRequest,
        ip_address: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<IssuedLink, DownloadError> {
        let request = request.validate()?;

        let book = match self.store.get_book(request.book_id)? {
            Some(book) if book.is_active => book,
            Some(_) => {
                debug!("Book {} is not active", request.book_id);
                return Err(DownloadError::NotFound("Book"));
            }
            None => return Err(DownloadError::NotFound("Book")),
        };

        let format = BookFormat::parse(&request.format)
            .filter(|f| book.offers(*f))
            .ok_or_else(|| DownloadError::FormatUnavailable(request.format.clone()))?;

        let user_id = self
            .store
            .find_user_by_email(&request.email)?
            .map(|user| user.id);

        let expires_at = now + self.ttl;
        for attempt in 1..=MAX_TOKEN_ATTEMPTS {
            let token = generate_token();
            let new_download = NewDownload {
                book_id: book.id,
                user_id,
                email: request.email.clone(),
                token: token.clone(),
                download_link: self.links.path(&token),
                expires_at,
                format,
                donation: request.donation,
                ip_address: ip_address.clone(),
                created_at: now,
            };

            match self.store.insert_download(&new_download) {
                Ok(download_id) => {
                    info!(
                        "Issued download {} for book {} ({})",
                        download_id,
                        book.id,
                        format.as_str()
                    );
                    return Ok(IssuedLink {
                        download_id,
                        download_link: self.links.url(&token),
                        token,
                        email: request.email,
                        format,
                        created_at: now,
                        expires_at,
                        book,
                    });
                }
                Err(err) => match err.downcast_ref::<StoreError>() {
                    Some(StoreError::Duplicate(_)) => {
                        warn!("Token collision on attempt {}, retrying", attempt);
                    }
                    Some(StoreError::MissingReference(_)) => {
                        return Err(DownloadError::NotFound("Book"));
                    }
                    None => return Err(err.into()),
                },
            }
        }

        Err(DownloadError::Internal(anyhow::anyhow!(
            "Could not generate a unique download token"
        )))
    }
}
