use super::error::DownloadError;
use super::token::looks_like_token;
use crate::store::{Book, Download, StorefrontStore};
use chrono::{DateTime, Utc};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use tokio::fs::File;
use tracing::{debug, info, warn};

/// An open book file ready to be streamed to the client.
#[derive(Debug)]
pub struct RedeemedFile {
    pub file: File,
    pub length: u64,
    pub filename: String,
    pub content_type: &'static str,
    /// True when this redemption set `downloaded_at`.
    pub first_redemption: bool,
}

pub struct RedemptionHandler {
    store: Arc<dyn StorefrontStore>,
    files_dir: PathBuf,
}

impl RedemptionHandler {
    pub fn new(store: Arc<dyn StorefrontStore>, files_dir: PathBuf) -> Self {
        Self { store, files_dir }
    }

    pub async fn redeem(&self, token: &str) -> Result<RedeemedFile, DownloadError> {
        self.redeem_at(token, Utc::now()).await
    }

    pub async fn redeem_at(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<RedeemedFile, DownloadError> {
        if !looks_like_token(token) {
            return Err(DownloadError::NotFound("Download"));
        }
        let download = self
            .store
            .get_download_by_token(token)?
            .ok_or(DownloadError::NotFound("Download"))?;

        if download.is_expired_at(now) {
            debug!("Download {} expired at {}", download.id, download.expires_at);
            return Err(DownloadError::Expired);
        }

        let book = self
            .store
            .get_book(download.book_id)?
            .ok_or(DownloadError::NotFound("Book"))?;

        let relative_path = book
            .file_path_for(download.format)
            .ok_or_else(|| DownloadError::UnsupportedFormat(download.format.as_str().to_string()))?
            .to_string();

        let first_redemption = self.record_first_redemption(&download, &book, now)?;

        let path = self
            .resolve_file(&relative_path)
            .ok_or(DownloadError::FileNotFound)?;
        let file = match File::open(&path).await {
            Ok(file) => file,
            Err(err) => {
                warn!("Cannot open book file {}: {}", path.display(), err);
                return Err(DownloadError::FileNotFound);
            }
        };
        let length = file
            .metadata()
            .await
            .map_err(|e| DownloadError::Internal(e.into()))?
            .len();

        Ok(RedeemedFile {
            file,
            length,
            filename: book.download_filename(download.format),
            content_type: download.format.content_type(),
            first_redemption,
        })
    }

    fn record_first_redemption(
        &self,
        download: &Download,
        book: &Book,
        now: DateTime<Utc>,
    ) -> Result<bool, DownloadError> {
        if download.downloaded_at.is_some() {
            return Ok(false);
        }
        // Concurrent first redemptions race on the conditional update, only one wins.
        if !self.store.mark_downloaded(download.id, now)? {
            return Ok(false);
        }
        self.store.increment_book_download_count(book.id)?;
        info!("Download {} redeemed for book {}", download.id, book.id);
        Ok(true)
    }

    /// Joins a stored relative path onto the files directory, refusing anything
    /// that could escape it.
    fn resolve_file(&self, relative_path: &str) -> Option<PathBuf> {
        let relative = Path::new(relative_path.trim_start_matches('/'));
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if escapes {
            warn!("Refusing to serve path outside files dir: {}", relative_path);
            return None;
        }
        Some(self.files_dir.join(relative))
    }
}
