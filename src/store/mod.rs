mod models;
mod schema;
pub mod seed;
mod sqlite_store;

pub use models::*;
pub use schema::STORE_VERSIONED_SCHEMAS;
pub use sqlite_store::SqliteStorefrontStore;

use anyhow::Result;
use chrono::{DateTime, Utc};

/// Integrity failures callers may want to react to. Any other failure is
/// reported as a plain `anyhow::Error`.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("A record with the same {0} already exists")]
    Duplicate(&'static str),
    #[error("Referenced {0} does not exist")]
    MissingReference(&'static str),
}

pub trait StorefrontStore: Send + Sync {
    // Books
    fn insert_book(&self, book: &NewBook) -> Result<i64>;
    fn get_book(&self, id: i64) -> Result<Option<Book>>;
    fn find_book_by_title(&self, title: &str) -> Result<Option<Book>>;
    fn increment_book_download_count(&self, book_id: i64) -> Result<()>;

    // Users
    fn insert_user(&self, user: &NewUser) -> Result<i64>;
    fn find_user_by_email(&self, email: &str) -> Result<Option<User>>;

    // Downloads
    fn insert_download(&self, download: &NewDownload) -> Result<i64>;
    fn get_download_by_token(&self, token: &str) -> Result<Option<Download>>;
    /// Most recently issued download for the pair, ties broken by id.
    fn get_latest_download(&self, email: &str, book_id: i64) -> Result<Option<Download>>;
    fn get_download_history(
        &self,
        email: &str,
        now: DateTime<Utc>,
    ) -> Result<Vec<DownloadHistoryEntry>>;
    /// Sets `downloaded_at` unless already set. Returns true if this call set it.
    fn mark_downloaded(&self, download_id: i64, at: DateTime<Utc>) -> Result<bool>;
    fn get_download_stats(&self, top_limit: usize) -> Result<DownloadStats>;
}
