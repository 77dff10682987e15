use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// Books
// =============================================================================

/// File format a book can be delivered in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum BookFormat {
    Pdf,
    Epub,
}

impl BookFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookFormat::Pdf => "PDF",
            BookFormat::Epub => "EPUB",
        }
    }

    /// Case-insensitive parse, surrounding whitespace ignored.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PDF" => Some(BookFormat::Pdf),
            "EPUB" => Some(BookFormat::Epub),
            _ => None,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            BookFormat::Pdf => "pdf",
            BookFormat::Epub => "epub",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            BookFormat::Pdf => "application/pdf",
            BookFormat::Epub => "application/epub+zip",
        }
    }

    /// Formats are persisted as a comma separated list, e.g. `PDF,EPUB`.
    pub fn join(formats: &[BookFormat]) -> String {
        formats
            .iter()
            .map(|f| f.as_str())
            .collect::<Vec<_>>()
            .join(",")
    }

    pub fn split(s: &str) -> Vec<BookFormat> {
        s.split(',').filter_map(BookFormat::parse).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    pub id: i64,
    pub title: String,
    pub author: String,
    pub synopsis: Option<String>,
    pub preview_image: Option<String>,
    pub language: String,
    pub pages: i64,
    pub formats: Vec<BookFormat>,
    pub file_size: Option<String>,
    #[serde(skip_serializing)]
    pub pdf_path: Option<String>,
    #[serde(skip_serializing)]
    pub epub_path: Option<String>,
    pub download_count: i64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl Book {
    pub fn offers(&self, format: BookFormat) -> bool {
        self.formats.contains(&format)
    }

    /// Relative path of the asset for `format`, if one is configured.
    pub fn file_path_for(&self, format: BookFormat) -> Option<&str> {
        let path = match format {
            BookFormat::Pdf => self.pdf_path.as_deref(),
            BookFormat::Epub => self.epub_path.as_deref(),
        };
        path.filter(|p| !p.trim().is_empty())
    }

    pub fn download_filename(&self, format: BookFormat) -> String {
        format!("{}.{}", self.title, format.extension())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewBook {
    pub title: String,
    pub author: String,
    #[serde(default)]
    pub synopsis: Option<String>,
    #[serde(default)]
    pub preview_image: Option<String>,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default)]
    pub pages: i64,
    pub formats: Vec<BookFormat>,
    #[serde(default)]
    pub file_size: Option<String>,
    #[serde(default)]
    pub pdf_path: Option<String>,
    #[serde(default)]
    pub epub_path: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

fn default_language() -> String {
    "English".to_string()
}

fn default_true() -> bool {
    true
}

// =============================================================================
// Users
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    User,
    Admin,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::User => "user",
            UserRole::Admin => "admin",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "user" => Some(UserRole::User),
            "admin" => Some(UserRole::Admin),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub role: UserRole,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub role: UserRole,
}

// =============================================================================
// Downloads
// =============================================================================

/// Lifecycle state of a download grant, derived from its timestamps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DownloadStatus {
    Pending,
    Redeemed,
    Expired,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Download {
    pub id: i64,
    pub book_id: i64,
    pub user_id: Option<i64>,
    pub email: String,
    pub token: String,
    pub download_link: String,
    pub expires_at: DateTime<Utc>,
    pub downloaded_at: Option<DateTime<Utc>>,
    pub format: BookFormat,
    pub donation: i64,
    pub ip_address: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Download {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    pub fn status_at(&self, now: DateTime<Utc>) -> DownloadStatus {
        if self.is_expired_at(now) {
            DownloadStatus::Expired
        } else if self.downloaded_at.is_some() {
            DownloadStatus::Redeemed
        } else {
            DownloadStatus::Pending
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewDownload {
    pub book_id: i64,
    pub user_id: Option<i64>,
    pub email: String,
    pub token: String,
    pub download_link: String,
    pub expires_at: DateTime<Utc>,
    pub format: BookFormat,
    pub donation: i64,
    pub ip_address: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookSummary {
    pub id: i64,
    pub title: String,
    pub author: String,
    pub preview_image: Option<String>,
}

/// A past download as shown to its requester. The token is not exposed.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadHistoryEntry {
    pub id: i64,
    pub book: BookSummary,
    pub format: BookFormat,
    pub donation: i64,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub downloaded_at: Option<DateTime<Utc>>,
    pub status: DownloadStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TopBook {
    pub book: BookSummary,
    pub downloads: i64,
    pub total_donation: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadStats {
    pub total_downloads: i64,
    pub total_donation: i64,
    pub top_books: Vec<TopBook>,
}
