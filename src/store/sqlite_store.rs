use super::models::*;
use super::schema::STORE_VERSIONED_SCHEMAS;
use super::{StoreError, StorefrontStore};
use crate::sqlite_persistence::{
    bool_to_db, constraint_violation, ensure_parent_dir, from_db_millis, open_versioned_db,
    to_db_millis, ConstraintKind,
};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::debug;

const BOOK_COLUMNS: &str = "id, title, author, synopsis, preview_image, language, pages, \
     formats, file_size, pdf_path, epub_path, download_count, is_active, created_at";

const DOWNLOAD_COLUMNS: &str = "id, book_id, user_id, email, token, download_link, \
     expires_at, downloaded_at, format, donation, ip_address, created_at";

#[derive(Clone)]
pub struct SqliteStorefrontStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStorefrontStore {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let path = db_path.as_ref();
        ensure_parent_dir(path)?;
        let conn = open_versioned_db(path, STORE_VERSIONED_SCHEMAS)
            .context("Failed to open storefront database")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn row_to_book(row: &Row) -> rusqlite::Result<Book> {
        let formats: String = row.get("formats")?;
        Ok(Book {
            id: row.get("id")?,
            title: row.get("title")?,
            author: row.get("author")?,
            synopsis: row.get("synopsis")?,
            preview_image: row.get("preview_image")?,
            language: row.get("language")?,
            pages: row.get("pages")?,
            formats: BookFormat::split(&formats),
            file_size: row.get("file_size")?,
            pdf_path: row.get("pdf_path")?,
            epub_path: row.get("epub_path")?,
            download_count: row.get("download_count")?,
            is_active: row.get::<_, i64>("is_active")? != 0,
            created_at: from_db_millis(row.get("created_at")?),
        })
    }

    fn row_to_user(row: &Row) -> rusqlite::Result<User> {
        let role: String = row.get("role")?;
        Ok(User {
            id: row.get("id")?,
            name: row.get("name")?,
            email: row.get("email")?,
            role: UserRole::parse(&role).unwrap_or(UserRole::User),
            is_active: row.get::<_, i64>("is_active")? != 0,
            created_at: from_db_millis(row.get("created_at")?),
        })
    }

    fn row_to_download(row: &Row) -> rusqlite::Result<Download> {
        let format: String = row.get("format")?;
        let format = BookFormat::parse(&format).ok_or_else(|| {
            rusqlite::Error::InvalidColumnType(
                8,
                "format".to_string(),
                rusqlite::types::Type::Text,
            )
        })?;
        Ok(Download {
            id: row.get("id")?,
            book_id: row.get("book_id")?,
            user_id: row.get("user_id")?,
            email: row.get("email")?,
            token: row.get("token")?,
            download_link: row.get("download_link")?,
            expires_at: from_db_millis(row.get("expires_at")?),
            downloaded_at: row
                .get::<_, Option<i64>>("downloaded_at")?
                .map(from_db_millis),
            format,
            donation: row.get("donation")?,
            ip_address: row.get("ip_address")?,
            created_at: from_db_millis(row.get("created_at")?),
        })
    }

    fn map_insert_error(err: rusqlite::Error, unique: &'static str) -> anyhow::Error {
        match constraint_violation(&err) {
            Some(ConstraintKind::Unique) => StoreError::Duplicate(unique).into(),
            Some(ConstraintKind::ForeignKey) => StoreError::MissingReference("book").into(),
            _ => anyhow::Error::new(err),
        }
    }
}

impl StorefrontStore for SqliteStorefrontStore {
    fn insert_book(&self, book: &NewBook) -> Result<i64> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO books (title, author, synopsis, preview_image, language, pages, formats,
                file_size, pdf_path, epub_path, download_count, is_active, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, 0, ?11, ?12)",
            params![
                book.title,
                book.author,
                book.synopsis,
                book.preview_image,
                book.language,
                book.pages,
                BookFormat::join(&book.formats),
                book.file_size,
                book.pdf_path,
                book.epub_path,
                bool_to_db(book.is_active),
                to_db_millis(&Utc::now()),
            ],
        )
        .with_context(|| format!("Failed to insert book '{}'", book.title))?;
        Ok(conn.last_insert_rowid())
    }

    fn get_book(&self, id: i64) -> Result<Option<Book>> {
        let conn = self.conn.lock().unwrap();
        let book = conn
            .query_row(
                &format!("SELECT {} FROM books WHERE id = ?1", BOOK_COLUMNS),
                params![id],
                Self::row_to_book,
            )
            .optional()?;
        Ok(book)
    }

    fn find_book_by_title(&self, title: &str) -> Result<Option<Book>> {
        let conn = self.conn.lock().unwrap();
        let book = conn
            .query_row(
                &format!(
                    "SELECT {} FROM books WHERE title = ?1 ORDER BY id LIMIT 1",
                    BOOK_COLUMNS
                ),
                params![title],
                Self::row_to_book,
            )
            .optional()?;
        Ok(book)
    }

    fn increment_book_download_count(&self, book_id: i64) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "UPDATE books SET download_count = download_count + 1 WHERE id = ?1",
            params![book_id],
        )?;
        Ok(())
    }

    fn insert_user(&self, user: &NewUser) -> Result<i64> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO users (name, email, role, is_active, created_at)
             VALUES (?1, ?2, ?3, 1, ?4)",
            params![
                user.name,
                user.email,
                user.role.as_str(),
                to_db_millis(&Utc::now())
            ],
        )
        .map_err(|e| Self::map_insert_error(e, "email"))?;
        Ok(conn.last_insert_rowid())
    }

    fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let conn = self.conn.lock().unwrap();
        let user = conn
            .query_row(
                "SELECT id, name, email, role, is_active, created_at
                 FROM users WHERE email = ?1",
                params![email],
                Self::row_to_user,
            )
            .optional()?;
        Ok(user)
    }

    fn insert_download(&self, download: &NewDownload) -> Result<i64> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO downloads (book_id, user_id, email, token, download_link, expires_at,
                downloaded_at, format, donation, ip_address, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, NULL, ?7, ?8, ?9, ?10)",
            params![
                download.book_id,
                download.user_id,
                download.email,
                download.token,
                download.download_link,
                to_db_millis(&download.expires_at),
                download.format.as_str(),
                download.donation,
                download.ip_address,
                to_db_millis(&download.created_at),
            ],
        )
        .map_err(|e| Self::map_insert_error(e, "token"))?;
        let id = conn.last_insert_rowid();
        debug!("Inserted download {} for book {}", id, download.book_id);
        Ok(id)
    }

    fn get_download_by_token(&self, token: &str) -> Result<Option<Download>> {
        let conn = self.conn.lock().unwrap();
        let download = conn
            .query_row(
                &format!("SELECT {} FROM downloads WHERE token = ?1", DOWNLOAD_COLUMNS),
                params![token],
                Self::row_to_download,
            )
            .optional()?;
        Ok(download)
    }

    fn get_latest_download(&self, email: &str, book_id: i64) -> Result<Option<Download>> {
        let conn = self.conn.lock().unwrap();
        let download = conn
            .query_row(
                &format!(
                    "SELECT {} FROM downloads
                     WHERE book_id = ?1 AND email = ?2
                     ORDER BY created_at DESC, id DESC
                     LIMIT 1",
                    DOWNLOAD_COLUMNS
                ),
                params![book_id, email],
                Self::row_to_download,
            )
            .optional()?;
        Ok(download)
    }

    fn get_download_history(
        &self,
        email: &str,
        now: DateTime<Utc>,
    ) -> Result<Vec<DownloadHistoryEntry>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT d.id, d.book_id, d.user_id, d.email, d.token, d.download_link,
                    d.expires_at, d.downloaded_at, d.format, d.donation, d.ip_address,
                    d.created_at, b.title, b.author, b.preview_image
             FROM downloads d
             JOIN books b ON b.id = d.book_id
             WHERE d.email = ?1
             ORDER BY d.created_at DESC, d.id DESC",
        )?;
        let entries = stmt
            .query_map(params![email], |row| {
                let download = Self::row_to_download(row)?;
                Ok(DownloadHistoryEntry {
                    id: download.id,
                    book: BookSummary {
                        id: download.book_id,
                        title: row.get("title")?,
                        author: row.get("author")?,
                        preview_image: row.get("preview_image")?,
                    },
                    format: download.format,
                    donation: download.donation,
                    created_at: download.created_at,
                    expires_at: download.expires_at,
                    downloaded_at: download.downloaded_at,
                    status: download.status_at(now),
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    fn mark_downloaded(&self, download_id: i64, at: DateTime<Utc>) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let changed = conn.execute(
            "UPDATE downloads SET downloaded_at = ?1 WHERE id = ?2 AND downloaded_at IS NULL",
            params![to_db_millis(&at), download_id],
        )?;
        Ok(changed == 1)
    }

    fn get_download_stats(&self, top_limit: usize) -> Result<DownloadStats> {
        let conn = self.conn.lock().unwrap();
        let (total_downloads, total_donation): (i64, i64) = conn.query_row(
            "SELECT COUNT(downloaded_at), COALESCE(SUM(donation), 0) FROM downloads",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;

        let mut stmt = conn.prepare(
            "SELECT b.id, b.title, b.author, b.preview_image,
                    COUNT(*) AS downloads,
                    COALESCE(SUM(d.donation), 0) AS total_donation
             FROM downloads d
             JOIN books b ON b.id = d.book_id
             WHERE d.downloaded_at IS NOT NULL
             GROUP BY b.id
             ORDER BY downloads DESC, b.id ASC
             LIMIT ?1",
        )?;
        let top_books = stmt
            .query_map(params![top_limit as i64], |row| {
                Ok(TopBook {
                    book: BookSummary {
                        id: row.get(0)?,
                        title: row.get(1)?,
                        author: row.get(2)?,
                        preview_image: row.get(3)?,
                    },
                    downloads: row.get(4)?,
                    total_donation: row.get(5)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(DownloadStats {
            total_downloads,
            total_donation,
            top_books,
        })
    }
}
