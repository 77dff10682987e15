//! Fixtures shared by the download unit tests.

use crate::notifications::{DeliveryError, MailTransport, OutgoingMail};
use crate::store::{BookFormat, NewBook, SqliteStorefrontStore, StorefrontStore};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

pub const PDF_BOOK: i64 = 1;
pub const EPUB_ONLY_BOOK: i64 = 2;
pub const INACTIVE_BOOK: i64 = 3;
pub const MISSING_EPUB_BOOK: i64 = 4;
pub const MISSING_FILE_BOOK: i64 = 5;

pub const PDF_BOOK_CONTENT: &[u8] = b"%PDF-1.4 test book";

fn book(title: &str, formats: Vec<BookFormat>, pdf: Option<&str>, epub: Option<&str>) -> NewBook {
    NewBook {
        title: title.to_string(),
        author: "Test Author".to_string(),
        synopsis: None,
        preview_image: None,
        language: "English".to_string(),
        pages: 100,
        formats,
        file_size: None,
        pdf_path: pdf.map(str::to_string),
        epub_path: epub.map(str::to_string),
        is_active: true,
    }
}

/// Store with five books (ids 1..=5) and their files under `<dir>/files`.
pub fn test_store() -> (Arc<dyn StorefrontStore>, TempDir) {
    let dir = TempDir::new().unwrap();
    let files_dir = dir.path().join("files");
    std::fs::create_dir_all(&files_dir).unwrap();
    std::fs::write(files_dir.join("pdf-book.pdf"), PDF_BOOK_CONTENT).unwrap();
    std::fs::write(files_dir.join("epub-book.epub"), b"PK epub").unwrap();

    let store = SqliteStorefrontStore::new(dir.path().join("store.db")).unwrap();
    let books = [
        book("Pdf Book", vec![BookFormat::Pdf], Some("pdf-book.pdf"), None),
        book("Epub Book", vec![BookFormat::Epub], None, Some("epub-book.epub")),
        NewBook {
            is_active: false,
            ..book("Hidden Book", vec![BookFormat::Pdf], Some("pdf-book.pdf"), None)
        },
        book(
            "Half Book",
            vec![BookFormat::Pdf, BookFormat::Epub],
            Some("pdf-book.pdf"),
            None,
        ),
        book("Lost Book", vec![BookFormat::Pdf], Some("lost.pdf"), None),
    ];
    for new_book in books.iter() {
        store.insert_book(new_book).unwrap();
    }
    (Arc::new(store), dir)
}

#[derive(Default)]
pub struct RecordingTransport {
    sent: Mutex<Vec<OutgoingMail>>,
}

impl RecordingTransport {
    pub fn sent(&self) -> Vec<OutgoingMail> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl MailTransport for RecordingTransport {
    async fn deliver(&self, mail: &OutgoingMail) -> Result<(), DeliveryError> {
        self.sent.lock().unwrap().push(mail.clone());
        Ok(())
    }
}
