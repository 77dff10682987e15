//! Catalog seeding from a TOML file.
//!
//! ```toml
//! [[books]]
//! title = "The Rust Programming Language"
//! author = "Steve Klabnik"
//! formats = ["PDF", "EPUB"]
//! pdf_path = "rust-book.pdf"
//! epub_path = "rust-book.epub"
//! ```

use super::{NewBook, StorefrontStore};
use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::Path;
use tracing::{debug, info};

#[derive(Debug, Deserialize, Default)]
pub struct SeedFile {
    #[serde(default)]
    pub books: Vec<NewBook>,
}

impl SeedFile {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read seed file: {:?}", path))?;
        Self::parse(&content).with_context(|| format!("Failed to parse seed file: {:?}", path))
    }

    pub fn parse(content: &str) -> Result<Self> {
        let seed: SeedFile = toml::from_str(content)?;
        for book in &seed.books {
            if book.title.trim().is_empty() {
                bail!("Seeded books must have a title");
            }
            if book.formats.is_empty() {
                bail!("Book '{}' must offer at least one format", book.title);
            }
        }
        Ok(seed)
    }
}

/// Inserts every book whose title is not in the store yet.
/// Returns the number of books inserted.
pub fn seed_books(store: &dyn StorefrontStore, seed: &SeedFile) -> Result<usize> {
    let mut inserted = 0;
    for book in &seed.books {
        if store.find_book_by_title(&book.title)?.is_some() {
            debug!("Book '{}' already present, skipping", book.title);
            continue;
        }
        let id = store.insert_book(book)?;
        debug!("Seeded book '{}' with id {}", book.title, id);
        inserted += 1;
    }
    info!(
        "Seeded {} new book(s) out of {}",
        inserted,
        seed.books.len()
    );
    Ok(inserted)
}
