//! SQLite schema for the storefront database.

use crate::sqlite_column;
use crate::sqlite_persistence::{ForeignKey, ForeignKeyOnChange, SqlType, Table, VersionedSchema};

// =============================================================================
// Version 1 - Books, users and download grants
// =============================================================================

const BOOKS_TABLE_V1: Table = Table {
    name: "books",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!("title", &SqlType::Text, non_null = true),
        sqlite_column!("author", &SqlType::Text, non_null = true),
        sqlite_column!("synopsis", &SqlType::Text),
        sqlite_column!("preview_image", &SqlType::Text),
        sqlite_column!(
            "language",
            &SqlType::Text,
            non_null = true,
            default_value = Some("'English'")
        ),
        sqlite_column!(
            "pages",
            &SqlType::Integer,
            non_null = true,
            default_value = Some("0")
        ),
        sqlite_column!("formats", &SqlType::Text, non_null = true), // "PDF,EPUB"
        sqlite_column!("file_size", &SqlType::Text),
        sqlite_column!("pdf_path", &SqlType::Text),
        sqlite_column!("epub_path", &SqlType::Text),
        sqlite_column!(
            "download_count",
            &SqlType::Integer,
            non_null = true,
            default_value = Some("0")
        ),
        sqlite_column!(
            "is_active",
            &SqlType::Integer,
            non_null = true,
            default_value = Some("1")
        ),
        sqlite_column!("created_at", &SqlType::Integer, non_null = true), // unix millis
    ],
    indices: &[("idx_books_title", "title")],
    unique_indices: &[],
};

const USERS_TABLE_V1: Table = Table {
    name: "users",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!("name", &SqlType::Text, non_null = true),
        sqlite_column!("email", &SqlType::Text, non_null = true),
        sqlite_column!(
            "role",
            &SqlType::Text,
            non_null = true,
            default_value = Some("'user'")
        ),
        sqlite_column!(
            "is_active",
            &SqlType::Integer,
            non_null = true,
            default_value = Some("1")
        ),
        sqlite_column!("created_at", &SqlType::Integer, non_null = true),
    ],
    indices: &[],
    unique_indices: &[("idx_users_email", "email")],
};

const DOWNLOAD_BOOK_FK: ForeignKey = ForeignKey {
    foreign_table: "books",
    foreign_column: "id",
    on_delete: ForeignKeyOnChange::Restrict,
};

const DOWNLOAD_USER_FK: ForeignKey = ForeignKey {
    foreign_table: "users",
    foreign_column: "id",
    on_delete: ForeignKeyOnChange::SetNull,
};

const DOWNLOADS_TABLE_V1: Table = Table {
    name: "downloads",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!(
            "book_id",
            &SqlType::Integer,
            non_null = true,
            foreign_key = Some(&DOWNLOAD_BOOK_FK)
        ),
        sqlite_column!(
            "user_id",
            &SqlType::Integer,
            foreign_key = Some(&DOWNLOAD_USER_FK)
        ),
        sqlite_column!("email", &SqlType::Text, non_null = true),
        sqlite_column!("token", &SqlType::Text, non_null = true), // UUIDv4
        sqlite_column!("download_link", &SqlType::Text, non_null = true),
        sqlite_column!("expires_at", &SqlType::Integer, non_null = true),
        sqlite_column!("downloaded_at", &SqlType::Integer), // set once, on first redemption
        sqlite_column!("format", &SqlType::Text, non_null = true),
        sqlite_column!(
            "donation",
            &SqlType::Integer,
            non_null = true,
            default_value = Some("0")
        ),
        sqlite_column!("ip_address", &SqlType::Text),
        sqlite_column!("created_at", &SqlType::Integer, non_null = true),
    ],
    indices: &[
        ("idx_downloads_expires_at", "expires_at"),
        (
            "idx_downloads_book_email_created",
            "book_id, email, created_at DESC",
        ),
        ("idx_downloads_email", "email"),
    ],
    unique_indices: &[("idx_downloads_token", "token")],
};

pub const STORE_VERSIONED_SCHEMAS: &[VersionedSchema] = &[VersionedSchema {
    version: 1,
    tables: &[BOOKS_TABLE_V1, USERS_TABLE_V1, DOWNLOADS_TABLE_V1],
    migration: None,
}];
