//! Test fixtures: a seeded store with book files on disk, a recording mail
//! transport and a stub payment gateway.

use super::constants::*;
use async_trait::async_trait;
use axum::{http::StatusCode, routing::post, Json, Router};
use ebook_storefront::notifications::{DeliveryError, MailTransport, OutgoingMail};
use ebook_storefront::store::seed::{seed_books, SeedFile};
use ebook_storefront::store::{SqliteStorefrontStore, StorefrontStore};
use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

const SEED: &str = r#"
[[books]]
title = "Test Driven Rust"
author = "Ferris Crab"
pages = 320
formats = ["PDF"]
pdf_path = "test-driven-rust.pdf"

[[books]]
title = "Async Chronicles"
author = "Tokio Team"
formats = ["EPUB"]
epub_path = "async-chronicles.epub"
"#;

/// Creates a temporary directory holding the database and book files.
///
/// Returns (temp_dir, db_path, files_dir, store).
pub fn create_test_store() -> anyhow::Result<(TempDir, PathBuf, PathBuf, Arc<dyn StorefrontStore>)>
{
    let dir = TempDir::new()?;
    let files_dir = dir.path().join("files");
    std::fs::create_dir_all(&files_dir)?;
    std::fs::write(files_dir.join("test-driven-rust.pdf"), PDF_BOOK_CONTENT)?;
    std::fs::write(files_dir.join("async-chronicles.epub"), b"PK epub content")?;

    let db_path = dir.path().join("storefront.db");
    let store: Arc<dyn StorefrontStore> = Arc::new(SqliteStorefrontStore::new(&db_path)?);
    let inserted = seed_books(store.as_ref(), &SeedFile::parse(SEED)?)?;
    assert_eq!(inserted, 2);

    Ok((dir, db_path, files_dir, store))
}

/// Mail transport that keeps every message instead of sending it.
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

/// Requests received by the stub gateway, by path.
pub type GatewayRequests = Arc<Mutex<Vec<(String, Value)>>>;

/// Stub gateway: accepts every payment except [`REJECTED_ORDER_ID`] and
/// acknowledges every update.
pub fn stub_gateway(requests: GatewayRequests) -> Router {
    let create_requests = requests.clone();
    Router::new()
        .route(
            "/payment/create",
            post(move |Json(body): Json<Value>| {
                let requests = create_requests.clone();
                async move {
                    requests
                        .lock()
                        .unwrap()
                        .push(("/payment/create".to_string(), body.clone()));
                    if body["order_id"] == REJECTED_ORDER_ID {
                        return (
                            StatusCode::UNPROCESSABLE_ENTITY,
                            Json(json!({"status": "error", "message": "invalid amount"})),
                        );
                    }
                    (
                        StatusCode::CREATED,
                        Json(json!({
                            "status": "success",
                            "content": {
                                "redirect_url": STUB_REDIRECT_URL,
                                "order_id": body["order_id"],
                            }
                        })),
                    )
                }
            }),
        )
        .route(
            "/payment/update",
            post(move |Json(body): Json<Value>| {
                let requests = requests.clone();
                async move {
                    requests
                        .lock()
                        .unwrap()
                        .push(("/payment/update".to_string(), body));
                    Json(json!({"status": "success", "message": "update stored"}))
                }
            }),
        )
}
