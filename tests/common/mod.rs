//! Common test infrastructure
//!
//! This module provides all the infrastructure needed for end-to-end tests.
//! Tests should only import from this module, not from internal submodules.
//!
//! # Example
//!
//! ```no_run
//! mod common;
//! use common::{TestServer, TestClient, PDF_BOOK_ID, TEST_EMAIL};
//! use reqwest::StatusCode;
//!
//! #[tokio::test]
//! async fn test_issue_link() {
//!     let server = TestServer::spawn().await;
//!     let client = TestClient::new(server.base_url.clone());
//!
//!     let response = client.create_download(PDF_BOOK_ID, TEST_EMAIL, "PDF").await;
//!     assert_eq!(response.status(), StatusCode::CREATED);
//! }
//! ```

#![allow(dead_code)]

mod client;
mod constants;
mod fixtures;
mod server;

// Public API - this is what tests import
pub use client::{session_token, token_of, TestClient};
pub use constants::*;
pub use server::TestServer;
