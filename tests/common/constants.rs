//! Shared constants for end-to-end tests
//!
//! When test data changes (book ids, emails, secrets, ...), update only this file.

// ============================================================================
// Test Catalog
// ============================================================================

/// "Test Driven Rust", offered as PDF only
pub const PDF_BOOK_ID: i64 = 1;

/// "Async Chronicles", offered as EPUB only
pub const EPUB_BOOK_ID: i64 = 2;

/// A book id that is never seeded
pub const MISSING_BOOK_ID: i64 = 999;

pub const PDF_BOOK_TITLE: &str = "Test Driven Rust";

pub const PDF_BOOK_CONTENT: &[u8] = b"%PDF-1.7 end-to-end test book";

// ============================================================================
// Test Identities
// ============================================================================

pub const TEST_EMAIL: &str = "a@b.com";

pub const OTHER_EMAIL: &str = "reader@example.com";

/// Secret the test server verifies admin session tokens with
pub const SESSION_SECRET: &str = "e2e-session-secret";

// ============================================================================
// Payment Gateway Stub
// ============================================================================

/// Order id the stub gateway refuses with 422
pub const REJECTED_ORDER_ID: &str = "ORD-REJECT";

pub const STUB_REDIRECT_URL: &str = "https://gateway.test/pay/ORD-1";

// ============================================================================
// Timing
// ============================================================================

pub const TOKEN_LENGTH: usize = 36;

pub const SERVER_READY_TIMEOUT_MS: u64 = 5000;

pub const SERVER_READY_POLL_INTERVAL_MS: u64 = 10;

pub const REQUEST_TIMEOUT_SECS: u64 = 10;
