//! E-book storefront server library
//!
//! This library exposes the internal modules for testing and potential reuse.

pub mod config;
pub mod downloads;
pub mod notifications;
pub mod payment;
pub mod server;
pub mod sqlite_persistence;
pub mod store;

// Re-export commonly used types for convenience
pub use server::{make_app, run_server, RequestsLoggingLevel, ServerConfig};
pub use store::{SqliteStorefrontStore, StorefrontStore};
