//! Test server lifecycle management
//!
//! This module manages spawning and shutting down test HTTP servers.
//! Each test gets an isolated server with its own database, book files and
//! stub payment gateway.

use super::constants::*;
use super::fixtures::{create_test_store, stub_gateway, GatewayRequests, RecordingTransport};
use ebook_storefront::notifications::MailTransport;
use ebook_storefront::payment::{HttpPaymentGateway, PaymentGateway};
use ebook_storefront::server::{make_app, RequestsLoggingLevel, ServerConfig};
use ebook_storefront::store::StorefrontStore;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use tokio::net::TcpListener;

/// Test server instance with an isolated database
///
/// When dropped, the server and its stub gateway shut down and temp
/// resources are cleaned up.
pub struct TestServer {
    /// Base URL for making requests (e.g., "http://127.0.0.1:12345")
    pub base_url: String,

    /// Store for direct database access in tests
    pub store: Arc<dyn StorefrontStore>,

    /// Messages handed to the mail transport, when one is configured
    pub mail: Option<Arc<RecordingTransport>>,

    /// Requests received by the stub gateway
    pub gateway_requests: GatewayRequests,

    db_path: PathBuf,

    // Private fields - keep resources alive until drop
    _temp_dir: TempDir,
    _shutdown_txs: Vec<tokio::sync::oneshot::Sender<()>>,
}

async fn spawn_router(router: axum::Router) -> (String, tokio::sync::oneshot::Sender<()>) {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind to random port");
    let port = listener
        .local_addr()
        .expect("Failed to get local address")
        .port();
    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

    tokio::spawn(async move {
        axum::serve(
            listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(async {
            shutdown_rx.await.ok();
        })
        .await
        .expect("Server failed");
    });

    (format!("http://127.0.0.1:{}", port), shutdown_tx)
}

impl TestServer {
    /// Spawns a server without a mail transport
    pub async fn spawn() -> Self {
        Self::spawn_with(false).await
    }

    /// Spawns a server whose emails are captured in [`TestServer::mail`]
    pub async fn spawn_with_mail() -> Self {
        Self::spawn_with(true).await
    }

    async fn spawn_with(with_mail: bool) -> Self {
        let (temp_dir, db_path, files_dir, store) =
            create_test_store().expect("Failed to create test store");

        let gateway_requests: GatewayRequests = Arc::new(Mutex::new(Vec::new()));
        let (gateway_url, gateway_shutdown) =
            spawn_router(stub_gateway(gateway_requests.clone())).await;
        let gateway: Arc<dyn PaymentGateway> = Arc::new(
            HttpPaymentGateway::new(&gateway_url, Duration::from_secs(2), Duration::from_secs(2))
                .expect("Failed to build gateway client"),
        );

        let mail = with_mail.then(|| Arc::new(RecordingTransport::default()));
        let mail_transport = mail
            .clone()
            .map(|transport| transport as Arc<dyn MailTransport>);

        // The app is built before binding, so links point at a placeholder
        // origin; tests only look at the path part.
        let config = ServerConfig {
            requests_logging_level: RequestsLoggingLevel::None,
            port: 0,
            frontend_dir_path: None,
            base_url: "http://storefront.test".to_string(),
            api_prefix: "/api".to_string(),
            link_ttl_hours: 24,
            send_email_on_issue: true,
            session_secret: Some(SESSION_SECRET.to_string()),
        };

        let app = make_app(config, store.clone(), files_dir, mail_transport, gateway)
            .expect("Failed to build app");
        let (base_url, app_shutdown) = spawn_router(app).await;

        let server = Self {
            base_url,
            store,
            mail,
            gateway_requests,
            db_path,
            _temp_dir: temp_dir,
            _shutdown_txs: vec![app_shutdown, gateway_shutdown],
        };

        server.wait_for_ready().await;

        server
    }

    /// Moves a download's expiry into the past.
    pub fn expire_download(&self, token: &str) {
        let conn = rusqlite::Connection::open(&self.db_path).expect("Failed to open database");
        let past = chrono::Utc::now().timestamp_millis() - 1000;
        let updated = conn
            .execute(
                "UPDATE downloads SET expires_at = ?1 WHERE token = ?2",
                rusqlite::params![past, token],
            )
            .expect("Failed to expire download");
        assert_eq!(updated, 1, "No download with token {}", token);
    }

    /// Waits for the server to become ready by polling the home endpoint
    async fn wait_for_ready(&self) {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(100))
            .build()
            .expect("Failed to build reqwest client");

        let start = std::time::Instant::now();
        let timeout = Duration::from_millis(SERVER_READY_TIMEOUT_MS);

        loop {
            if start.elapsed() > timeout {
                panic!(
                    "Server did not become ready within {}ms",
                    SERVER_READY_TIMEOUT_MS
                );
            }

            match client.get(format!("{}/", self.base_url)).send().await {
                Ok(response) if response.status().is_success() => return,
                _ => {
                    tokio::time::sleep(Duration::from_millis(SERVER_READY_POLL_INTERVAL_MS)).await;
                }
            }
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        for tx in self._shutdown_txs.drain(..) {
            let _ = tx.send(());
        }
        // TempDir will be cleaned up automatically
    }
}
