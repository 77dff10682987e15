//! HTTP client for end-to-end tests
//!
//! This module wraps reqwest and provides methods for all storefront
//! endpoints. When API routes or request formats change, update only this
//! file.

use super::constants::*;
use ebook_storefront::server::session::{encode_session_token, SessionClaims};
use reqwest::Response;
use serde_json::{json, Value};
use std::time::Duration;

/// HTTP test client. Redirects are not followed so tests can inspect them.
pub struct TestClient {
    /// The underlying reqwest client (public for custom requests in tests)
    pub client: reqwest::Client,
    /// The base URL of the test server
    pub base_url: String,
}

/// Signs a session token for `role`, valid for an hour.
pub fn session_token(role: &str) -> String {
    let exp = (chrono::Utc::now().timestamp() + 3600) as u64;
    encode_session_token(
        SESSION_SECRET,
        &SessionClaims {
            sub: "ops@storefront.test".to_string(),
            role: role.to_string(),
            exp,
        },
    )
    .expect("Failed to sign session token")
}

impl TestClient {
    pub fn new(base_url: String) -> Self {
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .expect("Failed to build reqwest client");

        Self { client, base_url }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    // ========================================================================
    // Download Endpoints
    // ========================================================================

    pub async fn create_download_raw(&self, body: Value) -> Response {
        self.client
            .post(self.url("/api/downloads/create"))
            .json(&body)
            .send()
            .await
            .expect("Create download request failed")
    }

    pub async fn create_download(&self, book_id: i64, email: &str, format: &str) -> Response {
        self.create_download_raw(json!({
            "bookId": book_id,
            "email": email,
            "format": format,
        }))
        .await
    }

    /// Issues a link and returns its token.
    pub async fn issue_token(&self, book_id: i64, email: &str, format: &str) -> String {
        let response = self.create_download(book_id, email, format).await;
        assert_eq!(response.status(), reqwest::StatusCode::CREATED);
        let body: Value = response.json().await.expect("Invalid JSON");
        token_of(body["data"]["downloadLink"].as_str().expect("No download link"))
    }

    pub async fn download(&self, token: &str) -> Response {
        self.client
            .get(self.url(&format!("/api/downloads/download/{}", token)))
            .send()
            .await
            .expect("Download request failed")
    }

    pub async fn resend(&self, body: Value) -> Response {
        self.client
            .post(self.url("/api/downloads/resend"))
            .json(&body)
            .send()
            .await
            .expect("Resend request failed")
    }

    pub async fn history(&self, email: &str) -> Response {
        self.client
            .get(self.url(&format!(
                "/api/downloads/history/{}",
                urlencoding::encode(email)
            )))
            .send()
            .await
            .expect("History request failed")
    }

    pub async fn stats(&self, bearer: Option<&str>) -> Response {
        let mut request = self.client.get(self.url("/api/downloads/stats"));
        if let Some(token) = bearer {
            request = request.bearer_auth(token);
        }
        request.send().await.expect("Stats request failed")
    }

    pub async fn stats_with_cookie(&self, token: &str) -> Response {
        self.client
            .get(self.url("/api/downloads/stats"))
            .header("Cookie", format!("session_token={}", token))
            .send()
            .await
            .expect("Stats request failed")
    }

    // ========================================================================
    // Payment Endpoints
    // ========================================================================

    pub async fn create_payment(&self, body: Value) -> Response {
        self.client
            .post(self.url("/payment/create"))
            .json(&body)
            .send()
            .await
            .expect("Create payment request failed")
    }

    pub async fn update_payment(&self, body: Value) -> Response {
        self.client
            .post(self.url("/payment/update"))
            .json(&body)
            .send()
            .await
            .expect("Update payment request failed")
    }

    pub async fn payment_callback(&self, body: Value) -> Response {
        self.client
            .post(self.url("/payment/callback"))
            .json(&body)
            .send()
            .await
            .expect("Payment callback request failed")
    }

    pub async fn payment_redirect_get(&self, query: &str) -> Response {
        self.client
            .get(self.url(&format!("/payment/redirect?{}", query)))
            .send()
            .await
            .expect("Payment redirect request failed")
    }

    pub async fn payment_redirect_post_form(&self, query: &str, form: &str) -> Response {
        self.client
            .post(self.url(&format!("/payment/redirect?{}", query)))
            .header("Content-Type", "application/x-www-form-urlencoded")
            .body(form.to_string())
            .send()
            .await
            .expect("Payment redirect request failed")
    }

    pub async fn get(&self, path: &str) -> Response {
        self.client
            .get(self.url(path))
            .send()
            .await
            .expect("GET request failed")
    }
}

/// Token at the end of a redemption link.
pub fn token_of(link: &str) -> String {
    link.rsplit('/').next().unwrap_or_default().to_string()
}
