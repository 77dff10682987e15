//! End-to-end tests for the payment gateway bridge and landing pages.

mod common;

use common::*;
use reqwest::StatusCode;
use serde_json::{json, Value};

fn location(response: &reqwest::Response) -> String {
    response.headers()["location"]
        .to_str()
        .expect("Location is not ASCII")
        .to_string()
}

#[tokio::test]
async fn test_create_payment_relays_intent_and_normalizes_reply() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let intent = json!({
        "order_id": "ORD-1",
        "total_amount": 25000,
        "currency": "IDR",
        "customer_name": "Ada",
        "va_bank": "bca"
    });
    let response = client.create_payment(intent.clone()).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(body["content"]["redirectUrl"], STUB_REDIRECT_URL);
    assert_eq!(body["content"]["orderId"], "ORD-1");

    let requests = server.gateway_requests.lock().unwrap().clone();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].0, "/payment/create");
    assert_eq!(requests[0].1, intent);
}

#[tokio::test]
async fn test_rejected_payment_passes_gateway_status_and_payload() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let response = client
        .create_payment(json!({"order_id": REJECTED_ORDER_ID, "total_amount": -1}))
        .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Payment gateway error");
    assert_eq!(
        body["error"],
        json!({"status": "error", "message": "invalid amount"})
    );
}

#[tokio::test]
async fn test_create_payment_rejects_malformed_json() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let response = client
        .client
        .post(format!("{}/payment/create", server.base_url))
        .header("Content-Type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "InvalidRequest");
    assert!(server.gateway_requests.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_update_is_forwarded_verbatim() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let update = json!({
        "order_id": "ORD-7",
        "transaction_status": "settlement",
        "gross_amount": "25000.00",
        "nested": {"kept": true}
    });
    let response = client.update_payment(update.clone()).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["message"], "update stored");

    let requests = server.gateway_requests.lock().unwrap().clone();
    assert_eq!(requests, vec![("/payment/update".to_string(), update)]);
}

#[tokio::test]
async fn test_callback_classifies_status() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let cases = [
        (
            json!({"order_id": "ORD-1", "transaction_status": "settlement"}),
            "/payment/success?order_id=ORD-1",
        ),
        (
            json!({"order_id": "ORD-2", "status": "failed", "payment_status": "capture"}),
            "/payment/success?order_id=ORD-2",
        ),
        (
            json!({"order_id": "ORD-3", "status": "cancel"}),
            "/payment/failed?order_id=ORD-3",
        ),
        (
            json!({"order_id": "ORD-4", "status": "weird_value"}),
            "/payment/cancelled?order_id=ORD-4",
        ),
        (json!({}), "/payment/cancelled"),
    ];

    for (body, expected) in cases {
        let response = client.payment_callback(body.clone()).await;
        assert_eq!(response.status(), StatusCode::OK);
        let json: Value = response.json().await.unwrap();
        assert_eq!(json["success"], true, "callback {}", body);
        assert_eq!(json["message"], "Callback received successfully");
        assert_eq!(json["redirect_url"], expected, "callback {}", body);
    }
}

#[tokio::test]
async fn test_unparseable_callback_is_acknowledged_as_cancelled() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let response = client
        .client
        .post(format!("{}/payment/callback", server.base_url))
        .header("Content-Type", "application/json")
        .body("{\"order_id\": \"ORD-8\", ")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(body["redirect_url"], "/payment/cancelled");

    // A broken body on a posted redirect falls back to the query string
    let response = client
        .client
        .post(format!("{}/payment/redirect?status=settlement", server.base_url))
        .header("Content-Type", "application/json")
        .body("not json")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/payment/success");
}

#[tokio::test]
async fn test_browser_redirect_lands_on_status_page() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let response = client
        .payment_redirect_get("order_id=ORD-9&status=cancelled")
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/payment/failed?order_id=ORD-9");

    let response = client
        .payment_redirect_get("transaction_status=Settlement")
        .await;
    assert_eq!(location(&response), "/payment/success");

    let response = client.payment_redirect_get("order_id=ORD-9").await;
    assert_eq!(location(&response), "/payment/cancelled?order_id=ORD-9");
}

#[tokio::test]
async fn test_posted_redirect_prefers_body_over_query() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let response = client
        .payment_redirect_post_form("status=failed", "order_id=ORD-5&payment_status=success")
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/payment/success?order_id=ORD-5");

    // Blank body status falls through to the query string
    let response = client
        .payment_redirect_post_form("status=error&order_id=ORD-6", "payment_status=")
        .await;
    assert_eq!(location(&response), "/payment/failed?order_id=ORD-6");
}

#[tokio::test]
async fn test_landing_pages_notify_opener() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    for (path, message) in [
        ("/payment/success", "PAYMENT_SUCCESS"),
        ("/payment/failed", "PAYMENT_FAILED"),
        ("/payment/cancelled", "PAYMENT_CANCELLED"),
    ] {
        let response = client.get(&format!("{}?order_id=ORD-1", path)).await;
        assert_eq!(response.status(), StatusCode::OK);
        let content_type = response.headers()["content-type"].to_str().unwrap().to_string();
        assert!(content_type.starts_with("text/html"));
        let html = response.text().await.unwrap();
        assert!(html.contains(message), "{} misses {}", path, message);
    }
}
