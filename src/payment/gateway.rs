//! HTTP client for the external payment gateway.

use super::models::{GatewayReply, PaymentIntent};
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Clone, Error, PartialEq)]
pub enum GatewayError {
    /// The gateway answered with a non-success status.
    #[error("Payment gateway rejected the request with status {status}")]
    Rejected { status: u16, payload: Value },
    /// No usable answer: connection failure or timeout.
    #[error("Payment gateway unreachable: {0}")]
    Unreachable(String),
    #[error("Payment gateway sent an unexpected reply")]
    MalformedReply(Value),
}

impl GatewayError {
    pub fn kind(&self) -> &'static str {
        match self {
            GatewayError::Rejected { .. } => "GatewayRejected",
            GatewayError::Unreachable(_) => "GatewayUnreachable",
            GatewayError::MalformedReply(_) => "GatewayUnreachable",
        }
    }
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_payment(&self, intent: &PaymentIntent) -> Result<GatewayReply, GatewayError>;

    /// Forwards a gateway push notification body verbatim.
    async fn forward_update(&self, body: &Value) -> Result<GatewayReply, GatewayError>;
}

pub struct HttpPaymentGateway {
    client: reqwest::Client,
    base_url: String,
    create_timeout: Duration,
    update_timeout: Duration,
}

impl HttpPaymentGateway {
    pub fn new(base_url: &str, create_timeout: Duration, update_timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .build()
            .context("Failed to create payment gateway HTTP client")?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            create_timeout,
            update_timeout,
        })
    }

    async fn post_json<T: serde::Serialize + ?Sized + Sync>(
        &self,
        path: &str,
        body: &T,
        timeout: Duration,
    ) -> Result<GatewayReply, GatewayError> {
        let url = format!("{}{}", self.base_url, path);
        debug!("POST {}", url);
        let response = self
            .client
            .post(&url)
            .timeout(timeout)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                warn!("Payment gateway request to {} failed: {}", url, e);
                GatewayError::Unreachable(e.to_string())
            })?;

        let status = response.status().as_u16();
        let text = response.text().await.map_err(|e| {
            warn!("Failed to read payment gateway reply: {}", e);
            GatewayError::Unreachable(e.to_string())
        })?;
        let parsed = serde_json::from_str::<Value>(&text);

        if !(200..300).contains(&status) {
            let payload = parsed.unwrap_or(Value::String(text));
            return Err(GatewayError::Rejected { status, payload });
        }
        match parsed {
            Ok(body) => Ok(GatewayReply { status, body }),
            Err(_) => Err(GatewayError::MalformedReply(Value::String(text))),
        }
    }
}

#[async_trait]
impl PaymentGateway for HttpPaymentGateway {
    async fn create_payment(&self, intent: &PaymentIntent) -> Result<GatewayReply, GatewayError> {
        self.post_json("/payment/create", intent, self.create_timeout)
            .await
    }

    async fn forward_update(&self, body: &Value) -> Result<GatewayReply, GatewayError> {
        self.post_json("/payment/update", body, self.update_timeout)
            .await
    }
}
