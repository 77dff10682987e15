use super::gateway::{GatewayError, PaymentGateway};
use super::landing::LandingPage;
use super::models::{CreatedPayment, GatewayReply, PaymentIntent};
use super::status::{classify, extract_status, StatusBucket, StatusFields};
use crate::server::metrics::{record_gateway_call, record_payment_classification};
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusSource {
    Callback,
    Redirect,
}

impl StatusSource {
    fn as_str(&self) -> &'static str {
        match self {
            StatusSource::Callback => "callback",
            StatusSource::Redirect => "redirect",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub status: Option<String>,
    pub bucket: StatusBucket,
    pub landing: LandingPage,
    pub order_id: Option<String>,
}

/// Status lookup over `sources` in order, shared by callbacks and redirects.
pub fn classify_sources(sources: &[&StatusFields], source: StatusSource) -> Classification {
    let status = extract_status(sources);
    let bucket = classify(status);
    let order_id = sources.iter().find_map(|fields| fields.order_id());
    let landing = LandingPage::for_bucket(bucket);
    info!(
        "Payment {} for order {:?}: status {:?} classified as {}",
        source.as_str(),
        order_id,
        status,
        bucket.as_str()
    );
    record_payment_classification(bucket.as_str(), source.as_str());
    Classification {
        status: status.map(str::to_string),
        bucket,
        landing,
        order_id: order_id.map(str::to_string),
    }
}

/// Relays payment creation and updates to the gateway and interprets the
/// statuses it reports back.
pub struct PaymentBridge {
    gateway: Arc<dyn PaymentGateway>,
}

impl PaymentBridge {
    pub fn new(gateway: Arc<dyn PaymentGateway>) -> Self {
        Self { gateway }
    }

    /// Returns the gateway status code along with the normalized payment.
    pub async fn create(
        &self,
        intent: &PaymentIntent,
    ) -> Result<(u16, CreatedPayment), GatewayError> {
        info!(
            "Creating payment for order {:?} ({:?} {:?})",
            intent.order_id, intent.total_amount, intent.currency
        );
        let result = self.gateway.create_payment(intent).await.and_then(|reply| {
            match CreatedPayment::from_gateway_body(&reply.body, intent.order_id.as_deref()) {
                Some(created) => Ok((reply.status, created)),
                None => {
                    warn!("Gateway create reply has no redirect URL: {}", reply.body);
                    Err(GatewayError::MalformedReply(reply.body))
                }
            }
        });
        record_gateway_call("create", gateway_result_label(&result));
        result
    }

    pub async fn update(&self, body: &Value) -> Result<GatewayReply, GatewayError> {
        let fields = StatusFields::from_json(body);
        info!(
            "Forwarding payment update for order {:?}, status {:?}",
            fields.order_id(),
            fields.status()
        );
        let result = self.gateway.forward_update(body).await;
        record_gateway_call("update", gateway_result_label(&result));
        result
    }

    pub fn classify_callback(&self, body: &StatusFields) -> Classification {
        classify_sources(&[body], StatusSource::Callback)
    }

    /// POST redirects carry a body, consulted before the query string.
    pub fn classify_redirect(
        &self,
        body: Option<&StatusFields>,
        query: &StatusFields,
    ) -> Classification {
        match body {
            Some(body) => classify_sources(&[body, query], StatusSource::Redirect),
            None => classify_sources(&[query], StatusSource::Redirect),
        }
    }
}

fn gateway_result_label<T>(result: &Result<T, GatewayError>) -> &'static str {
    match result {
        Ok(_) => "ok",
        Err(GatewayError::Rejected { .. }) => "rejected",
        Err(GatewayError::Unreachable(_)) => "unreachable",
        Err(GatewayError::MalformedReply(_)) => "malformed",
    }
}
