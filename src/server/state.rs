use axum::extract::FromRef;

use crate::downloads::{LinkIssuer, LinkResender, RedemptionHandler};
use crate::notifications::DownloadNotifier;
use crate::payment::PaymentBridge;
use crate::store::StorefrontStore;
use std::sync::Arc;
use std::time::Instant;

use super::ServerConfig;

pub type GuardedStorefrontStore = Arc<dyn StorefrontStore>;
pub type GuardedLinkIssuer = Arc<LinkIssuer>;
pub type GuardedRedemptionHandler = Arc<RedemptionHandler>;
pub type GuardedLinkResender = Arc<LinkResender>;
pub type GuardedDownloadNotifier = Arc<DownloadNotifier>;
pub type GuardedPaymentBridge = Arc<PaymentBridge>;

#[derive(Clone)]
pub struct ServerState {
    pub config: ServerConfig,
    pub start_time: Instant,
    pub store: GuardedStorefrontStore,
    pub issuer: GuardedLinkIssuer,
    pub redemption: GuardedRedemptionHandler,
    pub resender: GuardedLinkResender,
    pub notifier: GuardedDownloadNotifier,
    pub payment: GuardedPaymentBridge,
}

impl FromRef<ServerState> for ServerConfig {
    fn from_ref(input: &ServerState) -> Self {
        input.config.clone()
    }
}

impl FromRef<ServerState> for GuardedStorefrontStore {
    fn from_ref(input: &ServerState) -> Self {
        input.store.clone()
    }
}

impl FromRef<ServerState> for GuardedLinkIssuer {
    fn from_ref(input: &ServerState) -> Self {
        input.issuer.clone()
    }
}

impl FromRef<ServerState> for GuardedRedemptionHandler {
    fn from_ref(input: &ServerState) -> Self {
        input.redemption.clone()
    }
}

impl FromRef<ServerState> for GuardedLinkResender {
    fn from_ref(input: &ServerState) -> Self {
        input.resender.clone()
    }
}

impl FromRef<ServerState> for GuardedDownloadNotifier {
    fn from_ref(input: &ServerState) -> Self {
        input.notifier.clone()
    }
}

impl FromRef<ServerState> for GuardedPaymentBridge {
    fn from_ref(input: &ServerState) -> Self {
        input.payment.clone()
    }
}
