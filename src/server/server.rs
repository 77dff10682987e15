use anyhow::{Context, Result};
use std::{
    net::SocketAddr,
    path::PathBuf,
    sync::Arc,
    time::{Duration, Instant},
};

use axum::{
    extract::State, middleware, response::IntoResponse, routing::get, Json, Router,
};
use serde::Serialize;
use tower_http::services::ServeDir;
use tracing::info;

use super::{
    download_routes::download_routes, log_requests, metrics::metrics_handler,
    payment_routes::payment_routes, state::*, ServerConfig,
};
use crate::downloads::{DownloadLinks, LinkIssuer, LinkResender, RedemptionHandler};
use crate::notifications::{DownloadNotifier, MailTransport};
use crate::payment::{PaymentBridge, PaymentGateway};
use crate::store::StorefrontStore;

#[derive(Serialize)]
struct ServerStats {
    pub version: &'static str,
    pub uptime: String,
    pub email_configured: bool,
}

fn format_uptime(duration: Duration) -> String {
    let total_seconds = duration.as_secs();

    let days = total_seconds / 86_400;
    let hours = (total_seconds % 86_400) / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    format!("{}d {:02}:{:02}:{:02}", days, hours, minutes, seconds)
}

async fn home(State(state): State<ServerState>) -> impl IntoResponse {
    let stats = ServerStats {
        version: env!("CARGO_PKG_VERSION"),
        uptime: format_uptime(state.start_time.elapsed()),
        email_configured: state.notifier.is_configured(),
    };
    Json(stats)
}

impl ServerState {
    fn new(
        config: ServerConfig,
        store: Arc<dyn StorefrontStore>,
        files_dir: PathBuf,
        mail_transport: Option<Arc<dyn MailTransport>>,
        gateway: Arc<dyn PaymentGateway>,
    ) -> ServerState {
        let links = DownloadLinks::new(&config.base_url, &config.api_prefix);
        let notifier = Arc::new(DownloadNotifier::new(mail_transport));
        ServerState {
            start_time: Instant::now(),
            issuer: Arc::new(LinkIssuer::new(
                store.clone(),
                links.clone(),
                chrono::Duration::hours(config.link_ttl_hours),
            )),
            redemption: Arc::new(RedemptionHandler::new(store.clone(), files_dir)),
            resender: Arc::new(LinkResender::new(store.clone(), links, notifier.clone())),
            notifier,
            payment: Arc::new(PaymentBridge::new(gateway)),
            store,
            config,
        }
    }
}

pub fn make_app(
    config: ServerConfig,
    store: Arc<dyn StorefrontStore>,
    files_dir: PathBuf,
    mail_transport: Option<Arc<dyn MailTransport>>,
    gateway: Arc<dyn PaymentGateway>,
) -> Result<Router> {
    let state = ServerState::new(config.clone(), store, files_dir, mail_transport, gateway);

    let api_prefix = config.api_prefix.trim_end_matches('/');
    let api_routes: Router<ServerState> = Router::new().nest("/downloads", download_routes());

    let home_router: Router<ServerState> = match config.frontend_dir_path {
        Some(frontend_path) => {
            let static_files_service =
                ServeDir::new(frontend_path).append_index_html_on_directories(true);
            Router::new().fallback_service(static_files_service)
        }
        None => Router::new().route("/", get(home)),
    };

    let app: Router<ServerState> = if api_prefix.is_empty() {
        home_router.merge(api_routes)
    } else {
        home_router.nest(api_prefix, api_routes)
    };

    let app = app
        .nest("/payment", payment_routes())
        .layer(middleware::from_fn_with_state(state.clone(), log_requests))
        .with_state(state);

    Ok(app)
}

fn make_metrics_app() -> Router {
    Router::new().route("/metrics", get(metrics_handler))
}

pub async fn run_server(
    config: ServerConfig,
    metrics_port: u16,
    store: Arc<dyn StorefrontStore>,
    files_dir: PathBuf,
    mail_transport: Option<Arc<dyn MailTransport>>,
    gateway: Arc<dyn PaymentGateway>,
) -> Result<()> {
    let port = config.port;
    let app = make_app(config, store, files_dir, mail_transport, gateway)?;

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port))
        .await
        .with_context(|| format!("Failed to bind port {}", port))?;
    let metrics_listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", metrics_port))
        .await
        .with_context(|| format!("Failed to bind metrics port {}", metrics_port))?;

    info!("Ready to serve at port {}!", port);
    info!("Metrics available at port {}!", metrics_port);

    let app_server = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    );
    let metrics_server = axum::serve(metrics_listener, make_metrics_app());

    tokio::try_join!(
        async { app_server.await.context("Server failed") },
        async { metrics_server.await.context("Metrics server failed") },
    )?;
    Ok(())
}
