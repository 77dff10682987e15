//! Download link HTTP routes.
//!
//! Provides endpoints for:
//! - Issuing a download link for a book (optionally emailed)
//! - Redeeming a link by streaming the book file
//! - Re-sending the latest link for an (email, book) pair
//! - Per-email download history and admin statistics

use std::net::SocketAddr;

use axum::{
    body::Body,
    extract::{connect_info::ConnectInfo, rejection::JsonRejection, Path, State},
    http::{header, Extensions, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::io::BufReader;
use tokio_util::io::ReaderStream;
use tracing::{debug, error, info};

use crate::downloads::{IssueRequest, ResendRequest};
use crate::notifications::DownloadEmail;
use crate::server::api_response::{ApiError, ApiResponse};
use crate::server::metrics::{record_link_issued, record_redemption};
use crate::server::session::AdminSession;
use crate::server::state::ServerState;

const TOP_BOOKS_LIMIT: usize = 5;
const STREAM_BUFFER_SIZE: usize = 4096 * 16;

// =============================================================================
// Request/Response Types
// =============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedDownloadResponse {
    pub email: String,
    pub download_link: String,
    pub expires_at: DateTime<Utc>,
    pub email_sent: bool,
}

// =============================================================================
// Handlers
// =============================================================================

/// Client address: the first X-Forwarded-For hop when proxied, the socket
/// peer otherwise.
fn client_ip(headers: &HeaderMap, extensions: &Extensions) -> Option<String> {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .or_else(|| {
            extensions
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| addr.ip().to_string())
        })
}

async fn create_download(
    State(state): State<ServerState>,
    headers: HeaderMap,
    extensions: Extensions,
    body: Result<Json<IssueRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(request) = body?;
    let issued = state
        .issuer
        .issue(&request, client_ip(&headers, &extensions))?;
    record_link_issued(issued.format.as_str());

    let email_sent = if state.config.send_email_on_issue {
        state
            .notifier
            .notify(&DownloadEmail {
                to: issued.email.clone(),
                redemption_url: issued.download_link.clone(),
                book_title: issued.book.title.clone(),
                format: issued.format,
            })
            .await
            .is_sent()
    } else {
        false
    };

    let response = ApiResponse::ok(
        "Download link created successfully",
        CreatedDownloadResponse {
            email: issued.email,
            download_link: issued.download_link,
            expires_at: issued.expires_at,
            email_sent,
        },
    );
    Ok((StatusCode::CREATED, Json(response)).into_response())
}

/// `filename` carries an ASCII fallback, `filename*` the exact UTF-8 name.
fn content_disposition(filename: &str) -> String {
    let fallback: String = filename
        .chars()
        .map(|c| {
            if c == ' ' || (c.is_ascii_graphic() && c != '"' && c != '\\') {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        fallback,
        urlencoding::encode(filename)
    )
}

async fn download_file(
    State(state): State<ServerState>,
    Path(token): Path<String>,
) -> Result<Response, ApiError> {
    let redeemed = match state.redemption.redeem(&token).await {
        Ok(redeemed) => redeemed,
        Err(err) => {
            record_redemption(err.kind());
            return Err(err.into());
        }
    };
    record_redemption(if redeemed.first_redemption {
        "first"
    } else {
        "repeat"
    });
    debug!(
        "Streaming {} ({} bytes)",
        redeemed.filename, redeemed.length
    );

    let reader = BufReader::with_capacity(STREAM_BUFFER_SIZE, redeemed.file);
    let stream = ReaderStream::with_capacity(reader, STREAM_BUFFER_SIZE);

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, redeemed.content_type)
        .header(header::CONTENT_LENGTH, redeemed.length)
        .header(
            header::CONTENT_DISPOSITION,
            content_disposition(&redeemed.filename),
        )
        .body(Body::from_stream(stream))
        .map_err(|err| {
            error!("Failed to build download response: {}", err);
            ApiError::internal()
        })
}

async fn resend_download(
    State(state): State<ServerState>,
    body: Result<Json<ResendRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(request) = body?;
    let outcome = state.resender.resend(&request).await?;
    let message = if outcome.email_sent {
        "Download link sent to your email"
    } else {
        "Email could not be sent, use the download link instead"
    };
    Ok(Json(ApiResponse::ok(message, outcome)).into_response())
}

async fn get_history(
    State(state): State<ServerState>,
    Path(email): Path<String>,
) -> Result<Response, ApiError> {
    let email = email.trim();
    if email.is_empty() {
        return Err(ApiError::invalid_request("email is required"));
    }
    let history = state
        .store
        .get_download_history(email, Utc::now())
        .map_err(|err| {
            error!("Failed to load download history: {:#}", err);
            ApiError::internal()
        })?;
    Ok(Json(ApiResponse::ok(
        format!("{} downloads found", history.len()),
        history,
    ))
    .into_response())
}

async fn get_stats(
    session: AdminSession,
    State(state): State<ServerState>,
) -> Result<Response, ApiError> {
    info!("Download stats requested by {}", session.subject);
    let stats = state
        .store
        .get_download_stats(TOP_BOOKS_LIMIT)
        .map_err(|err| {
            error!("Failed to compute download stats: {:#}", err);
            ApiError::internal()
        })?;
    Ok(Json(ApiResponse::ok("Download statistics", stats)).into_response())
}

// =============================================================================
// Router
// =============================================================================

/// Routes, nested under `{api_prefix}/downloads`:
/// - POST /create
/// - GET /download/{token}
/// - POST /resend
/// - GET /history/{email}
/// - GET /stats (admin)
pub fn download_routes() -> Router<ServerState> {
    Router::new()
        .route("/create", post(create_download))
        .route("/download/{token}", get(download_file))
        .route("/resend", post(resend_download))
        .route("/history/{email}", get(get_history))
        .route("/stats", get(get_stats))
}
