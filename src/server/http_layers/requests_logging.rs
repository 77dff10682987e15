//! Request logging middleware

use super::super::state::ServerState;
use crate::server::metrics::{categorize_endpoint, record_http_request};
use axum::extract::State;
use axum::{
    body::{Body, Bytes},
    http::{header, HeaderMap, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use lazy_static::lazy_static;
use regex::Regex;
use std::time::Instant;
use tracing::{error, info};

#[derive(PartialEq, PartialOrd, Clone, Debug, Default, clap::ValueEnum)]
pub enum RequestsLoggingLevel {
    None,
    #[default]
    Path,
    Headers,
    Body,
}

impl std::fmt::Display for RequestsLoggingLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

const MAX_LOGGABLE_BODY_LENGTH: usize = 1024;

lazy_static! {
    static ref EMAIL_RE: Regex =
        Regex::new(r"([A-Za-z0-9._%+-]{1,2})[A-Za-z0-9._%+-]*@([A-Za-z0-9.-]+)")
            .expect("valid email regex");
}

/// Keeps the first two characters of the local part: `ab***@domain`.
pub fn mask_emails(text: &str) -> String {
    EMAIL_RE.replace_all(text, "$1***@$2").into_owned()
}

fn content_length(headers: &HeaderMap) -> Option<usize> {
    headers
        .get(header::CONTENT_LENGTH)?
        .to_str()
        .ok()?
        .parse()
        .ok()
}

fn log_headers(label: &str, headers: &HeaderMap) {
    info!("  {} Headers:", label);
    for (name, value) in headers.iter() {
        info!("    {:?}: {:?}", name, value);
    }
}

/// Logs a small request body with addresses masked. Larger or unsized bodies
/// pass through untouched.
async fn log_request_body(request: Request<Body>) -> Result<Request<Body>, Response> {
    let size = match content_length(request.headers()) {
        Some(size) if size < MAX_LOGGABLE_BODY_LENGTH => size,
        Some(size) => {
            info!("  Req Body: Too big to log ({:#})", byte_unit::Byte::from(size));
            return Ok(request);
        }
        None => {
            info!("  Req Body: no usable Content-Length");
            return Ok(request);
        }
    };

    let (parts, body) = request.into_parts();
    let bytes: Bytes = axum::body::to_bytes(body, size).await.map_err(|err| {
        error!("Failed to read request body: {:?}", err);
        StatusCode::INTERNAL_SERVER_ERROR.into_response()
    })?;
    info!("  Req Body:\n{}", mask_emails(&String::from_utf8_lossy(&bytes)));
    Ok(Request::from_parts(parts, Body::from(bytes)))
}

pub async fn log_requests(
    State(state): State<ServerState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let level = state.config.requests_logging_level.clone();
    let start = Instant::now();
    let method = request.method().to_string();
    let path = request.uri().path().to_string();

    if level > RequestsLoggingLevel::None {
        info!(">>> {} {}", method, mask_emails(&request.uri().to_string()));
    }
    if level >= RequestsLoggingLevel::Headers {
        log_headers("Req", request.headers());
    }
    if level >= RequestsLoggingLevel::Body {
        request = match log_request_body(request).await {
            Ok(request) => request,
            Err(response) => return response,
        };
    }

    let response = next.run(request).await;
    let status = response.status().as_u16();
    let duration = start.elapsed();

    if level >= RequestsLoggingLevel::Headers {
        log_headers("Resp", response.headers());
    }
    if level > RequestsLoggingLevel::None {
        info!("<<< {} {} ({}ms)", status, path, duration.as_millis());
    }
    record_http_request(&method, categorize_endpoint(&path), status, duration);

    response
}
