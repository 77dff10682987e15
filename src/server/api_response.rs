//! JSON envelope shared by every API route: `{success, message, data?, error?}`.

use crate::downloads::{DownloadError, ResendDenied};
use crate::payment::GatewayError;
use axum::{
    extract::rejection::JsonRejection,
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::Value;
use tracing::error;

use super::metrics::record_error;

#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: Some(data),
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    success: bool,
    message: String,
    error: Value,
}

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
    /// Error kind name, or the upstream payload for gateway rejections.
    pub error: Value,
    pub retry_after_secs: Option<i64>,
}

impl ApiError {
    pub fn new(status: StatusCode, kind: &str, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            error: Value::String(kind.to_string()),
            retry_after_secs: None,
        }
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "InvalidRequest", message)
    }

    pub fn internal() -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Internal",
            "Internal server error",
        )
    }
}

impl From<DownloadError> for ApiError {
    fn from(err: DownloadError) -> Self {
        let status = match &err {
            DownloadError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            DownloadError::NotFound(_) => StatusCode::NOT_FOUND,
            DownloadError::Expired => StatusCode::GONE,
            DownloadError::FormatUnavailable(_) => StatusCode::BAD_REQUEST,
            DownloadError::UnsupportedFormat(_) => StatusCode::BAD_REQUEST,
            DownloadError::FileNotFound => StatusCode::NOT_FOUND,
            DownloadError::Throttled(_) => StatusCode::TOO_MANY_REQUESTS,
            DownloadError::Internal(inner) => {
                error!("Download operation failed: {:#}", inner);
                return ApiError::internal();
            }
        };
        let mut api_error = ApiError::new(status, err.kind(), err.to_string());
        if let DownloadError::Throttled(ResendDenied::CoolingDown { retry_after_secs }) = err {
            api_error.retry_after_secs = Some(retry_after_secs);
        }
        api_error
    }
}

impl From<GatewayError> for ApiError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::Rejected { status, payload } => ApiError {
                status: StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY),
                message: "Payment gateway error".to_string(),
                error: payload,
                retry_after_secs: None,
            },
            other => ApiError::new(StatusCode::BAD_GATEWAY, other.kind(), other.to_string()),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::invalid_request(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let kind = match &self.error {
            Value::String(kind) => kind.as_str(),
            _ => "GatewayRejected",
        };
        record_error(kind);

        let mut response = (
            self.status,
            Json(ErrorBody {
                success: false,
                message: self.message,
                error: self.error,
            }),
        )
            .into_response();
        if let Some(secs) = self.retry_after_secs {
            if let Ok(value) = HeaderValue::from_str(&secs.to_string()) {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
        }
        response
    }
}
