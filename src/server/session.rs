use super::state::ServerState;

use axum::{
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
    response::IntoResponse,
};
use axum_extra::extract::cookie::CookieJar;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const COOKIE_SESSION_TOKEN_KEY: &str = "session_token";
pub const HEADER_SESSION_TOKEN_KEY: &str = "Authorization";
pub const ADMIN_ROLE: &str = "admin";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    pub sub: String,
    pub role: String,
    /// Seconds since the epoch.
    pub exp: u64,
}

/// A verified session whose role is admin.
#[derive(Debug)]
pub struct AdminSession {
    pub subject: String,
}

#[derive(Debug, PartialEq, Eq)]
pub enum SessionExtractionError {
    /// No token, or one that fails verification.
    Unauthorized,
    AccessDenied,
}

impl IntoResponse for SessionExtractionError {
    fn into_response(self) -> axum::response::Response {
        match self {
            SessionExtractionError::Unauthorized => StatusCode::UNAUTHORIZED.into_response(),
            SessionExtractionError::AccessDenied => StatusCode::FORBIDDEN.into_response(),
        }
    }
}

pub fn encode_session_token(secret: &str, claims: &SessionClaims) -> anyhow::Result<String> {
    Ok(encode(
        &Header::new(Algorithm::HS256),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?)
}

fn decode_session_token(secret: &str, token: &str) -> Option<SessionClaims> {
    match decode::<SessionClaims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::new(Algorithm::HS256),
    ) {
        Ok(data) => Some(data.claims),
        Err(err) => {
            debug!("Rejected session token: {}", err);
            None
        }
    }
}

fn extract_session_token_from_cookies(parts: &Parts) -> Option<String> {
    CookieJar::from_headers(&parts.headers)
        .get(COOKIE_SESSION_TOKEN_KEY)
        .map(|cookie| cookie.value().to_string())
}

fn extract_session_token_from_headers(parts: &Parts) -> Option<String> {
    parts
        .headers
        .get(HEADER_SESSION_TOKEN_KEY)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.strip_prefix("Bearer ").unwrap_or(v).trim().to_string())
        .filter(|v| !v.is_empty())
}

fn authorize_admin(
    secret: Option<&str>,
    token: Option<String>,
) -> Result<AdminSession, SessionExtractionError> {
    let token = token.ok_or_else(|| {
        debug!("No token in cookies nor headers.");
        SessionExtractionError::Unauthorized
    })?;
    let secret = secret.ok_or_else(|| {
        debug!("Admin session presented but no session secret is configured");
        SessionExtractionError::AccessDenied
    })?;
    let claims =
        decode_session_token(secret, &token).ok_or(SessionExtractionError::Unauthorized)?;
    if claims.role != ADMIN_ROLE {
        debug!("Session for {} has role {}", claims.sub, claims.role);
        return Err(SessionExtractionError::AccessDenied);
    }
    Ok(AdminSession {
        subject: claims.sub,
    })
}

impl FromRequestParts<ServerState> for AdminSession {
    type Rejection = SessionExtractionError;

    async fn from_request_parts(
        parts: &mut Parts,
        ctx: &ServerState,
    ) -> Result<Self, Self::Rejection> {
        let token = extract_session_token_from_headers(parts)
            .or_else(|| extract_session_token_from_cookies(parts));
        authorize_admin(ctx.config.session_secret.as_deref(), token)
    }
}
