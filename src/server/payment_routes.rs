//! Payment gateway HTTP routes.
//!
//! The gateway talks back to us through two independent paths: a server to
//! server callback and a browser redirect. Both go through the same status
//! classification and end up on one of the landing pages.

use std::collections::HashMap;
use std::convert::Infallible;

use axum::{
    extract::{rejection::JsonRejection, FromRequest, Query, Request, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
    Form, Json, Router,
};
use serde::Serialize;
use serde_json::Value;
use tracing::warn;

use crate::payment::{CreatedPayment, LandingPage, PaymentIntent, StatusFields};
use crate::server::api_response::ApiError;
use crate::server::state::ServerState;

#[derive(Debug, Serialize)]
struct CreatePaymentResponse {
    success: bool,
    content: CreatedPayment,
}

#[derive(Debug, Serialize)]
struct CallbackResponse {
    success: bool,
    message: &'static str,
    redirect_url: String,
}

/// Status fields from a JSON or form encoded body. Other content types, and
/// bodies that fail to parse, carry no fields.
pub struct StatusBody(pub Option<StatusFields>);

impl<S: Send + Sync> FromRequest<S> for StatusBody {
    type Rejection = Infallible;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let content_type = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_ascii_lowercase();

        let fields = if content_type.starts_with("application/json") {
            match Json::<Value>::from_request(req, state).await {
                Ok(Json(value)) => Some(StatusFields::from_json(&value)),
                Err(rejection) => {
                    warn!("Ignoring unparseable gateway body: {}", rejection.body_text());
                    None
                }
            }
        } else if content_type.starts_with("application/x-www-form-urlencoded") {
            match Form::<HashMap<String, String>>::from_request(req, state).await {
                Ok(Form(fields)) => Some(StatusFields::new(fields)),
                Err(rejection) => {
                    warn!("Ignoring unparseable gateway form: {}", rejection.body_text());
                    None
                }
            }
        } else {
            None
        };
        Ok(StatusBody(fields))
    }
}

fn gateway_status(status: u16) -> StatusCode {
    StatusCode::from_u16(status).unwrap_or(StatusCode::OK)
}

async fn create_payment(
    State(state): State<ServerState>,
    body: Result<Json<PaymentIntent>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(intent) = body?;
    let (status, created) = state.payment.create(&intent).await?;
    Ok((
        gateway_status(status),
        Json(CreatePaymentResponse {
            success: true,
            content: created,
        }),
    )
        .into_response())
}

async fn update_payment(
    State(state): State<ServerState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(body) = body?;
    let reply = state.payment.update(&body).await?;
    Ok((gateway_status(reply.status), Json(reply.body)).into_response())
}

async fn payment_callback(
    State(state): State<ServerState>,
    StatusBody(body): StatusBody,
) -> Json<CallbackResponse> {
    let verdict = state
        .payment
        .classify_callback(&body.unwrap_or_default());
    Json(CallbackResponse {
        success: true,
        message: "Callback received successfully",
        redirect_url: verdict.landing.location(verdict.order_id.as_deref()),
    })
}

async fn redirect_get(
    State(state): State<ServerState>,
    Query(query): Query<HashMap<String, String>>,
) -> Redirect {
    let verdict = state
        .payment
        .classify_redirect(None, &StatusFields::new(query));
    Redirect::to(&verdict.landing.location(verdict.order_id.as_deref()))
}

async fn redirect_post(
    State(state): State<ServerState>,
    Query(query): Query<HashMap<String, String>>,
    StatusBody(body): StatusBody,
) -> Redirect {
    let verdict = state
        .payment
        .classify_redirect(body.as_ref(), &StatusFields::new(query));
    Redirect::to(&verdict.landing.location(verdict.order_id.as_deref()))
}

async fn success_page() -> Html<&'static str> {
    Html(LandingPage::Success.html())
}

async fn failed_page() -> Html<&'static str> {
    Html(LandingPage::Failed.html())
}

async fn cancelled_page() -> Html<&'static str> {
    Html(LandingPage::Cancelled.html())
}

/// Routes, nested under `/payment`.
pub fn payment_routes() -> Router<ServerState> {
    Router::new()
        .route("/create", post(create_payment))
        .route("/update", post(update_payment))
        .route("/callback", post(payment_callback))
        .route("/redirect", get(redirect_get).post(redirect_post))
        .route("/success", get(success_page))
        .route("/failed", get(failed_page))
        .route("/cancelled", get(cancelled_page))
}
