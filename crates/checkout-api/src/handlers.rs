//! # Request Handlers
//!
//! Axum request handlers for the checkout server.

use crate::state::{AppState, HandlerFailurePolicy};
use axum::{
    body::Bytes,
    extract::{rejection::FormRejection, Form, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Redirect},
    Json,
};
use checkout_core::{CheckoutError, Dispatched, SessionRequest, SignedPayload};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument, warn};

/// Header carrying the webhook signature
pub const SIGNATURE_HEADER: &str = "stripe-signature";

// =============================================================================
// Request/Response Types
// =============================================================================

/// Response of `GET /config`
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigResponse {
    pub public_key: String,
    pub unit_amount: Option<i64>,
    pub currency: String,
}

/// Query of `GET /checkout-session`
#[derive(Debug, Deserialize)]
pub struct SessionQuery {
    #[serde(rename = "sessionId")]
    pub session_id: Option<String>,
}

/// Query string or form body of `POST /create-checkout-session`
#[derive(Debug, Default, Deserialize)]
pub struct QuantityParams {
    pub quantity: Option<String>,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, code: u16) -> Self {
        Self {
            error: error.into(),
            code,
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

pub type ApiError = (StatusCode, Json<ErrorResponse>);

fn bad_request(message: impl Into<String>) -> ApiError {
    (StatusCode::BAD_REQUEST, Json(ErrorResponse::new(message, 400)))
}

fn checkout_error_to_response(err: CheckoutError) -> ApiError {
    let code = err.status_code();
    let mut response = ErrorResponse::new(err.to_string(), code);
    if err.is_retryable() {
        response = response.with_details("Temporary payment provider failure, try again");
    }
    (
        StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
        Json(response),
    )
}

fn parse_quantity(raw: Option<&str>) -> Result<u64, ApiError> {
    let raw = raw.ok_or_else(|| bad_request("Missing quantity"))?;
    match raw.trim().parse::<u64>() {
        Ok(q) if q >= 1 => Ok(q),
        _ => Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::new("Quantity must be a positive integer", 400).with_details(raw)),
        )),
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// Health check endpoint
pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "checkout-server",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Publishable key and the configured price, for the checkout page
#[instrument(skip_all)]
pub async fn get_config(State(state): State<AppState>) -> Result<Json<ConfigResponse>, ApiError> {
    let price = state
        .provider
        .retrieve_price(&state.config.price_id)
        .await
        .map_err(|e| {
            error!("Failed to retrieve price: {}", e);
            checkout_error_to_response(e)
        })?;

    Ok(Json(ConfigResponse {
        public_key: state.publishable_key.clone(),
        unit_amount: price.unit_amount,
        currency: price.currency,
    }))
}

/// Fetch a Checkout Session, e.g. for the success page
#[instrument(skip_all)]
pub async fn get_checkout_session(
    State(state): State<AppState>,
    Query(query): Query<SessionQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let session_id = query
        .session_id
        .filter(|id| !id.is_empty())
        .ok_or_else(|| bad_request("Missing sessionId"))?;

    let session = state
        .provider
        .retrieve_checkout_session(&session_id)
        .await
        .map_err(|e| {
            error!("Failed to retrieve checkout session {}: {}", session_id, e);
            checkout_error_to_response(e)
        })?;

    Ok(Json(session))
}

/// Create a Checkout Session and redirect (303) to the hosted payment page
#[instrument(skip_all)]
pub async fn create_checkout_session(
    State(state): State<AppState>,
    Query(query): Query<QuantityParams>,
    form: Result<Form<QuantityParams>, FormRejection>,
) -> Result<Redirect, ApiError> {
    let form = form.map(|Form(f)| f).unwrap_or_default();
    let quantity = parse_quantity(form.quantity.as_deref().or(query.quantity.as_deref()))?;

    let request = SessionRequest::new(
        state.config.price_id.clone(),
        quantity,
        state.config.success_url(),
        state.config.cancel_url(),
    )
    .with_payment_method_types(state.config.payment_method_types.clone());

    let session = state
        .provider
        .create_checkout_session(&request)
        .await
        .map_err(|e| {
            error!("Failed to create checkout session: {}", e);
            checkout_error_to_response(e)
        })?;

    info!(session = %session.id, quantity, "Redirecting to checkout");
    Ok(Redirect::to(&session.url))
}

/// Verify a signed webhook and dispatch it by event type
#[instrument(skip_all)]
pub async fn webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<StatusCode, ApiError> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| bad_request("Missing Stripe-Signature header"))?;

    let event = state
        .verifier
        .verify(&SignedPayload::new(&body, signature))
        .map_err(|e| {
            warn!("Webhook verification failed: {}", e);
            checkout_error_to_response(e.into())
        })?;

    info!(event_type = %event.event_type(), event_id = ?event.id(), "Received webhook");

    match state.handlers.dispatch(&event) {
        Ok(Dispatched::Handled(_)) => Ok(StatusCode::OK),
        Ok(Dispatched::Ignored(event_type)) => {
            info!("Unhandled event type: {}", event_type);
            Ok(StatusCode::OK)
        }
        Err(e) => {
            error!(event_type = %event.event_type(), "Webhook handler error: {}", e);
            match state.config.handler_failure {
                HandlerFailurePolicy::Acknowledge => Ok(StatusCode::OK),
                HandlerFailurePolicy::Retry => Err(checkout_error_to_response(e.into())),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use checkout_core::{HandlerError, VerificationError};

    #[test]
    fn test_error_response() {
        let err = ErrorResponse::new("Test error", 400).with_details("more");
        assert_eq!(err.error, "Test error");
        assert_eq!(err.code, 400);
        assert_eq!(err.details.as_deref(), Some("more"));
    }

    #[test]
    fn test_checkout_error_conversion() {
        let (status, _json) =
            checkout_error_to_response(CheckoutError::InvalidRequest("Bad data".to_string()));
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _json) = checkout_error_to_response(VerificationError::SignatureMismatch.into());
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, json) =
            checkout_error_to_response(HandlerError::Failed("boom".to_string()).into());
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(json.details.is_none());

        let (_, json) = checkout_error_to_response(CheckoutError::Network("timeout".to_string()));
        assert!(json.details.is_some());
    }

    #[test]
    fn test_parse_quantity() {
        assert_eq!(parse_quantity(Some("3")).unwrap(), 3);
        assert_eq!(parse_quantity(Some(" 1 ")).unwrap(), 1);
        assert!(parse_quantity(None).is_err());
        assert!(parse_quantity(Some("0")).is_err());
        assert!(parse_quantity(Some("-2")).is_err());
        assert!(parse_quantity(Some("two")).is_err());
    }
}
