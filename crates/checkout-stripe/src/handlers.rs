//! # Stripe Event Handlers
//!
//! Built-in handlers for the webhook events this sample listens to.
//! Stripe wraps the affected object in `data.object`; handlers also accept
//! the object fields at the top level of the payload.

use checkout_core::{EventHandler, HandlerError, HandlerRegistry};
use serde_json::{Map, Value};
use tracing::{info, warn};

pub const PAYMENT_INTENT_SUCCEEDED: &str = "payment_intent.succeeded";
pub const CHECKOUT_SESSION_COMPLETED: &str = "checkout.session.completed";

/// Events that should be enabled on the Stripe webhook endpoint
pub const REQUIRED_WEBHOOK_EVENTS: &[&str] = &[PAYMENT_INTENT_SUCCEEDED, CHECKOUT_SESSION_COMPLETED];

/// The Stripe object carried by an event payload
fn event_object(payload: &Value) -> Result<&Map<String, Value>, HandlerError> {
    let object = payload
        .get("data")
        .and_then(|d| d.get("object"))
        .unwrap_or(payload);

    object
        .as_object()
        .ok_or_else(|| HandlerError::InvalidObject("event object is not a JSON object".to_string()))
}

/// Logs successful PaymentIntents
#[derive(Debug, Default, Clone, Copy)]
pub struct PaymentSucceededHandler;

impl EventHandler for PaymentSucceededHandler {
    fn handle(&self, payload: &Value) -> Result<(), HandlerError> {
        let object = event_object(payload)?;

        let amount = object
            .get("amount")
            .and_then(Value::as_i64)
            .ok_or_else(|| HandlerError::MissingField("amount".to_string()))?;

        let payment_intent = object.get("id").and_then(Value::as_str).unwrap_or("unknown");

        info!(payment_intent, amount, "Payment for {} succeeded.", amount);
        Ok(())
    }
}

/// Parsed checkout.session.completed object
#[derive(Debug, Clone, PartialEq)]
pub struct CheckoutCompletedData {
    pub session_id: String,
    pub payment_intent_id: Option<String>,
    pub customer_email: Option<String>,
    pub amount_total: i64,
    pub currency: String,
    pub payment_status: String,
}

impl CheckoutCompletedData {
    /// Parse from an event payload
    pub fn from_payload(payload: &Value) -> Result<Self, HandlerError> {
        let obj = event_object(payload)?;

        let session_id = obj
            .get("id")
            .and_then(Value::as_str)
            .map(String::from)
            .ok_or_else(|| HandlerError::MissingField("id".to_string()))?;

        let payment_intent_id = obj
            .get("payment_intent")
            .and_then(Value::as_str)
            .map(String::from);

        let customer_email = obj
            .get("customer_details")
            .and_then(|cd| cd.get("email"))
            .and_then(Value::as_str)
            .map(String::from);

        let amount_total = obj.get("amount_total").and_then(Value::as_i64).unwrap_or(0);

        let currency = obj
            .get("currency")
            .and_then(Value::as_str)
            .unwrap_or("usd")
            .to_lowercase();

        let payment_status = obj
            .get("payment_status")
            .and_then(Value::as_str)
            .unwrap_or("unknown")
            .to_string();

        Ok(Self {
            session_id,
            payment_intent_id,
            customer_email,
            amount_total,
            currency,
            payment_status,
        })
    }

    /// Check if payment was successful
    pub fn is_paid(&self) -> bool {
        self.payment_status == "paid"
    }
}

/// Logs completed Checkout Sessions
#[derive(Debug, Default, Clone, Copy)]
pub struct CheckoutCompletedHandler;

impl EventHandler for CheckoutCompletedHandler {
    fn handle(&self, payload: &Value) -> Result<(), HandlerError> {
        let data = CheckoutCompletedData::from_payload(payload)?;

        if data.is_paid() {
            info!(
                session = %data.session_id,
                amount_total = data.amount_total,
                currency = %data.currency,
                "Checkout completed"
            );
        } else {
            // Delayed payment methods complete the session before funds arrive
            warn!(
                session = %data.session_id,
                payment_status = %data.payment_status,
                "Checkout completed without payment"
            );
        }
        Ok(())
    }
}

/// Registry with all built-in handlers
pub fn default_registry() -> HandlerRegistry {
    HandlerRegistry::new()
        .with_handler(PAYMENT_INTENT_SUCCEEDED, PaymentSucceededHandler)
        .with_handler(CHECKOUT_SESSION_COMPLETED, CheckoutCompletedHandler)
}
