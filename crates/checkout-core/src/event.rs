//! # Webhook Event Types
//!
//! Inbound webhook data before and after verification.

use crate::error::{CheckoutError, VerificationError};
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use serde_json::{Map, Value};
use sha2::Sha256;
use std::fmt;
use subtle::ConstantTimeEq;

pub(crate) type HmacSha256 = Hmac<Sha256>;

/// Shared secret used to sign webhook payloads (`whsec_...`)
#[derive(Clone)]
pub struct WebhookSecret {
    bytes: Vec<u8>,
    keyed: HmacSha256,
}

impl WebhookSecret {
    /// Create a secret. Empty secrets are rejected.
    pub fn new(secret: impl Into<Vec<u8>>) -> Result<Self, CheckoutError> {
        let bytes = secret.into();
        if bytes.is_empty() {
            return Err(CheckoutError::Configuration(
                "webhook secret must not be empty".to_string(),
            ));
        }
        let keyed = HmacSha256::new_from_slice(&bytes).map_err(|e| {
            CheckoutError::Configuration(format!("invalid webhook secret: {}", e))
        })?;
        Ok(Self { bytes, keyed })
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Fresh HMAC instance keyed with this secret
    pub(crate) fn mac(&self) -> HmacSha256 {
        self.keyed.clone()
    }
}

impl PartialEq for WebhookSecret {
    fn eq(&self, other: &Self) -> bool {
        self.bytes.ct_eq(&other.bytes).into()
    }
}

impl Eq for WebhookSecret {}

impl fmt::Debug for WebhookSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("WebhookSecret(<redacted>)")
    }
}

/// An untrusted webhook request: exact body bytes plus the signature header
#[derive(Debug, Clone, Copy)]
pub struct SignedPayload<'a> {
    /// Raw request body, exactly as received
    pub body: &'a [u8],
    /// Value of the `Stripe-Signature` header
    pub signature_header: &'a str,
}

impl<'a> SignedPayload<'a> {
    pub fn new(body: &'a [u8], signature_header: &'a str) -> Self {
        Self {
            body,
            signature_header,
        }
    }
}

/// A webhook event that passed signature and freshness checks.
///
/// Only the verifier can build one, so holding a `VerifiedEvent` is proof
/// that its payload was signed with the shared secret.
#[derive(Debug, Clone, PartialEq)]
pub struct VerifiedEvent {
    event_type: String,
    id: Option<String>,
    payload: Value,
    timestamp: DateTime<Utc>,
}

impl VerifiedEvent {
    /// Parse an already-authenticated body.
    pub(crate) fn from_body(body: &[u8], timestamp: DateTime<Utc>) -> Result<Self, VerificationError> {
        let value: Value = serde_json::from_slice(body)
            .map_err(|e| VerificationError::MalformedPayload(format!("invalid JSON: {}", e)))?;

        let mut object: Map<String, Value> = match value {
            Value::Object(map) => map,
            _ => {
                return Err(VerificationError::MalformedPayload(
                    "payload is not a JSON object".to_string(),
                ))
            }
        };

        let event_type = match object.remove("type") {
            Some(Value::String(t)) => t,
            Some(_) => {
                return Err(VerificationError::MalformedPayload(
                    "`type` is not a string".to_string(),
                ))
            }
            None => {
                return Err(VerificationError::MalformedPayload(
                    "missing `type` field".to_string(),
                ))
            }
        };

        let id = object.get("id").and_then(|v| v.as_str()).map(String::from);

        Ok(Self {
            event_type,
            id,
            payload: Value::Object(object),
            timestamp,
        })
    }

    /// Event type tag, e.g. `payment_intent.succeeded`
    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    /// Provider event ID (`evt_...`), when the body carries one
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// Event body without its `type` member
    pub fn payload(&self) -> &Value {
        &self.payload
    }

    /// Signing timestamp from the signature header
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// The `data.object` member of a Stripe event envelope
    pub fn data_object(&self) -> Option<&Value> {
        self.payload.get("data").and_then(|d| d.get("object"))
    }
}
