//! # checkout-core
//!
//! Core types and traits for the checkout-one-time server.
//!
//! This crate provides:
//! - `verify` / `WebhookVerifier` for HMAC-SHA256 signed webhook payloads
//! - `VerifiedEvent`, the only trusted form of an inbound event
//! - `HandlerRegistry` and `dispatch` for routing events by type
//! - `CheckoutProvider` trait for the remote payment API
//! - `CheckoutError`, `VerificationError` and `HandlerError`
//!
//! ## Example
//!
//! ```rust,ignore
//! use checkout_core::{HandlerRegistry, SignedPayload, WebhookSecret, WebhookVerifier};
//!
//! let verifier = WebhookVerifier::new(WebhookSecret::new("whsec_...")?);
//! let handlers = HandlerRegistry::new()
//!     .with_fn("payment_intent.succeeded", |payload: &serde_json::Value| {
//!         println!("paid: {}", payload["amount"]);
//!         Ok(())
//!     });
//!
//! let event = verifier.verify(&SignedPayload::new(&body, signature_header))?;
//! handlers.dispatch(&event)?;
//! ```

pub mod dispatch;
pub mod error;
pub mod event;
pub mod provider;
pub mod signature;

// Re-exports for convenience
pub use dispatch::{dispatch, Dispatched, EventHandler, HandlerRegistry};
pub use error::{CheckoutError, CheckoutResult, HandlerError, VerificationError};
pub use event::{SignedPayload, VerifiedEvent, WebhookSecret};
pub use provider::{BoxedCheckoutProvider, CheckoutProvider, CheckoutSession, Price, SessionRequest};
pub use signature::{
    sign, verify, verify_at, SignatureHeader, WebhookVerifier, DEFAULT_TOLERANCE_SECS,
};
