//! # checkout-stripe
//!
//! Stripe integration for checkout-one-time-rs.
//!
//! - **StripeClient** - Prices and one-time Checkout Sessions over the REST API
//! - **StripeConfig** - keys loaded from the environment
//! - **handlers** - built-in webhook event handlers
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use checkout_core::{CheckoutProvider, SessionRequest};
//! use checkout_stripe::StripeClient;
//!
//! let stripe = StripeClient::from_env()?;
//! let request = SessionRequest::new(price_id, 1, success_url, cancel_url);
//! let session = stripe.create_checkout_session(&request).await?;
//!
//! // Redirect user to session.url
//! ```
//!
//! ## Webhook Handling
//!
//! ```rust,ignore
//! use checkout_core::{SignedPayload, WebhookVerifier};
//! use checkout_stripe::default_registry;
//!
//! let verifier = WebhookVerifier::new(stripe.config().webhook_secret()?);
//! let handlers = default_registry();
//!
//! // In your webhook endpoint:
//! let event = verifier.verify(&SignedPayload::new(&body, signature))?;
//! handlers.dispatch(&event)?;
//! ```

pub mod client;
pub mod config;
pub mod handlers;

// Re-exports
pub use client::{StripeClient, APP_INFO};
pub use config::StripeConfig;
pub use handlers::{
    default_registry, CheckoutCompletedData, CheckoutCompletedHandler, PaymentSucceededHandler,
    REQUIRED_WEBHOOK_EVENTS,
};
