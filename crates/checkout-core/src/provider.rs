//! # Checkout Provider Trait
//!
//! The remote payment API the server talks to. Stripe is the only
//! implementation; handlers depend on the trait so tests can stub it.
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │          CheckoutProvider (trait)            │
//! │  ├── retrieve_price()                        │
//! │  ├── create_checkout_session()               │
//! │  ├── retrieve_checkout_session()             │
//! │  └── provider_name()                         │
//! └──────────────────────────────────────────────┘
//!                       ▲
//!               ┌───────┴───────┐
//!               │ StripeClient  │
//!               └───────────────┘
//! ```

use crate::error::{CheckoutError, CheckoutResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// A price as configured at the provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Price {
    /// Provider price ID (`price_...`)
    pub id: String,
    /// Amount in the smallest currency unit; absent for custom/tiered prices
    #[serde(default)]
    pub unit_amount: Option<i64>,
    /// ISO currency code, lowercase
    pub currency: String,
}

/// Parameters for a one-time payment Checkout Session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRequest {
    pub price_id: String,
    pub quantity: u64,
    /// e.g. `["card"]`
    pub payment_method_types: Vec<String>,
    pub success_url: String,
    pub cancel_url: String,
}

impl SessionRequest {
    pub fn new(
        price_id: impl Into<String>,
        quantity: u64,
        success_url: impl Into<String>,
        cancel_url: impl Into<String>,
    ) -> Self {
        Self {
            price_id: price_id.into(),
            quantity,
            payment_method_types: vec!["card".to_string()],
            success_url: success_url.into(),
            cancel_url: cancel_url.into(),
        }
    }

    /// Builder: set accepted payment method types
    pub fn with_payment_method_types(mut self, types: Vec<String>) -> Self {
        self.payment_method_types = types;
        self
    }

    /// Reject requests the provider would refuse anyway
    pub fn validate(&self) -> CheckoutResult<()> {
        if self.quantity == 0 {
            return Err(CheckoutError::InvalidRequest(
                "quantity must be at least 1".to_string(),
            ));
        }
        if self.price_id.is_empty() {
            return Err(CheckoutError::InvalidRequest("price id is empty".to_string()));
        }
        if self.payment_method_types.is_empty() {
            return Err(CheckoutError::InvalidRequest(
                "at least one payment method type is required".to_string(),
            ));
        }
        Ok(())
    }
}

/// A Checkout Session created by the provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutSession {
    /// Provider session ID (`cs_...`)
    pub id: String,
    /// Hosted payment page to redirect the customer to
    pub url: String,
}

/// Remote payment API used by the HTTP handlers
#[async_trait]
pub trait CheckoutProvider: Send + Sync {
    /// Look up a configured price.
    async fn retrieve_price(&self, price_id: &str) -> CheckoutResult<Price>;

    /// Create a one-time payment Checkout Session.
    async fn create_checkout_session(&self, request: &SessionRequest) -> CheckoutResult<CheckoutSession>;

    /// Fetch a Checkout Session as the provider's raw JSON.
    async fn retrieve_checkout_session(&self, session_id: &str) -> CheckoutResult<serde_json::Value>;

    /// Provider name (for logging).
    fn provider_name(&self) -> &'static str;
}

/// Type alias for a shared provider (dynamic dispatch)
pub type BoxedCheckoutProvider = Arc<dyn CheckoutProvider>;
