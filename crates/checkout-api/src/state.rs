//! # Application State
//!
//! Configuration and shared state for the Axum application.
//! Everything here is built once at startup and never mutated.

use checkout_core::{
    BoxedCheckoutProvider, CheckoutError, CheckoutResult, HandlerRegistry, WebhookVerifier,
    DEFAULT_TOLERANCE_SECS,
};
use checkout_stripe::{default_registry, StripeClient, StripeConfig};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use tracing::info;

/// Placeholder price shipped in the sample `.env`
const PLACEHOLDER_PRICE: &str = "price_12345";

/// What the webhook endpoint answers when a verified event's handler fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HandlerFailurePolicy {
    /// Log the failure and answer 200 so the sender does not retry
    #[default]
    Acknowledge,
    /// Answer 500 so the sender retries the delivery
    Retry,
}

impl FromStr for HandlerFailurePolicy {
    type Err = CheckoutError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "acknowledge" | "ack" => Ok(Self::Acknowledge),
            "retry" => Ok(Self::Retry),
            other => Err(CheckoutError::Configuration(format!(
                "WEBHOOK_HANDLER_FAILURE must be acknowledge or retry, got {:?}",
                other
            ))),
        }
    }
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Public origin used to build success/cancel URLs
    pub domain: String,
    /// Price sold by the checkout page
    pub price_id: String,
    /// Accepted payment method types
    pub payment_method_types: Vec<String>,
    /// Directory served for every path without a route
    pub static_dir: PathBuf,
    /// Webhook replay window
    pub webhook_tolerance_secs: u64,
    /// Status policy for failed event handlers
    pub handler_failure: HandlerFailurePolicy,
    /// Environment (development, staging, production)
    pub environment: String,
}

impl AppConfig {
    /// Load from environment variables (and `.env` if present)
    pub fn from_env() -> CheckoutResult<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load through an arbitrary variable lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> CheckoutResult<Self> {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let price_id = var("PRICE").unwrap_or_default();
        if price_id.is_empty() || price_id == PLACEHOLDER_PRICE {
            return Err(CheckoutError::Configuration(
                "You must set a Price ID in PRICE (see .env.example)".to_string(),
            ));
        }

        let port: u16 = match var("PORT") {
            Some(p) => p
                .parse()
                .map_err(|_| CheckoutError::Configuration(format!("invalid PORT {:?}", p)))?,
            None => 4242,
        };

        let payment_method_types: Vec<String> = var("PAYMENT_METHOD_TYPES")
            .unwrap_or_else(|| "card".to_string())
            .split(',')
            .map(|t| t.trim().to_ascii_lowercase())
            .filter(|t| !t.is_empty())
            .collect();

        let webhook_tolerance_secs: u64 = match var("WEBHOOK_TOLERANCE_SECS") {
            Some(t) => t.parse().map_err(|_| {
                CheckoutError::Configuration(format!("invalid WEBHOOK_TOLERANCE_SECS {:?}", t))
            })?,
            None => DEFAULT_TOLERANCE_SECS,
        };

        let handler_failure = match var("WEBHOOK_HANDLER_FAILURE") {
            Some(p) => p.parse()?,
            None => HandlerFailurePolicy::default(),
        };

        Ok(Self {
            host: var("HOST").unwrap_or_else(|| "127.0.0.1".to_string()),
            port,
            domain: var("DOMAIN")
                .unwrap_or_else(|| format!("http://localhost:{}", port))
                .trim_end_matches('/')
                .to_string(),
            price_id,
            payment_method_types,
            static_dir: PathBuf::from(var("STATIC_DIR").unwrap_or_else(|| "../client".to_string())),
            webhook_tolerance_secs,
            handler_failure,
            environment: var("ENVIRONMENT").unwrap_or_else(|| "development".to_string()),
        })
    }

    /// Get the socket address to bind to
    pub fn socket_addr(&self) -> CheckoutResult<SocketAddr> {
        format!("{}:{}", self.host, self.port).parse().map_err(|_| {
            CheckoutError::Configuration(format!("invalid bind address {}:{}", self.host, self.port))
        })
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// Success page; Stripe substitutes the session ID placeholder
    pub fn success_url(&self) -> String {
        format!("{}/success.html?session_id={{CHECKOUT_SESSION_ID}}", self.domain)
    }

    pub fn cancel_url(&self) -> String {
        format!("{}/canceled.html", self.domain)
    }
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Application config
    pub config: Arc<AppConfig>,
    /// Remote payment API
    pub provider: BoxedCheckoutProvider,
    /// Publishable key handed to the browser by `/config`
    pub publishable_key: String,
    /// Webhook signature verifier
    pub verifier: Arc<WebhookVerifier>,
    /// Event type -> handler table
    pub handlers: Arc<HandlerRegistry>,
}

impl AppState {
    /// Create a new AppState backed by Stripe
    pub fn new() -> anyhow::Result<Self> {
        let config = AppConfig::from_env()?;
        let stripe_config = StripeConfig::from_env()?;

        let stripe = StripeClient::new(stripe_config)?;

        info!(test_mode = stripe.config().is_test_mode(), "Stripe client ready");

        let verifier = WebhookVerifier::new(stripe.config().webhook_secret()?)
            .with_tolerance(config.webhook_tolerance_secs);
        let publishable_key = stripe.config().publishable_key.clone();

        Ok(Self::from_parts(
            config,
            Arc::new(stripe),
            publishable_key,
            verifier,
            default_registry(),
        ))
    }

    /// Assemble state from already-built parts
    pub fn from_parts(
        config: AppConfig,
        provider: BoxedCheckoutProvider,
        publishable_key: impl Into<String>,
        verifier: WebhookVerifier,
        handlers: HandlerRegistry,
    ) -> Self {
        Self {
            config: Arc::new(config),
            provider,
            publishable_key: publishable_key.into(),
            verifier: Arc::new(verifier),
            handlers: Arc::new(handlers),
        }
    }
}
