//! # Stripe REST Client
//!
//! `CheckoutProvider` implementation over the Stripe REST API:
//! Prices, and one-time payment Checkout Sessions.

use crate::config::StripeConfig;
use async_trait::async_trait;
use checkout_core::{
    CheckoutError, CheckoutProvider, CheckoutResult, CheckoutSession, Price, SessionRequest,
};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, error, info, instrument};
use uuid::Uuid;

const PROVIDER: &str = "stripe";

/// Sent as the user agent so Stripe can attribute traffic to this sample
pub const APP_INFO: &str = "stripe-samples/checkout-one-time-payments/0.0.1";

/// Stripe API client
pub struct StripeClient {
    config: StripeConfig,
    client: Client,
}

impl StripeClient {
    /// Create a new Stripe client
    pub fn new(config: StripeConfig) -> CheckoutResult<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .user_agent(APP_INFO)
            .build()
            .map_err(|e| CheckoutError::Configuration(format!("HTTP client: {}", e)))?;

        Ok(Self { config, client })
    }

    /// Create from environment variables
    pub fn from_env() -> CheckoutResult<Self> {
        Self::new(StripeConfig::from_env()?)
    }

    pub fn config(&self) -> &StripeConfig {
        &self.config
    }

    fn url(&self, path: &str) -> String {
        format!("{}/v1/{}", self.config.api_base_url, path)
    }

    /// Attach auth headers, send, and decode the JSON body or Stripe's error
    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> CheckoutResult<T> {
        let response = request
            .header("Authorization", self.config.auth_header())
            .header("Stripe-Version", &self.config.api_version)
            .send()
            .await
            .map_err(|e| CheckoutError::Network(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| CheckoutError::Network(e.to_string()))?;

        if !status.is_success() {
            error!("Stripe API error: status={}, body={}", status, body);

            let message = match serde_json::from_str::<StripeErrorResponse>(&body) {
                Ok(error_response) => error_response.error.message,
                Err(_) => format!("HTTP {}: {}", status, body),
            };

            return Err(CheckoutError::Provider {
                provider: PROVIDER.to_string(),
                message,
            });
        }

        serde_json::from_str(&body).map_err(|e| {
            CheckoutError::Serialization(format!("Failed to parse Stripe response: {}", e))
        })
    }
}

/// Stripe object IDs are `prefix_` plus alphanumerics
fn validate_object_id(id: &str) -> CheckoutResult<()> {
    if id.is_empty() || !id.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(CheckoutError::InvalidRequest(format!("invalid object id: {:?}", id)));
    }
    Ok(())
}

fn session_form(request: &SessionRequest) -> Vec<(String, String)> {
    let mut form_params: Vec<(String, String)> = vec![
        ("mode".to_string(), "payment".to_string()),
        ("success_url".to_string(), request.success_url.clone()),
        ("cancel_url".to_string(), request.cancel_url.clone()),
    ];

    for (i, method) in request.payment_method_types.iter().enumerate() {
        form_params.push((format!("payment_method_types[{}]", i), method.clone()));
    }

    form_params.push(("line_items[0][price]".to_string(), request.price_id.clone()));
    form_params.push((
        "line_items[0][quantity]".to_string(),
        request.quantity.to_string(),
    ));

    form_params
}

#[async_trait]
impl CheckoutProvider for StripeClient {
    #[instrument(skip(self))]
    async fn retrieve_price(&self, price_id: &str) -> CheckoutResult<Price> {
        validate_object_id(price_id)?;

        let price: Price = self
            .send(self.client.get(self.url(&format!("prices/{}", price_id))))
            .await?;

        debug!(unit_amount = ?price.unit_amount, currency = %price.currency, "Retrieved price");
        Ok(price)
    }

    #[instrument(skip(self, request), fields(price = %request.price_id, quantity = request.quantity))]
    async fn create_checkout_session(&self, request: &SessionRequest) -> CheckoutResult<CheckoutSession> {
        request.validate()?;

        let idempotency_key = Uuid::new_v4().to_string();
        let response: StripeCheckoutSessionResponse = self
            .send(
                self.client
                    .post(self.url("checkout/sessions"))
                    .header("Idempotency-Key", &idempotency_key)
                    .form(&session_form(request)),
            )
            .await?;

        let url = response.url.ok_or_else(|| CheckoutError::Provider {
            provider: PROVIDER.to_string(),
            message: format!("session {} has no url", response.id),
        })?;

        info!("Created Stripe checkout session: id={}", response.id);

        Ok(CheckoutSession {
            id: response.id,
            url,
        })
    }

    #[instrument(skip(self))]
    async fn retrieve_checkout_session(&self, session_id: &str) -> CheckoutResult<serde_json::Value> {
        validate_object_id(session_id)?;

        self.send(
            self.client
                .get(self.url(&format!("checkout/sessions/{}", session_id))),
        )
        .await
    }

    fn provider_name(&self) -> &'static str {
        PROVIDER
    }
}

// =============================================================================
// Stripe API Types
// =============================================================================

#[derive(Debug, Deserialize)]
struct StripeCheckoutSessionResponse {
    id: String,
    #[serde(default)]
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StripeErrorResponse {
    error: StripeError,
}

#[derive(Debug, Deserialize)]
struct StripeError {
    message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_string_contains, header, header_exists, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> StripeClient {
        let config = StripeConfig::new("sk_test_abc123", "pk_test_xyz789", "whsec_secret")
            .with_api_base_url(server.uri());
        StripeClient::new(config).unwrap()
    }

    #[test]
    fn test_session_form_fields() {
        let request = SessionRequest::new("price_1", 3, "https://d/success", "https://d/cancel")
            .with_payment_method_types(vec!["card".into(), "alipay".into()]);
        let form = session_form(&request);

        assert!(form.contains(&("mode".into(), "payment".into())));
        assert!(form.contains(&("payment_method_types[1]".into(), "alipay".into())));
        assert!(form.contains(&("line_items[0][price]".into(), "price_1".into())));
        assert!(form.contains(&("line_items[0][quantity]".into(), "3".into())));
    }

    #[test]
    fn test_validate_object_id() {
        assert!(validate_object_id("cs_test_a1B2").is_ok());
        assert!(validate_object_id("").is_err());
        assert!(validate_object_id("../prices").is_err());
        assert!(validate_object_id("cs_1?expand=x").is_err());
    }

    #[tokio::test]
    async fn test_client_exposes_config() {
        let server = MockServer::start().await;
        let client = client_for(&server);

        assert_eq!(client.provider_name(), "stripe");
        assert!(client.config().is_test_mode());
        assert_eq!(client.config().api_base_url, server.uri());
    }

    #[tokio::test]
    async fn test_retrieve_price() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/prices/price_123"))
            .and(header("authorization", "Bearer sk_test_abc123"))
            .and(header_exists("stripe-version"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "price_123",
                "object": "price",
                "unit_amount": 1999,
                "currency": "usd"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let price = client_for(&server).retrieve_price("price_123").await.unwrap();

        assert_eq!(price.unit_amount, Some(1999));
        assert_eq!(price.currency, "usd");
    }

    #[tokio::test]
    async fn test_create_checkout_session() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/checkout/sessions"))
            .and(header_exists("idempotency-key"))
            .and(body_string_contains("mode=payment"))
            .and(body_string_contains("line_items%5B0%5D%5Bquantity%5D=2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "cs_test_1",
                "url": "https://checkout.stripe.com/c/pay/cs_test_1"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let request = SessionRequest::new("price_123", 2, "https://d/success", "https://d/cancel");
        let session = client_for(&server)
            .create_checkout_session(&request)
            .await
            .unwrap();

        assert_eq!(session.id, "cs_test_1");
        assert_eq!(session.url, "https://checkout.stripe.com/c/pay/cs_test_1");
    }

    #[tokio::test]
    async fn test_zero_quantity_never_reaches_stripe() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let request = SessionRequest::new("price_123", 0, "s", "c");
        let result = client_for(&server).create_checkout_session(&request).await;

        assert!(matches!(result, Err(CheckoutError::InvalidRequest(_))));
    }

    #[tokio::test]
    async fn test_stripe_error_is_surfaced() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/prices/price_missing"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "error": { "message": "No such price: 'price_missing'", "type": "invalid_request_error" }
            })))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .retrieve_price("price_missing")
            .await
            .unwrap_err();

        match err {
            CheckoutError::Provider { provider, message } => {
                assert_eq!(provider, "stripe");
                assert!(message.contains("No such price"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_retrieve_checkout_session_passthrough() {
        let server = MockServer::start().await;
        let session = json!({
            "id": "cs_test_1",
            "object": "checkout.session",
            "payment_status": "paid",
            "amount_total": 3998
        });
        Mock::given(method("GET"))
            .and(path("/v1/checkout/sessions/cs_test_1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(session.clone()))
            .mount(&server)
            .await;

        let fetched = client_for(&server)
            .retrieve_checkout_session("cs_test_1")
            .await
            .unwrap();

        assert_eq!(fetched, session);
    }

    #[tokio::test]
    async fn test_network_error() {
        let config = StripeConfig::new("sk_test_abc123", "pk_test_xyz789", "whsec_secret")
            .with_api_base_url("http://127.0.0.1:1");
        let client = StripeClient::new(config).unwrap();

        let err = client.retrieve_price("price_123").await.unwrap_err();
        assert!(matches!(err, CheckoutError::Network(_)));
        assert!(err.is_retryable());
    }
}
