//! # Routes
//!
//! Axum router configuration for the checkout server.

use crate::handlers;
use crate::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};

/// Create the main application router
///
/// Routes:
/// - GET  /health                  - Health check
/// - GET  /config                  - Publishable key and price for the page
/// - GET  /checkout-session        - Fetch a Checkout Session (`?sessionId=`)
/// - POST /create-checkout-session - Create a session, 303 to Stripe Checkout
/// - POST /webhook                 - Signed Stripe webhook
/// - anything else                 - Static files from `STATIC_DIR`
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let static_files = ServeDir::new(&state.config.static_dir);

    Router::new()
        .route("/health", get(handlers::health))
        .route("/config", get(handlers::get_config))
        .route("/checkout-session", get(handlers::get_checkout_session))
        .route("/create-checkout-session", post(handlers::create_checkout_session))
        // Raw body: the signature covers the exact bytes
        .route("/webhook", post(handlers::webhook))
        .fallback_service(static_files)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}
