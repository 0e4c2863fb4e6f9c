//! # checkout-server
//!
//! One-time payment checkout server.
//!
//! ## Usage
//!
//! ```bash
//! # Set environment variables (or put them in .env)
//! export STRIPE_SECRET_KEY=sk_test_...
//! export STRIPE_PUBLISHABLE_KEY=pk_test_...
//! export STRIPE_WEBHOOK_SECRET=whsec_...
//! export PRICE=price_...
//!
//! # Run the server
//! checkout-server
//! ```

use checkout_api::{routes, state::AppState};
use checkout_stripe::REQUIRED_WEBHOOK_EVENTS;
use tracing::{info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let state = AppState::new()?;

    let addr = state.config.socket_addr()?;
    let is_prod = state.config.is_production();

    info!("Environment: {}", state.config.environment);
    info!("Payment provider: {}", state.provider.provider_name());
    info!("Price: {}", state.config.price_id);
    info!("Static files: {}", state.config.static_dir.display());
    info!("Webhook handlers: {:?}", state.handlers.event_types());

    let app = routes::create_router(state);

    info!("Checkout server listening on http://{}", addr);

    if !is_prod {
        info!("Checkout: POST http://{}/create-checkout-session", addr);
        info!("Webhook: POST http://{}/webhook", addr);
        info!(
            "  stripe listen --forward-to http://{}/webhook --events {}",
            addr,
            REQUIRED_WEBHOOK_EVENTS.join(",")
        );
    }

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// `RUST_LOG` filters (default info); `LOG_FORMAT=json` switches to JSON lines
fn init_tracing() {
    let filter = EnvFilter::builder()
        .with_default_directive(Level::INFO.into())
        .from_env_lossy();

    let json = std::env::var("LOG_FORMAT")
        .map(|f| f.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer())
            .with(filter)
            .init();
    }
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Shutting down");
    }
}
