//! # checkout-api
//!
//! HTTP layer for checkout-one-time-rs.
//!
//! ## Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | GET | `/health` | Health check |
//! | GET | `/config` | Publishable key, unit amount and currency |
//! | GET | `/checkout-session?sessionId=` | Fetch a Checkout Session |
//! | POST | `/create-checkout-session` | Create session, 303 to Stripe Checkout |
//! | POST | `/webhook` | Signed Stripe webhook |
//! | GET | `/*` | Static files from `STATIC_DIR` |

pub mod handlers;
pub mod routes;
pub mod state;

pub use routes::create_router;
pub use state::{AppConfig, AppState, HandlerFailurePolicy};
