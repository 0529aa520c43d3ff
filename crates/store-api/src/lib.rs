//! # store-api
//!
//! HTTP API layer for the storefront.
//!
//! This crate provides:
//! - Axum-based HTTP server
//! - Checkout token and session endpoints
//! - Webhook endpoint with fast-ack dispatch
//! - Order fulfillment (delivery email with attachments)
//!
//! ## Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | GET | `/health` | Health check |
//! | POST | `/api/v1/payments/generate-token` | Issue a checkout token |
//! | POST | `/api/v1/payments/create-checkout-session` | Open a checkout session |
//! | POST | `/webhook/stripe` | Stripe webhook |

pub mod fulfillment;
pub mod handlers;
pub mod routes;
pub mod state;

pub use fulfillment::FulfillmentHandler;
pub use routes::create_router;
pub use state::{AppConfig, AppState};
