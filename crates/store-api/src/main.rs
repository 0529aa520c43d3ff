//! # Storefront
//!
//! Checkout and webhook backend for the storefront.
//!
//! ## Usage
//!
//! ```bash
//! # Set environment variables
//! export DOPPLER_API_KEY=dp.st....
//! export DOPPLER_PROJECT=storefront
//! export MAILGUN_MESSAGES_URL=https://api.mailgun.net/v3/mg.example.com/messages
//! export MAILGUN_FROM_ADDRESS=orders@example.com
//!
//! # Run the server
//! storefront
//! ```

use store_api::{routes, state::AppState};
use tracing::{info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(Level::INFO.into())
                .from_env_lossy(),
        )
        .init();

    // Initialize application state
    let state = AppState::new()?;

    let addr = state.config.socket_addr();
    let is_prod = state.config.is_production();

    info!("Environment: {}", state.config.environment);
    info!("Catalog items: {}", state.catalog.products.len());

    // Create router
    let app = routes::create_router(state);

    // Start server
    info!("Storefront starting on http://{}", addr);

    if !is_prod {
        info!("Health:   GET  http://{}/health", addr);
        info!("Token:    POST http://{}/api/v1/payments/generate-token", addr);
        info!("Checkout: POST http://{}/api/v1/payments/create-checkout-session", addr);
        info!("Webhook:  POST http://{}/webhook/stripe", addr);
    }

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
