//! # Application State
//!
//! Shared state for the Axum application: the secret cache, the token
//! codec, provider clients, and the price catalog.

use std::sync::Arc;
use store_core::PriceCatalog;
use store_doppler::{DopplerClient, SecretCache};
use store_mailgun::{MailgunClient, MailgunConfig};
use store_stripe::{CheckoutTokenCodec, StripeClient, StripeConfig, WebhookVerifier};

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// URL to redirect after successful payment
    pub success_url: String,
    /// URL to redirect if payment is cancelled
    pub cancel_url: String,
    /// Environment (development, staging, production)
    pub environment: String,
}

impl AppConfig {
    /// Load from environment variables
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let base_url =
            std::env::var("BASE_URL").unwrap_or_else(|_| "http://localhost:8080".to_string());

        Self {
            host: std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: std::env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8080),
            success_url: std::env::var("CHECKOUT_SUCCESS_URL")
                .unwrap_or_else(|_| format!("{}/checkout/success", base_url)),
            cancel_url: std::env::var("CHECKOUT_CANCEL_URL")
                .unwrap_or_else(|_| format!("{}/checkout/cancel", base_url)),
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
        }
    }

    /// Get the socket address to bind to
    pub fn socket_addr(&self) -> std::net::SocketAddr {
        format!("{}:{}", self.host, self.port)
            .parse()
            .expect("Invalid socket address")
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Secret cache shared by every provider client
    pub secrets: Arc<SecretCache>,
    /// Checkout token codec
    pub codec: Arc<CheckoutTokenCodec>,
    /// Stripe Checkout Sessions client
    pub stripe: Arc<StripeClient>,
    /// Webhook signature verifier
    pub verifier: Arc<WebhookVerifier>,
    /// Mailgun delivery client
    pub mailgun: Arc<MailgunClient>,
    /// Purchasable-item allow-list
    pub catalog: Arc<PriceCatalog>,
    /// Application config
    pub config: AppConfig,
}

impl AppState {
    /// Create the full application state from the environment
    pub fn new() -> anyhow::Result<Self> {
        let config = AppConfig::from_env();

        let doppler = DopplerClient::from_env()
            .map_err(|e| anyhow::anyhow!("Failed to initialize Doppler: {}", e))?;
        let secrets = Arc::new(SecretCache::with_default_ttl(Arc::new(doppler)));

        let stripe_config = StripeConfig::from_env()
            .map_err(|e| anyhow::anyhow!("Failed to load Stripe config: {}", e))?;
        let mailgun_config = MailgunConfig::from_env()
            .map_err(|e| anyhow::anyhow!("Failed to load Mailgun config: {}", e))?;

        let catalog = Arc::new(load_catalog()?);

        Ok(Self {
            codec: Arc::new(CheckoutTokenCodec::new(secrets.clone())),
            stripe: Arc::new(StripeClient::new(stripe_config, secrets.clone())),
            verifier: Arc::new(WebhookVerifier::new(secrets.clone())),
            mailgun: Arc::new(MailgunClient::new(mailgun_config, secrets.clone())),
            catalog,
            secrets,
            config,
        })
    }
}

/// Load the price catalog from config/catalog.toml
fn load_catalog() -> anyhow::Result<PriceCatalog> {
    let config_paths = [
        "config/catalog.toml",
        "../config/catalog.toml",
        "../../config/catalog.toml",
    ];

    for path in config_paths {
        if let Ok(content) = std::fs::read_to_string(path) {
            let catalog = PriceCatalog::from_toml(&content)
                .map_err(|e| anyhow::anyhow!("Failed to parse {}: {}", path, e))?;
            tracing::info!("Loaded {} catalog items from {}", catalog.products.len(), path);
            return Ok(catalog);
        }
    }

    // An empty catalog means no token can ever be issued; startable, but loud.
    tracing::warn!("No catalog found, using empty catalog");
    Ok(PriceCatalog::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_config_defaults() {
        std::env::remove_var("HOST");
        std::env::remove_var("PORT");
        std::env::remove_var("BASE_URL");
        std::env::remove_var("CHECKOUT_SUCCESS_URL");

        let config = AppConfig::from_env();
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 8080);
        assert_eq!(config.success_url, "http://localhost:8080/checkout/success");
    }

    #[test]
    fn test_socket_addr() {
        let config = AppConfig {
            host: "0.0.0.0".to_string(),
            port: 3000,
            success_url: "http://localhost:3000/checkout/success".to_string(),
            cancel_url: "http://localhost:3000/checkout/cancel".to_string(),
            environment: "test".to_string(),
        };

        let addr = config.socket_addr();
        assert_eq!(addr.to_string(), "0.0.0.0:3000");
    }
}
