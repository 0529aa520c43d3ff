//! # Stripe Configuration
//!
//! Non-secret Stripe knobs. The API key and webhook secret are deliberately
//! absent here: they flow from the secret cache at call time, so a key
//! rotation in the secret store takes effect without a restart.

use std::env;
use store_core::StoreResult;

/// Stripe API configuration
#[derive(Debug, Clone)]
pub struct StripeConfig {
    /// API base URL (for testing/mocking)
    pub api_base_url: String,

    /// API version pinned on every request
    pub api_version: String,

    /// Optional payment method configuration id (pmc_...)
    pub payment_method_configuration: Option<String>,
}

impl StripeConfig {
    /// Load configuration from environment variables.
    ///
    /// Optional env vars:
    /// - `STRIPE_API_VERSION`
    /// - `STRIPE_PAYMENT_METHOD_CONFIGURATION`
    pub fn from_env() -> StoreResult<Self> {
        dotenvy::dotenv().ok();

        Ok(Self {
            api_base_url: "https://api.stripe.com".to_string(),
            api_version: env::var("STRIPE_API_VERSION")
                .unwrap_or_else(|_| "2024-12-18.acacia".to_string()),
            payment_method_configuration: env::var("STRIPE_PAYMENT_METHOD_CONFIGURATION").ok(),
        })
    }

    /// Create config with explicit values (for testing)
    pub fn new(api_version: impl Into<String>) -> Self {
        Self {
            api_base_url: "https://api.stripe.com".to_string(),
            api_version: api_version.into(),
            payment_method_configuration: None,
        }
    }

    /// Builder: set custom API base URL (for testing)
    pub fn with_api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }

    /// Builder: set the payment method configuration id
    pub fn with_payment_method_configuration(mut self, pmc: impl Into<String>) -> Self {
        self.payment_method_configuration = Some(pmc.into());
        self
    }
}
