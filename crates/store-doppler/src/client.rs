//! # Doppler Client
//!
//! Bulk secret retrieval from the Doppler API. The cache refreshes through
//! the `SecretFetcher` trait so tests can inject an in-memory fetcher.

use async_trait::async_trait;
use reqwest::Client;
use std::collections::HashMap;
use std::env;
use store_core::{StoreError, StoreResult};
use tracing::{debug, error, instrument};

/// Names of the secrets this system tracks
pub mod names {
    /// HMAC key for checkout token signing
    pub const HMAC_SECRET_KEY: &str = "HMAC_SECRET_KEY";
    /// Stripe API secret key
    pub const STRIPE_SECRET_KEY: &str = "STRIPE_SECRET_KEY";
    /// Stripe webhook signing secret
    pub const STRIPE_WEBHOOK_SECRET: &str = "STRIPE_WEBHOOK_SECRET";
    /// Mailgun API key
    pub const MAILGUN_API_KEY: &str = "MAILGUN_API_KEY";
}

/// Bulk secret retrieval.
///
/// One call returns every secret for the configured project/config; the
/// cache never fetches per-name.
#[async_trait]
pub trait SecretFetcher: Send + Sync {
    async fn fetch_secrets(&self) -> StoreResult<HashMap<String, String>>;
}

/// Doppler API configuration
#[derive(Debug, Clone)]
pub struct DopplerConfig {
    /// Service token or personal API key
    pub api_key: String,

    /// Doppler project slug
    pub project: String,

    /// Doppler config slug (e.g. "dev", "prd")
    pub config: String,

    /// API base URL (for testing/mocking)
    pub api_base_url: String,
}

impl DopplerConfig {
    /// Load configuration from environment variables.
    ///
    /// Required env vars:
    /// - `DOPPLER_API_KEY`
    /// - `DOPPLER_PROJECT`
    ///
    /// `DOPPLER_CONFIG` defaults to "dev".
    pub fn from_env() -> StoreResult<Self> {
        dotenvy::dotenv().ok();

        let api_key = env::var("DOPPLER_API_KEY")
            .map_err(|_| StoreError::Configuration("DOPPLER_API_KEY not set".to_string()))?;
        let project = env::var("DOPPLER_PROJECT")
            .map_err(|_| StoreError::Configuration("DOPPLER_PROJECT not set".to_string()))?;
        let config = env::var("DOPPLER_CONFIG").unwrap_or_else(|_| "dev".to_string());

        Ok(Self {
            api_key,
            project,
            config,
            api_base_url: "https://api.doppler.com".to_string(),
        })
    }

    /// Builder: set custom API base URL (for testing)
    pub fn with_api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }
}

/// Client for the Doppler secrets API
pub struct DopplerClient {
    config: DopplerConfig,
    client: Client,
}

impl DopplerClient {
    /// Create a new Doppler client
    pub fn new(config: DopplerConfig) -> Self {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .expect("Failed to create HTTP client");

        Self { config, client }
    }

    /// Create from environment variables
    pub fn from_env() -> StoreResult<Self> {
        Ok(Self::new(DopplerConfig::from_env()?))
    }
}

#[async_trait]
impl SecretFetcher for DopplerClient {
    #[instrument(skip(self), fields(project = %self.config.project, config = %self.config.config))]
    async fn fetch_secrets(&self) -> StoreResult<HashMap<String, String>> {
        let url = format!(
            "{}/v3/configs/config/secrets/download",
            self.config.api_base_url
        );

        debug!("Fetching secrets from Doppler");

        let response = self
            .client
            .get(&url)
            .query(&[
                ("format", "json"),
                ("project", self.config.project.as_str()),
                ("config", self.config.config.as_str()),
            ])
            .bearer_auth(&self.config.api_key)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| StoreError::Network(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| StoreError::Network(e.to_string()))?;

        if !status.is_success() {
            error!("Doppler API error: status={}, body={}", status, body);
            return Err(StoreError::Provider {
                provider: "doppler".to_string(),
                message: format!("HTTP {}: {}", status, body),
            });
        }

        // The download endpoint returns a flat name -> value map
        let secrets: HashMap<String, String> = serde_json::from_str(&body).map_err(|e| {
            StoreError::Serialization(format!("Failed to parse Doppler response: {}", e))
        })?;

        debug!("Fetched {} secrets from Doppler", secrets.len());
        Ok(secrets)
    }
}
