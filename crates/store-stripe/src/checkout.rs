//! # Stripe Checkout Sessions
//!
//! Creates and retrieves Checkout Sessions against the Stripe API. The
//! purchased price ids are mirrored into both the session metadata and the
//! payment-intent metadata, so the later `payment_intent.succeeded` webhook
//! carries everything fulfillment needs without an order store.

use crate::config::StripeConfig;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use store_core::{StoreError, StoreResult};
use store_doppler::{names, SecretCache};
use tracing::{debug, error, info, instrument};
use uuid::Uuid;

/// Client for the Stripe Checkout Sessions API
pub struct StripeClient {
    config: StripeConfig,
    secrets: Arc<SecretCache>,
    client: Client,
}

/// A created or retrieved checkout session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutSession {
    /// Stripe session id (cs_...)
    pub session_id: String,

    /// Hosted checkout URL to redirect the customer to
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// Unix timestamp when the session expires
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<i64>,

    /// Payment status reported by Stripe ("paid", "unpaid", ...)
    pub payment_status: String,
}

impl StripeClient {
    /// Create a new Stripe client
    pub fn new(config: StripeConfig, secrets: Arc<SecretCache>) -> Self {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            config,
            secrets,
            client,
        }
    }

    /// Create a checkout session for a set of pre-authorized price ids.
    ///
    /// The price ids come out of a verified checkout token, so no further
    /// allow-list validation happens here.
    #[instrument(skip(self), fields(ids = price_ids.len(), quantity))]
    pub async fn create_checkout_session(
        &self,
        price_ids: &[String],
        quantity: u32,
        success_url: &str,
        cancel_url: &str,
    ) -> StoreResult<CheckoutSession> {
        if price_ids.is_empty() {
            return Err(StoreError::InvalidPriceId {
                price_id: "<empty>".to_string(),
            });
        }

        let secret_key = self.secrets.get(names::STRIPE_SECRET_KEY).await?;

        let joined_ids = price_ids.join(",");
        let mut form_params: Vec<(String, String)> = vec![
            ("mode".to_string(), "payment".to_string()),
            ("success_url".to_string(), success_url.to_string()),
            ("cancel_url".to_string(), cancel_url.to_string()),
            ("metadata[price_ids]".to_string(), joined_ids.clone()),
            // Mirrored onto the payment intent so the payment_intent.succeeded
            // event carries the purchased items.
            (
                "payment_intent_data[metadata][price_ids]".to_string(),
                joined_ids,
            ),
        ];

        for (i, price_id) in price_ids.iter().enumerate() {
            form_params.push((format!("line_items[{}][price]", i), price_id.clone()));
            form_params.push((format!("line_items[{}][quantity]", i), quantity.to_string()));
        }

        if let Some(ref pmc) = self.config.payment_method_configuration {
            form_params.push(("payment_method_configuration".to_string(), pmc.clone()));
        }

        debug!("Creating checkout session: {} line items", price_ids.len());

        let url = format!("{}/v1/checkout/sessions", self.config.api_base_url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&secret_key)
            .header("Stripe-Version", &self.config.api_version)
            .header("Idempotency-Key", Uuid::new_v4().to_string())
            .form(&form_params)
            .send()
            .await
            .map_err(|e| StoreError::Network(e.to_string()))?;

        let session = parse_session_response(response).await?;
        info!(session_id = %session.session_id, "Created checkout session");
        Ok(session)
    }

    /// Retrieve an existing checkout session by id
    #[instrument(skip(self))]
    pub async fn retrieve_checkout_session(&self, session_id: &str) -> StoreResult<CheckoutSession> {
        let secret_key = self.secrets.get(names::STRIPE_SECRET_KEY).await?;

        let url = format!(
            "{}/v1/checkout/sessions/{}",
            self.config.api_base_url, session_id
        );
        let response = self
            .client
            .get(&url)
            .bearer_auth(&secret_key)
            .header("Stripe-Version", &self.config.api_version)
            .send()
            .await
            .map_err(|e| StoreError::Network(e.to_string()))?;

        parse_session_response(response).await
    }
}

async fn parse_session_response(response: reqwest::Response) -> StoreResult<CheckoutSession> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| StoreError::Network(e.to_string()))?;

    if !status.is_success() {
        error!("Stripe API error: status={}, body={}", status, body);

        if let Ok(error_response) = serde_json::from_str::<StripeErrorResponse>(&body) {
            return Err(StoreError::Provider {
                provider: "stripe".to_string(),
                message: error_response.error.message,
            });
        }
        return Err(StoreError::Provider {
            provider: "stripe".to_string(),
            message: format!("HTTP {}: {}", status, body),
        });
    }

    let session: StripeSessionResponse = serde_json::from_str(&body).map_err(|e| {
        StoreError::Serialization(format!("Failed to parse Stripe response: {}", e))
    })?;

    Ok(CheckoutSession {
        session_id: session.id,
        url: session.url,
        expires_at: session.expires_at,
        payment_status: session.payment_status.unwrap_or_else(|| "unpaid".to_string()),
    })
}

// =============================================================================
// Stripe API Types
// =============================================================================

#[derive(Debug, Deserialize)]
struct StripeSessionResponse {
    id: String,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    expires_at: Option<i64>,
    #[serde(default)]
    payment_status: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StripeErrorResponse {
    error: StripeApiError,
}

#[derive(Debug, Deserialize)]
struct StripeApiError {
    message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::static_cache;
    use wiremock::matchers::{body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(base_url: &str) -> StripeClient {
        let config = StripeConfig::new("2024-12-18.acacia")
            .with_api_base_url(base_url)
            .with_payment_method_configuration("pmc_test");
        StripeClient::new(
            config,
            static_cache(&[(names::STRIPE_SECRET_KEY, "sk_test_123")]),
        )
    }

    #[tokio::test]
    async fn test_create_session_sends_line_items_and_metadata() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/checkout/sessions"))
            .and(header("Authorization", "Bearer sk_test_123"))
            .and(header("Stripe-Version", "2024-12-18.acacia"))
            .and(body_string_contains("line_items%5B0%5D%5Bprice%5D=price_a"))
            .and(body_string_contains("line_items%5B1%5D%5Bprice%5D=price_b"))
            .and(body_string_contains("payment_method_configuration=pmc_test"))
            .and(body_string_contains(
                "payment_intent_data%5Bmetadata%5D%5Bprice_ids%5D=price_a%2Cprice_b",
            ))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "cs_test_1",
                "url": "https://checkout.stripe.com/c/pay/cs_test_1",
                "expires_at": 1_700_000_000_i64,
                "payment_status": "unpaid"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let session = client(&server.uri())
            .create_checkout_session(
                &["price_a".to_string(), "price_b".to_string()],
                1,
                "https://example.com/success",
                "https://example.com/cancel",
            )
            .await
            .unwrap();

        assert_eq!(session.session_id, "cs_test_1");
        assert_eq!(session.payment_status, "unpaid");
        assert_eq!(session.expires_at, Some(1_700_000_000));
    }

    #[tokio::test]
    async fn test_stripe_error_body_becomes_provider_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/checkout/sessions"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "error": { "message": "No such price: price_nope" }
            })))
            .mount(&server)
            .await;

        let err = client(&server.uri())
            .create_checkout_session(
                &["price_nope".to_string()],
                1,
                "https://example.com/s",
                "https://example.com/c",
            )
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            StoreError::Provider { provider, message }
                if provider == "stripe" && message.contains("price_nope")
        ));
    }

    #[tokio::test]
    async fn test_empty_price_ids_rejected_before_network() {
        // No mock server: the guard must fire before any request
        let err = client("http://127.0.0.1:1")
            .create_checkout_session(&[], 1, "https://e/s", "https://e/c")
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidPriceId { .. }));
    }

    #[tokio::test]
    async fn test_retrieve_session() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v1/checkout/sessions/cs_test_9"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "cs_test_9",
                "payment_status": "paid"
            })))
            .mount(&server)
            .await;

        let session = client(&server.uri())
            .retrieve_checkout_session("cs_test_9")
            .await
            .unwrap();

        assert_eq!(session.session_id, "cs_test_9");
        assert_eq!(session.payment_status, "paid");
        assert!(session.url.is_none());
    }
}
