//! # Stripe Webhook Verification
//!
//! Authenticates that an inbound callback genuinely originated from the
//! payment provider before any business logic inspects the payload. The
//! signature covers the raw bytes, so parsing happens strictly after
//! verification.

use chrono::Utc;
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use std::sync::Arc;
use store_core::{StoreError, StoreResult, WebhookEvent, WebhookEventType};
use store_doppler::{names, SecretCache};
use subtle::ConstantTimeEq;
use tracing::{debug, instrument, warn};

type HmacSha256 = Hmac<Sha256>;

/// Maximum allowed clock skew between the signature timestamp and now
pub const DEFAULT_TIMESTAMP_TOLERANCE_SECS: i64 = 300;

/// Verifies `Stripe-Signature` headers against the cached webhook secret
pub struct WebhookVerifier {
    secrets: Arc<SecretCache>,
    tolerance_secs: i64,
}

impl WebhookVerifier {
    pub fn new(secrets: Arc<SecretCache>) -> Self {
        Self {
            secrets,
            tolerance_secs: DEFAULT_TIMESTAMP_TOLERANCE_SECS,
        }
    }

    /// Builder: override the timestamp tolerance (test hook)
    pub fn with_tolerance_secs(mut self, tolerance_secs: i64) -> Self {
        self.tolerance_secs = tolerance_secs;
        self
    }

    /// Verify a webhook delivery and parse the event
    pub async fn verify(&self, raw_body: &[u8], signature_header: &str) -> StoreResult<WebhookEvent> {
        self.verify_at(raw_body, signature_header, Utc::now().timestamp())
            .await
    }

    /// Verify at an explicit point in time (test hook).
    ///
    /// A secret-store failure propagates as a secret-class error: a
    /// timed-out secret fetch is not an authentication failure and must
    /// never be reported as one.
    #[instrument(skip(self, raw_body, signature_header))]
    pub async fn verify_at(
        &self,
        raw_body: &[u8],
        signature_header: &str,
        now: i64,
    ) -> StoreResult<WebhookEvent> {
        let header = parse_signature_header(signature_header)?;

        if (now - header.timestamp).abs() > self.tolerance_secs {
            warn!(
                timestamp = header.timestamp,
                "Webhook timestamp outside tolerance"
            );
            return Err(StoreError::InvalidSignature);
        }

        let secret = self.secrets.get(names::STRIPE_WEBHOOK_SECRET).await?;
        let expected = compute_signature(secret.as_bytes(), header.timestamp, raw_body);

        // Accept any v1 candidate; each comparison is constant-time.
        let valid = header.signatures.iter().any(|candidate| {
            hex::decode(candidate)
                .map(|decoded| bool::from(expected.as_slice().ct_eq(decoded.as_slice())))
                .unwrap_or(false)
        });

        if !valid {
            warn!("Webhook signature mismatch");
            return Err(StoreError::InvalidSignature);
        }

        // Signature covers raw bytes, not the parsed shape: a body that
        // fails to parse after a valid signature is its own error class.
        let raw: RawEvent = serde_json::from_slice(raw_body)
            .map_err(|e| StoreError::MalformedPayload(e.to_string()))?;

        debug!(event_type = %raw.event_type, event_id = %raw.id, "Verified webhook");

        Ok(WebhookEvent {
            event_id: raw.id,
            event_type: WebhookEventType::from_provider(&raw.event_type),
            livemode: raw.livemode,
            created: raw.created,
            data: raw.data.object,
        })
    }
}

/// HMAC-SHA256 over `"{timestamp}.{raw_body}"`, updated over the raw bytes
/// so non-UTF8 payloads sign what was actually sent
fn compute_signature(secret: &[u8], timestamp: i64, raw_body: &[u8]) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(secret).expect("HMAC can take key of any size");
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(raw_body);
    mac.finalize().into_bytes().to_vec()
}

struct SignatureHeader {
    timestamp: i64,
    signatures: Vec<String>,
}

/// Parse a `t=<ts>,v1=<hex>[,v1=<hex>]` signature header. Unknown schemes
/// (v0, future versions) are skipped.
fn parse_signature_header(header: &str) -> StoreResult<SignatureHeader> {
    let mut timestamp = None;
    let mut signatures = Vec::new();

    for part in header.split(',') {
        let Some((key, value)) = part.trim().split_once('=') else {
            continue;
        };
        match key {
            "t" => timestamp = value.parse().ok(),
            "v1" => signatures.push(value.to_string()),
            _ => {}
        }
    }

    let timestamp = timestamp.ok_or(StoreError::InvalidSignature)?;
    if signatures.is_empty() {
        return Err(StoreError::InvalidSignature);
    }

    Ok(SignatureHeader {
        timestamp,
        signatures,
    })
}

#[derive(Debug, Deserialize)]
struct RawEvent {
    id: String,
    #[serde(rename = "type")]
    event_type: String,
    created: i64,
    #[serde(default)]
    livemode: bool,
    data: RawEventData,
}

#[derive(Debug, Deserialize)]
struct RawEventData {
    object: serde_json::Map<String, serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::static_cache;

    const SECRET: &str = "whsec_test_secret";

    fn verifier() -> WebhookVerifier {
        WebhookVerifier::new(static_cache(&[(names::STRIPE_WEBHOOK_SECRET, SECRET)]))
    }

    fn sign_body(secret: &str, timestamp: i64, body: &[u8]) -> String {
        let sig = compute_signature(secret.as_bytes(), timestamp, body);
        format!("t={},v1={}", timestamp, hex::encode(sig))
    }

    fn event_body() -> Vec<u8> {
        serde_json::to_vec(&serde_json::json!({
            "id": "evt_123",
            "type": "payment_intent.succeeded",
            "created": 1_700_000_000,
            "livemode": false,
            "data": {
                "object": {
                    "id": "pi_123",
                    "receipt_email": "buyer@example.com",
                    "metadata": { "price_ids": "price_a" }
                }
            }
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn test_correctly_signed_event_is_accepted() {
        let verifier = verifier();
        let body = event_body();
        let now = 1_700_000_000;

        let event = verifier
            .verify_at(&body, &sign_body(SECRET, now, &body), now)
            .await
            .unwrap();

        assert_eq!(event.event_id, "evt_123");
        assert_eq!(event.event_type, WebhookEventType::PaymentSucceeded);
        assert!(!event.livemode);
        assert_eq!(event.customer_email(), Some("buyer@example.com"));
    }

    #[tokio::test]
    async fn test_wrong_secret_is_rejected() {
        let verifier = verifier();
        let body = event_body();
        let now = 1_700_000_000;

        let err = verifier
            .verify_at(&body, &sign_body("whsec_wrong", now, &body), now)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidSignature));
    }

    #[tokio::test]
    async fn test_stale_timestamp_is_rejected() {
        let verifier = verifier();
        let body = event_body();
        let signed_at = 1_700_000_000;

        // Signature itself is valid; only the timestamp is too old
        let err = verifier
            .verify_at(&body, &sign_body(SECRET, signed_at, &body), signed_at + 301)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidSignature));

        // Within tolerance it passes
        assert!(verifier
            .verify_at(&body, &sign_body(SECRET, signed_at, &body), signed_at + 299)
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_tampered_body_is_rejected() {
        let verifier = verifier();
        let body = event_body();
        let now = 1_700_000_000;
        let header = sign_body(SECRET, now, &body);

        let mut tampered = body.clone();
        let pos = tampered.len() / 2;
        tampered[pos] ^= 0x01;

        let err = verifier.verify_at(&tampered, &header, now).await.unwrap_err();
        assert!(matches!(err, StoreError::InvalidSignature));
    }

    #[tokio::test]
    async fn test_valid_signature_over_garbage_is_malformed_payload() {
        let verifier = verifier();
        let body = b"this is not json";
        let now = 1_700_000_000;

        let err = verifier
            .verify_at(body, &sign_body(SECRET, now, body), now)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::MalformedPayload(_)));
    }

    #[tokio::test]
    async fn test_unparseable_header_is_rejected() {
        let verifier = verifier();
        let body = event_body();

        for header in ["", "v1=abc", "t=notanumber,v1=abc", "t=1700000000"] {
            let err = verifier
                .verify_at(&body, header, 1_700_000_000)
                .await
                .unwrap_err();
            assert!(matches!(err, StoreError::InvalidSignature), "header: {header}");
        }
    }

    #[tokio::test]
    async fn test_second_v1_candidate_is_accepted() {
        // Stripe sends multiple v1 entries during secret rotation
        let verifier = verifier();
        let body = event_body();
        let now = 1_700_000_000;

        let good = hex::encode(compute_signature(SECRET.as_bytes(), now, &body));
        let header = format!("t={},v1={},v1={}", now, "00".repeat(32), good);

        assert!(verifier.verify_at(&body, &header, now).await.is_ok());
    }

    #[test]
    fn test_parse_signature_header_shapes() {
        let parsed = parse_signature_header("t=1234567890,v1=abc123,v1=def456").unwrap();
        assert_eq!(parsed.timestamp, 1234567890);
        assert_eq!(parsed.signatures, vec!["abc123", "def456"]);

        // v0 entries are skipped, not errors
        let parsed = parse_signature_header("t=1,v0=legacy,v1=abc").unwrap();
        assert_eq!(parsed.signatures, vec!["abc"]);
    }
}
