//! # Checkout Token Codec
//!
//! Issues and verifies the signed, expiring tokens that authorize a
//! checkout session for a fixed set of price ids. Stateless by design:
//! there is no server-side token store, so the service scales horizontally
//! and a restart invalidates nothing.
//!
//! Wire format: `base64(JSON{data, signature})` where `signature` is
//! `base64(HMAC-SHA256(key, canonical_json(data)))`.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use chrono::Utc;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::sync::Arc;
use store_core::{CheckoutTokenPayload, IssuedToken, StoreError, StoreResult};
use store_doppler::{names, SecretCache};
use subtle::ConstantTimeEq;
use tracing::{debug, instrument, warn};

type HmacSha256 = Hmac<Sha256>;

/// Signed token envelope as it appears inside the base64 blob
#[derive(Debug, Serialize, Deserialize)]
struct SignedEnvelope {
    data: CheckoutTokenPayload,
    signature: String,
}

/// Issues and verifies checkout tokens.
///
/// The HMAC key is fetched from the secret cache on every operation; within
/// one TTL window the key is stable, so tokens issued before a cache
/// refresh still verify after it.
pub struct CheckoutTokenCodec {
    secrets: Arc<SecretCache>,
}

impl CheckoutTokenCodec {
    pub fn new(secrets: Arc<SecretCache>) -> Self {
        Self { secrets }
    }

    /// Issue a token for a pre-validated set of price ids.
    ///
    /// Precondition: `price_ids` has already been checked against the
    /// catalog allow-list by the request layer. The codec signs whatever it
    /// is handed.
    #[instrument(skip(self), fields(ids = price_ids.len()))]
    pub async fn issue(
        &self,
        price_ids: &[String],
        lifetime_secs: i64,
    ) -> StoreResult<IssuedToken> {
        self.issue_at(price_ids, lifetime_secs, Utc::now().timestamp())
            .await
    }

    /// Issue with an explicit issuance time (test hook)
    pub async fn issue_at(
        &self,
        price_ids: &[String],
        lifetime_secs: i64,
        now: i64,
    ) -> StoreResult<IssuedToken> {
        let key = self.secrets.get(names::HMAC_SECRET_KEY).await?;
        let payload = CheckoutTokenPayload::new(price_ids.to_vec(), now, lifetime_secs);

        let signature = sign(key.as_bytes(), &canonical_json(&payload)?);
        let envelope = SignedEnvelope {
            data: payload,
            signature: BASE64.encode(signature),
        };

        let json = serde_json::to_vec(&envelope)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        let expires_at = envelope.data.expires_at;

        debug!(expires_at, "Issued checkout token");

        Ok(IssuedToken {
            token: BASE64.encode(json),
            expires_at,
        })
    }

    /// Verify a token against the current key and clock
    pub async fn verify(&self, token: &str) -> StoreResult<CheckoutTokenPayload> {
        self.verify_at(token, Utc::now().timestamp()).await
    }

    /// Verify a token at an explicit point in time.
    ///
    /// Order matters: decode, then signature, then expiry. A secret-store
    /// failure propagates as its own error class, never as a signature
    /// mismatch.
    #[instrument(skip(self, token))]
    pub async fn verify_at(&self, token: &str, now: i64) -> StoreResult<CheckoutTokenPayload> {
        let key = self.secrets.get(names::HMAC_SECRET_KEY).await?;

        let json = BASE64
            .decode(token)
            .map_err(|e| StoreError::MalformedToken(format!("invalid base64: {}", e)))?;
        let envelope: SignedEnvelope = serde_json::from_slice(&json)
            .map_err(|e| StoreError::MalformedToken(format!("invalid envelope: {}", e)))?;

        // A corrupted signature field is a signature failure, not a decode
        // failure: the envelope itself decoded fine.
        let provided = BASE64
            .decode(&envelope.signature)
            .map_err(|_| StoreError::InvalidSignature)?;

        let expected = sign(key.as_bytes(), &canonical_json(&envelope.data)?);

        if !bool::from(expected.as_slice().ct_eq(provided.as_slice())) {
            warn!("Checkout token signature mismatch");
            return Err(StoreError::InvalidSignature);
        }

        if envelope.data.is_expired(now) {
            return Err(StoreError::TokenExpired);
        }

        Ok(envelope.data)
    }
}

/// Canonical payload encoding: JSON with stable (sorted) key order, so the
/// same payload always yields the same signature under the same key.
/// serde_json's default map is ordered by key, which gives us the stable
/// ordering for free as long as we round-trip through `Value`.
fn canonical_json(payload: &CheckoutTokenPayload) -> StoreResult<Vec<u8>> {
    let value =
        serde_json::to_value(payload).map_err(|e| StoreError::Serialization(e.to_string()))?;
    serde_json::to_vec(&value).map_err(|e| StoreError::Serialization(e.to_string()))
}

fn sign(key: &[u8], message: &[u8]) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC can take key of any size");
    mac.update(message);
    mac.finalize().into_bytes().to_vec()
}
