//! # Checkout Token Payload
//!
//! The signed payload that authorizes a checkout session for a fixed set of
//! price ids, for a bounded time. The payload is immutable once created;
//! the codec in `store-stripe` signs and verifies it.

use serde::{Deserialize, Serialize};

/// Default token lifetime in seconds (5 minutes)
pub const DEFAULT_TOKEN_LIFETIME_SECS: i64 = 300;

/// Payload bound into a signed checkout token.
///
/// `price_ids` must already be validated against the catalog allow-list by
/// the caller; the payload itself treats them as opaque identifiers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutTokenPayload {
    /// Stripe price ids this token authorizes, in request order
    pub price_ids: Vec<String>,

    /// Unix timestamp at issuance
    pub created_at: i64,

    /// Unix timestamp after which the token must be rejected
    pub expires_at: i64,
}

impl CheckoutTokenPayload {
    /// Create a payload expiring `lifetime_secs` after `now`
    pub fn new(price_ids: Vec<String>, now: i64, lifetime_secs: i64) -> Self {
        Self {
            price_ids,
            created_at: now,
            expires_at: now + lifetime_secs,
        }
    }

    /// Logical expiry check. The signed blob still exists after expiry;
    /// it just must never verify.
    pub fn is_expired(&self, now: i64) -> bool {
        now > self.expires_at
    }
}

/// An issued token as returned to the client: opaque blob plus expiry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssuedToken {
    /// Opaque base64 token string
    pub token: String,

    /// Unix timestamp when the token expires
    pub expires_at: i64,
}
