//! # Webhook Event Model
//!
//! Events received from the payment provider. An event exists only for the
//! duration of one verify-and-dispatch cycle and is never persisted.

use serde::{Deserialize, Serialize};

/// Webhook event kinds this system recognizes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WebhookEventType {
    /// Checkout session completed
    CheckoutCompleted,
    /// Checkout session expired without payment
    CheckoutExpired,
    /// Payment succeeded (triggers fulfillment)
    PaymentSucceeded,
    /// Payment failed
    PaymentFailed,
    /// Unknown event (passthrough)
    Unknown(String),
}

impl WebhookEventType {
    /// Map a provider event-type string to our enum
    pub fn from_provider(raw: &str) -> Self {
        match raw {
            "checkout.session.completed" => WebhookEventType::CheckoutCompleted,
            "checkout.session.expired" => WebhookEventType::CheckoutExpired,
            "payment_intent.succeeded" => WebhookEventType::PaymentSucceeded,
            "payment_intent.payment_failed" => WebhookEventType::PaymentFailed,
            other => WebhookEventType::Unknown(other.to_string()),
        }
    }

    /// Provider-side string form (for logging and responses)
    pub fn as_provider_str(&self) -> &str {
        match self {
            WebhookEventType::CheckoutCompleted => "checkout.session.completed",
            WebhookEventType::CheckoutExpired => "checkout.session.expired",
            WebhookEventType::PaymentSucceeded => "payment_intent.succeeded",
            WebhookEventType::PaymentFailed => "payment_intent.payment_failed",
            WebhookEventType::Unknown(raw) => raw.as_str(),
        }
    }
}

/// A verified webhook event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookEvent {
    /// Event id from the provider
    pub event_id: String,

    /// Event type
    pub event_type: WebhookEventType,

    /// Whether the event originated in live mode
    pub livemode: bool,

    /// Event creation timestamp (unix)
    pub created: i64,

    /// The event's `data.object` payload, kept opaque
    pub data: serde_json::Map<String, serde_json::Value>,
}

impl WebhookEvent {
    /// Object id (session id or payment intent id, depending on type)
    pub fn object_id(&self) -> Option<&str> {
        self.data.get("id").and_then(|v| v.as_str())
    }

    /// Customer email, wherever the provider put it for this object shape
    pub fn customer_email(&self) -> Option<&str> {
        self.data
            .get("customer_details")
            .and_then(|cd| cd.get("email"))
            .and_then(|v| v.as_str())
            .or_else(|| self.data.get("receipt_email").and_then(|v| v.as_str()))
            .or_else(|| self.data.get("customer_email").and_then(|v| v.as_str()))
    }

    /// A metadata value from the event object
    pub fn metadata(&self, key: &str) -> Option<&str> {
        self.data
            .get("metadata")
            .and_then(|m| m.get(key))
            .and_then(|v| v.as_str())
    }

    /// Purchased price ids, as mirrored into metadata at session creation
    pub fn price_ids(&self) -> Vec<String> {
        self.metadata("price_ids")
            .map(|s| {
                s.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Amount paid in the smallest currency unit, when present
    pub fn amount(&self) -> Option<i64> {
        self.data
            .get("amount_total")
            .or_else(|| self.data.get("amount_received"))
            .and_then(|v| v.as_i64())
    }
}

/// Terminal outcome of dispatching one event.
///
/// The transient states (received, handler invoked) are only observable as
/// log events; callers see the terminal outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchOutcome {
    /// Recognized type, handler ran to completion
    Completed,
    /// Recognized type, handler returned an error (logged, not surfaced)
    Failed,
    /// Event type not in the recognized set; handler never invoked
    Ignored,
}
