//! # store-stripe
//!
//! Checkout authorization and payment-webhook pipeline for the storefront.
//!
//! This crate provides the four stages of the payment flow:
//!
//! 1. **CheckoutTokenCodec** - signed, expiring tokens binding a checkout
//!    attempt to an allow-listed set of price ids
//! 2. **StripeClient** - Checkout Sessions created from a verified token
//! 3. **WebhookVerifier** - signature authentication of inbound events
//! 4. **dispatch_event** - routing verified events to fulfillment
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use store_stripe::{CheckoutTokenCodec, StripeClient, WebhookVerifier};
//!
//! let codec = CheckoutTokenCodec::new(secrets.clone());
//! let issued = codec.issue(&price_ids, 300).await?;
//!
//! // Later, when the client opens checkout:
//! let payload = codec.verify(&issued.token).await?;
//! let session = stripe.create_checkout_session(
//!     &payload.price_ids, 1, success_url, cancel_url,
//! ).await?;
//! ```
//!
//! ## Webhook Handling
//!
//! ```rust,ignore
//! use store_stripe::{dispatch_event, WebhookHandler, WebhookVerifier};
//!
//! let event = verifier.verify(&body, &signature_header).await?;
//! // Acknowledge the provider first, then:
//! let outcome = dispatch_event(&handler, &event).await;
//! ```

pub mod checkout;
pub mod config;
pub mod dispatch;
pub mod token;
pub mod webhook;

// Re-exports
pub use checkout::{CheckoutSession, StripeClient};
pub use config::StripeConfig;
pub use dispatch::{dispatch_event, LoggingWebhookHandler, WebhookHandler};
pub use token::CheckoutTokenCodec;
pub use webhook::{WebhookVerifier, DEFAULT_TIMESTAMP_TOLERANCE_SECS};
