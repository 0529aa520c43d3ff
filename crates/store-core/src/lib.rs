//! # store-core
//!
//! Core types and errors for the storefront checkout pipeline.
//!
//! This crate provides:
//! - `StoreError` for typed error handling across the workspace
//! - `CheckoutTokenPayload` and `IssuedToken` for the signed-token flow
//! - `WebhookEvent` and `DispatchOutcome` for webhook processing
//! - `PriceCatalog` for the purchasable-item allow-list
//!
//! ## Example
//!
//! ```rust,ignore
//! use store_core::{CheckoutTokenPayload, PriceCatalog};
//!
//! let catalog = PriceCatalog::from_toml(toml_content)?;
//! catalog.validate_price_ids(&requested_ids)?;
//!
//! let payload = CheckoutTokenPayload::new(requested_ids, now, 300);
//! ```

pub mod catalog;
pub mod error;
pub mod event;
pub mod token;

// Re-exports for convenience
pub use catalog::{CatalogItem, PriceCatalog};
pub use error::{StoreError, StoreResult};
pub use event::{DispatchOutcome, WebhookEvent, WebhookEventType};
pub use token::{CheckoutTokenPayload, IssuedToken, DEFAULT_TOKEN_LIFETIME_SECS};
