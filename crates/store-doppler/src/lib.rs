//! # store-doppler
//!
//! Doppler secret-store integration for the storefront.
//!
//! This crate provides:
//! - `DopplerClient` - bulk secret retrieval over the Doppler API
//! - `SecretFetcher` - trait seam so the cache is testable without a network
//! - `SecretCache` - TTL-bounded cache with single-flight refresh and a
//!   stale-value fallback through provider outages
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use store_doppler::{names, DopplerClient, SecretCache};
//!
//! let client = DopplerClient::from_env()?;
//! let cache = Arc::new(SecretCache::with_default_ttl(Arc::new(client)));
//!
//! let hmac_key = cache.get(names::HMAC_SECRET_KEY).await?;
//! ```

pub mod cache;
pub mod client;

// Re-exports
pub use cache::{SecretCache, DEFAULT_SECRET_TTL};
pub use client::{names, DopplerClient, DopplerConfig, SecretFetcher};
