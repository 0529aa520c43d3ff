//! # Price Catalog
//!
//! Allow-listed price ids and their deliverables, loaded from
//! `config/catalog.toml`. The catalog is the predicate the request layer
//! consults before a token is issued: a token is only ever minted for ids
//! that appear here and are active.

use crate::error::{StoreError, StoreResult};
use serde::{Deserialize, Serialize};

/// One purchasable item
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogItem {
    /// Stripe price id (e.g. "price_1Nxy...")
    pub price_id: String,

    /// Display name, used in the delivery email
    pub name: String,

    /// Path to the deliverable file, relative to the working directory
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,

    /// MIME type of the deliverable
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,

    /// Whether this item can currently be purchased
    #[serde(default = "default_true")]
    pub active: bool,
}

fn default_true() -> bool {
    true
}

/// The allow-list of purchasable items
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PriceCatalog {
    #[serde(default)]
    pub products: Vec<CatalogItem>,
}

impl PriceCatalog {
    /// Create an empty catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a catalog from TOML content
    pub fn from_toml(content: &str) -> StoreResult<Self> {
        toml::from_str(content)
            .map_err(|e| StoreError::Configuration(format!("Invalid catalog file: {}", e)))
    }

    /// Look up an item by price id
    pub fn get(&self, price_id: &str) -> Option<&CatalogItem> {
        self.products.iter().find(|p| p.price_id == price_id)
    }

    /// Whether a price id is allow-listed and active
    pub fn allows(&self, price_id: &str) -> bool {
        self.get(price_id).map(|p| p.active).unwrap_or(false)
    }

    /// Validate a requested set of price ids against the allow-list.
    ///
    /// The set must be non-empty and every id must be a known, active item.
    /// Fails with `InvalidPriceId` naming the first offending id.
    pub fn validate_price_ids(&self, price_ids: &[String]) -> StoreResult<()> {
        if price_ids.is_empty() {
            return Err(StoreError::InvalidPriceId {
                price_id: "<empty>".to_string(),
            });
        }
        for id in price_ids {
            if !self.allows(id) {
                return Err(StoreError::InvalidPriceId {
                    price_id: id.clone(),
                });
            }
        }
        Ok(())
    }

    /// Iterate active items
    pub fn active_items(&self) -> impl Iterator<Item = &CatalogItem> {
        self.products.iter().filter(|p| p.active)
    }
}
