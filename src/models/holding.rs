use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::Address;

/// One NFT owned by an address, as reported by the provider at fetch time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HoldingRecord {
    pub identifier: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub owner: Address,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collection_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default)]
    pub is_lp: bool,
    /// Last known price in the chain's native currency. Zero when unknown.
    #[serde(default)]
    pub price_native: Decimal,
    /// USD equivalent of `price_native`. Zero when unknown.
    #[serde(default)]
    pub price_usd: Decimal,
}

impl HoldingRecord {
    pub fn new(identifier: impl Into<String>, owner: Address) -> Self {
        Self {
            identifier: identifier.into(),
            name: None,
            owner,
            collection_name: None,
            image_url: None,
            is_lp: false,
            price_native: Decimal::ZERO,
            price_usd: Decimal::ZERO,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_collection(mut self, collection_name: impl Into<String>) -> Self {
        self.collection_name = Some(collection_name.into());
        self
    }

    pub fn with_image_url(mut self, image_url: impl Into<String>) -> Self {
        self.image_url = Some(image_url.into());
        self
    }

    pub fn with_prices(mut self, price_native: Decimal, price_usd: Decimal) -> Self {
        self.price_native = price_native;
        self.price_usd = price_usd;
        self
    }

    pub fn as_lp(mut self) -> Self {
        self.is_lp = true;
        self
    }
}
