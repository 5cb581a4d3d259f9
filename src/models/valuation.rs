use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{Address, HoldingRecord};

/// Which price source decided a valuation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValuationSource {
    LiquidityPosition,
    Manual,
    Provider,
    Zero,
}

/// Resolved USD valuation for one holding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValuationResult {
    pub id: String,
    pub name: Option<String>,
    pub collection_name: Option<String>,
    pub image_url: Option<String>,
    pub price_in_asset: Decimal,
    pub price_asset: String,
    pub usd_price: Decimal,
    pub manually_input: bool,
    pub is_lp: bool,
    pub source: ValuationSource,
}

impl ValuationResult {
    pub fn is_zero(&self) -> bool {
        self.source == ValuationSource::Zero
    }
}

/// Caller-visible result of a holdings query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NftResult {
    pub addresses: BTreeMap<Address, Vec<HoldingRecord>>,
    /// Holdings retained by the fetch, before ignored identifiers were removed.
    pub entries_found: usize,
    pub entries_limit: usize,
}

/// A stored price converted to USD at query time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricedAsset {
    pub asset: String,
    pub manually_input: bool,
    pub price_asset: String,
    pub price_in_asset: Decimal,
    pub usd_price: Decimal,
}

/// A stored row rendered for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredNftEntry {
    pub id: String,
    pub name: Option<String>,
    pub price_in_asset: Decimal,
    pub price_asset: String,
    pub manually_input: bool,
    pub is_lp: bool,
    pub image_url: Option<String>,
    pub usd_price: Decimal,
    pub collection_name: Option<String>,
}

/// Filtered view over the stored table, grouped by owner.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StoredBalances {
    pub entries: BTreeMap<Address, Vec<StoredNftEntry>>,
    /// Rows matching the filter, ignoring pagination.
    pub entries_found: usize,
    /// Rows in the table.
    pub entries_total: usize,
    pub total_usd_value: Decimal,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valuation_serializes_amounts_as_strings() {
        let result = ValuationResult {
            id: "nft-1".to_string(),
            name: Some("Punk".to_string()),
            collection_name: None,
            image_url: None,
            price_in_asset: Decimal::new(15, 1),
            price_asset: "ETH".to_string(),
            usd_price: Decimal::new(300025, 2),
            manually_input: false,
            is_lp: false,
            source: ValuationSource::Provider,
        };

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["price_in_asset"], "1.5");
        assert_eq!(json["usd_price"], "3000.25");
        assert_eq!(json["price_asset"], "ETH");
        assert_eq!(json["source"], "provider");
        assert!(!result.is_zero());
    }
}
