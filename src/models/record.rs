use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::Address;

/// Durable cache row for one NFT.
///
/// When `manual_price` is set, `last_price` and `last_price_asset` belong to
/// the user and refreshes leave them alone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedPriceRecord {
    pub identifier: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub owner_address: Address,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_price: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_price_asset: Option<String>,
    #[serde(default)]
    pub manual_price: bool,
    #[serde(default)]
    pub is_lp: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collection_name: Option<String>,
}

impl PersistedPriceRecord {
    /// A row with identity and owner only, as created by insert-if-absent.
    pub fn bare(identifier: impl Into<String>, owner_address: Address) -> Self {
        Self {
            identifier: identifier.into(),
            name: None,
            owner_address,
            last_price: None,
            last_price_asset: None,
            manual_price: false,
            is_lp: false,
            image_url: None,
            collection_name: None,
        }
    }

    pub fn has_price(&self) -> bool {
        self.last_price.is_some()
    }
}

/// Which rows to consider with respect to their liquidity-position flag.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LpHandling {
    #[default]
    AllNfts,
    OnlyLps,
    ExcludeLps,
}

impl LpHandling {
    pub fn admits(self, is_lp: bool) -> bool {
        match self {
            LpHandling::AllNfts => true,
            LpHandling::OnlyLps => is_lp,
            LpHandling::ExcludeLps => !is_lp,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn owner() -> Address {
        Address::parse("0x00000000000000000000000000000000000000aa").unwrap()
    }

    #[test]
    fn test_bare_row_has_no_price() {
        let row = PersistedPriceRecord::bare("nft-1", owner());
        assert!(!row.has_price());
        assert!(!row.manual_price);
    }

    #[test]
    fn test_serialization_skips_missing_fields() {
        let row = PersistedPriceRecord::bare("nft-1", owner());
        let json = serde_json::to_value(&row).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "identifier": "nft-1",
                "owner_address": "0x00000000000000000000000000000000000000aa",
                "manual_price": false,
                "is_lp": false
            })
        );
    }

    #[test]
    fn test_lp_handling() {
        assert!(LpHandling::AllNfts.admits(true));
        assert!(LpHandling::AllNfts.admits(false));
        assert!(LpHandling::OnlyLps.admits(true));
        assert!(!LpHandling::OnlyLps.admits(false));
        assert!(!LpHandling::ExcludeLps.admits(true));
        assert!(LpHandling::ExcludeLps.admits(false));
    }
}
