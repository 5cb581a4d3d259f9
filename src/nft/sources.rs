use std::collections::{HashMap, HashSet};

use rust_decimal::Decimal;

use crate::error::Result;
use crate::models::{Address, HoldingRecord};

/// Remote source of current NFT holdings.
#[async_trait::async_trait]
pub trait NftProvider: Send + Sync {
    /// Full current holdings of `address`, in provider order.
    async fn list_holdings(&self, address: &Address) -> Result<Vec<HoldingRecord>>;

    fn name(&self) -> &str;
}

/// Current USD price of a fungible asset.
#[async_trait::async_trait]
pub trait PriceOracle: Send + Sync {
    /// Returns zero when the price is unknown.
    async fn usd_price(&self, asset: &str) -> Result<Decimal>;

    fn name(&self) -> &str;
}

/// User-maintained set of NFT identifiers hidden from results.
#[async_trait::async_trait]
pub trait IgnoredAssets: Send + Sync {
    async fn ignored_identifiers(&self) -> Result<HashSet<String>>;
}

/// USD worth of NFTs that represent liquidity positions.
#[async_trait::async_trait]
pub trait LiquidityPositionSource: Send + Sync {
    async fn valuations_for(&self, address: &Address) -> Result<HashMap<String, Decimal>>;
}

/// Addresses the user tracks. Balance queries only consider these.
#[async_trait::async_trait]
pub trait TrackedAccounts: Send + Sync {
    async fn tracked_addresses(&self) -> Result<Vec<Address>>;
}

#[derive(Debug, Clone, Default)]
pub struct StaticIgnoredAssets {
    identifiers: HashSet<String>,
}

impl StaticIgnoredAssets {
    pub fn new<I, S>(identifiers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            identifiers: identifiers.into_iter().map(Into::into).collect(),
        }
    }
}

#[async_trait::async_trait]
impl IgnoredAssets for StaticIgnoredAssets {
    async fn ignored_identifiers(&self) -> Result<HashSet<String>> {
        Ok(self.identifiers.clone())
    }
}

/// Pre-computed liquidity-position values keyed by owner, then NFT identifier.
#[derive(Debug, Clone, Default)]
pub struct LiquidityPositionValues {
    by_address: HashMap<Address, HashMap<String, Decimal>>,
}

impl LiquidityPositionValues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_position(
        mut self,
        owner: Address,
        identifier: impl Into<String>,
        usd_value: Decimal,
    ) -> Self {
        self.by_address
            .entry(owner)
            .or_default()
            .insert(identifier.into(), usd_value);
        self
    }
}

#[async_trait::async_trait]
impl LiquidityPositionSource for LiquidityPositionValues {
    async fn valuations_for(&self, address: &Address) -> Result<HashMap<String, Decimal>> {
        Ok(self.by_address.get(address).cloned().unwrap_or_default())
    }
}

#[async_trait::async_trait]
impl TrackedAccounts for Vec<Address> {
    async fn tracked_addresses(&self) -> Result<Vec<Address>> {
        Ok(self.clone())
    }
}

/// Oracle that only knows the reference currency.
pub struct UsdOnlyOracle;

#[async_trait::async_trait]
impl PriceOracle for UsdOnlyOracle {
    async fn usd_price(&self, asset: &str) -> Result<Decimal> {
        if asset.eq_ignore_ascii_case(crate::models::USD) {
            Ok(Decimal::ONE)
        } else {
            Ok(Decimal::ZERO)
        }
    }

    fn name(&self) -> &str {
        "usd-only"
    }
}
