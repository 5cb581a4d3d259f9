//! USD valuation of NFT holdings.
//!
//! A holding is valued from the first source that applies, in order:
//! liquidity-position value, manual price, provider price, zero.

use std::collections::HashMap;
use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::{debug, error};

use super::PriceOracle;
use crate::error::NftError;
use crate::models::{
    HoldingRecord, PersistedPriceRecord, PricedAsset, ValuationResult, ValuationSource, USD,
};

/// Default native currency of the chain the provider reports prices in.
pub const DEFAULT_NATIVE_CURRENCY: &str = "ETH";

pub struct Valuator {
    oracle: Arc<dyn PriceOracle>,
    native_currency: String,
}

impl Valuator {
    pub fn new(oracle: Arc<dyn PriceOracle>) -> Self {
        Self {
            oracle,
            native_currency: DEFAULT_NATIVE_CURRENCY.to_string(),
        }
    }

    pub fn with_native_currency(mut self, currency: impl Into<String>) -> Self {
        self.native_currency = currency.into().trim().to_uppercase();
        self
    }

    pub fn native_currency(&self) -> &str {
        &self.native_currency
    }

    /// Values one holding. `manual` is only honoured when it is actually a
    /// manual price.
    pub fn resolve(
        &self,
        item: &HoldingRecord,
        manual: Option<&PricedAsset>,
        lp_value: Option<Decimal>,
    ) -> ValuationResult {
        let (price_in_asset, price_asset, usd_price, source) =
            match (lp_value, manual.filter(|m| m.manually_input)) {
                (Some(value), _) => (
                    value,
                    USD.to_string(),
                    value,
                    ValuationSource::LiquidityPosition,
                ),
                (None, Some(manual)) => (
                    manual.price_in_asset,
                    manual.price_asset.clone(),
                    manual.usd_price,
                    ValuationSource::Manual,
                ),
                (None, None) if !item.price_usd.is_zero() => (
                    item.price_native,
                    self.native_currency.clone(),
                    item.price_usd,
                    ValuationSource::Provider,
                ),
                (None, None) => (
                    Decimal::ZERO,
                    USD.to_string(),
                    Decimal::ZERO,
                    ValuationSource::Zero,
                ),
            };

        ValuationResult {
            id: item.identifier.clone(),
            name: item.name.clone(),
            collection_name: item.collection_name.clone(),
            image_url: item.image_url.clone(),
            price_in_asset,
            price_asset,
            usd_price,
            manually_input: source == ValuationSource::Manual,
            is_lp: source == ValuationSource::LiquidityPosition,
            source,
        }
    }

    /// USD value of each stored row's price. Rows without a price are worth
    /// zero. Rows whose price asset can't be priced right now are logged and
    /// left out; they never fail the batch. The oracle is asked at most once
    /// per distinct asset.
    pub async fn value_stored(
        &self,
        records: Vec<PersistedPriceRecord>,
    ) -> Vec<(PersistedPriceRecord, Decimal)> {
        let mut rates: HashMap<String, Option<Decimal>> = HashMap::new();
        let mut valued = Vec::with_capacity(records.len());

        for record in records {
            let amount = record.last_price.unwrap_or(Decimal::ZERO);
            let asset = record.last_price_asset.as_deref().unwrap_or(USD);
            if is_reference(asset) {
                valued.push((record, amount));
                continue;
            }

            let key = asset.trim().to_uppercase();
            let rate = match rates.get(&key) {
                Some(rate) => *rate,
                None => {
                    let rate = self.current_rate(&key).await;
                    rates.insert(key.clone(), rate);
                    rate
                }
            };

            match rate {
                Some(rate) => {
                    let usd_price = amount * rate;
                    debug!(nft = %record.identifier, usd_price = %usd_price, "valued stored NFT");
                    valued.push((record, usd_price));
                }
                None => error!(
                    asset = %key,
                    nft = %record.identifier,
                    "NFT price asset has no current usd price. Ignoring."
                ),
            }
        }

        valued
    }

    /// Stored prices converted to USD. Rows without a price are left out, as
    /// are rows [`Valuator::value_stored`] cannot value.
    pub async fn price_stored(&self, records: Vec<PersistedPriceRecord>) -> Vec<PricedAsset> {
        let priced_rows = records.into_iter().filter(|r| r.has_price()).collect();

        self.value_stored(priced_rows)
            .await
            .into_iter()
            .map(|(record, usd_price)| PricedAsset {
                asset: record.identifier,
                manually_input: record.manual_price,
                price_asset: record.last_price_asset.unwrap_or_else(|| USD.to_string()),
                price_in_asset: record.last_price.unwrap_or(Decimal::ZERO),
                usd_price,
            })
            .collect()
    }

    async fn current_rate(&self, asset: &str) -> Option<Decimal> {
        match self.oracle.usd_price(asset).await {
            Ok(rate) if rate.is_zero() => {
                error!(asset, "Could not find current usd price for NFT price asset");
                None
            }
            Ok(rate) => Some(rate),
            Err(NftError::UnknownAsset(asset)) => {
                error!(asset = %asset, "Unknown asset in NFT price table");
                None
            }
            Err(err) => {
                error!(
                    asset,
                    error = %err,
                    "Error querying current usd price of NFT price asset"
                );
                None
            }
        }
    }
}

fn is_reference(asset: &str) -> bool {
    asset.trim().eq_ignore_ascii_case(USD)
}
