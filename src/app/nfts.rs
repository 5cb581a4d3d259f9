use std::collections::BTreeMap;
use std::str::FromStr;

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::models::{Address, LpHandling, NftResult, PricedAsset, StoredBalances, ValuationResult};
use crate::nft::NftService;
use crate::storage::{IgnoredHandling, NftFilterQuery};

#[derive(Debug, Serialize)]
pub struct BalancesOutput {
    pub balances: BTreeMap<Address, Vec<ValuationResult>>,
    pub total_usd_value: Decimal,
}

/// How ignored NFTs show up in `stored`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum IgnoredView {
    #[default]
    Hide,
    Show,
    Only,
}

#[derive(Debug, Clone, Default)]
pub struct StoredQueryArgs {
    pub owners: Vec<Address>,
    pub name: Option<String>,
    pub collection: Option<String>,
    pub lp_handling: LpHandling,
    pub ignored: IgnoredView,
    pub limit: Option<usize>,
    pub offset: usize,
}

pub async fn holdings(
    service: &NftService,
    addresses: &[Address],
    refresh: bool,
) -> Result<NftResult> {
    Ok(service.get_all_holdings(addresses, refresh).await?)
}

pub async fn balances(
    service: &NftService,
    addresses: &[Address],
    include_zero: bool,
    refresh: bool,
) -> Result<BalancesOutput> {
    let balances = service
        .get_balances(addresses, None, include_zero, refresh)
        .await?;
    let total_usd_value = balances
        .values()
        .flatten()
        .map(|valuation| valuation.usd_price)
        .sum();
    Ok(BalancesOutput {
        balances,
        total_usd_value,
    })
}

pub async fn prices(
    service: &NftService,
    identifier: Option<&str>,
    lp_handling: LpHandling,
) -> Result<Vec<PricedAsset>> {
    Ok(service
        .get_cached_priced_assets(identifier, lp_handling)
        .await?)
}

pub async fn set_price(
    service: &NftService,
    identifier: &str,
    price_asset: &str,
    amount: &str,
) -> Result<serde_json::Value> {
    let amount = Decimal::from_str(amount.trim())
        .with_context(|| format!("Invalid price amount: {amount}"))?;
    service.set_manual_price(identifier, price_asset, amount).await?;
    Ok(serde_json::json!({
        "success": true,
        "identifier": identifier,
        "price_asset": price_asset.trim().to_uppercase(),
        "price_in_asset": amount.to_string()
    }))
}

pub async fn clear_price(service: &NftService, identifier: &str) -> Result<serde_json::Value> {
    service.clear_manual_price(identifier).await?;
    Ok(serde_json::json!({
        "success": true,
        "identifier": identifier
    }))
}

pub async fn stored(service: &NftService, args: StoredQueryArgs) -> Result<StoredBalances> {
    let ignored = match args.ignored {
        IgnoredView::Show => IgnoredHandling::None,
        IgnoredView::Hide => IgnoredHandling::Exclude(service.ignored_identifiers().await?),
        IgnoredView::Only => IgnoredHandling::ShowOnly(service.ignored_identifiers().await?),
    };

    let mut filter = NftFilterQuery::new()
        .with_lp_handling(args.lp_handling)
        .with_ignored(ignored);
    if !args.owners.is_empty() {
        filter = filter.with_owners(args.owners);
    }
    if let Some(name) = args.name {
        filter = filter.with_name(name);
    }
    if let Some(collection) = args.collection {
        filter = filter.with_collection_name(collection);
    }
    if let Some(limit) = args.limit {
        filter = filter.with_pagination(limit, args.offset);
    }

    Ok(service.get_stored_balances(&filter).await?)
}
