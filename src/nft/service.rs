use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::{debug, info};

use super::{
    filter_ignored, AddressFetcher, CachedValue, FetchedHoldings, IgnoredAssets,
    LiquidityPositionSource, NftProvider, PriceOracle, QuotaLimiter, ReconciliationPlan,
    SingleFlightCache, StaticIgnoredAssets, Tier, TrackedAccounts, Valuator,
};
use crate::clock::Clock;
use crate::error::{NftError, Result};
use crate::models::{
    Address, LpHandling, NftResult, PersistedPriceRecord, PricedAsset, StoredBalances,
    StoredNftEntry, ValuationResult, USD,
};
use crate::storage::{NftFilterQuery, PricedRecordStore};

/// Entry point for NFT holdings: fetching, valuation, the stored price table
/// and manual prices.
pub struct NftService {
    fetcher: Arc<AddressFetcher>,
    cache: SingleFlightCache<Vec<Address>, FetchedHoldings>,
    valuator: Valuator,
    store: Arc<dyn PricedRecordStore>,
    ignored: Arc<dyn IgnoredAssets>,
    tracked: Option<Arc<dyn TrackedAccounts>>,
}

impl NftService {
    pub fn new(
        provider: Arc<dyn NftProvider>,
        oracle: Arc<dyn PriceOracle>,
        store: Arc<dyn PricedRecordStore>,
        tier: Tier,
    ) -> Self {
        Self {
            fetcher: Arc::new(AddressFetcher::new(provider, QuotaLimiter::new(tier))),
            cache: SingleFlightCache::new(),
            valuator: Valuator::new(oracle),
            store,
            ignored: Arc::new(StaticIgnoredAssets::default()),
            tracked: None,
        }
    }

    pub fn with_ignored_assets(mut self, ignored: Arc<dyn IgnoredAssets>) -> Self {
        self.ignored = ignored;
        self
    }

    pub fn with_tracked_accounts(mut self, tracked: Arc<dyn TrackedAccounts>) -> Self {
        self.tracked = Some(tracked);
        self
    }

    pub fn with_native_currency(mut self, currency: impl Into<String>) -> Self {
        self.valuator = self.valuator.with_native_currency(currency);
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.cache = self.cache.with_clock(clock);
        self
    }

    pub fn entries_limit(&self) -> usize {
        self.fetcher.quota().entries_limit()
    }

    pub async fn ignored_identifiers(&self) -> Result<HashSet<String>> {
        self.ignored.ignored_identifiers().await
    }

    /// Holdings for `addresses` as last fetched, or freshly fetched when
    /// nothing is cached for this exact address list or `ignore_cache` is set.
    async fn fetch(
        &self,
        addresses: &[Address],
        ignore_cache: bool,
    ) -> Result<CachedValue<FetchedHoldings>> {
        let fetcher = Arc::clone(&self.fetcher);
        let owned = addresses.to_vec();
        self.cache
            .get_or_compute(addresses.to_vec(), ignore_cache, move || async move {
                fetcher.fetch(&owned).await
            })
            .await
    }

    /// All NFTs held by `addresses`, minus ignored ones.
    pub async fn get_all_holdings(
        &self,
        addresses: &[Address],
        ignore_cache: bool,
    ) -> Result<NftResult> {
        let fetched = self.fetch(addresses, ignore_cache).await?;
        let ignored = self.ignored.ignored_identifiers().await?;

        Ok(NftResult {
            addresses: filter_ignored(&fetched.value.by_address, &ignored),
            entries_found: fetched.value.total,
            entries_limit: self.entries_limit(),
        })
    }

    /// Values every NFT held by `addresses`, refreshes the stored table with
    /// what was found, and returns the visible valuations per address.
    ///
    /// When `lp_source` is given, NFTs it knows about are valued as liquidity
    /// positions. Zero-valued NFTs are only returned with `include_zero`, but
    /// are always stored.
    pub async fn get_balances(
        &self,
        addresses: &[Address],
        lp_source: Option<&dyn LiquidityPositionSource>,
        include_zero: bool,
        ignore_cache: bool,
    ) -> Result<BTreeMap<Address, Vec<ValuationResult>>> {
        let addresses = self.tracked_only(addresses).await?;
        let fetched = self.fetch(&addresses, ignore_cache).await?;

        let manual_rows = self
            .store
            .query(&NftFilterQuery::new().priced_only().manual_only())
            .await?;
        let manual: HashMap<String, PricedAsset> = self
            .valuator
            .price_stored(manual_rows)
            .await
            .into_iter()
            .map(|priced| (priced.asset.clone(), priced))
            .collect();

        let mut valuations: BTreeMap<Address, Vec<ValuationResult>> = BTreeMap::new();
        for (address, holdings) in &fetched.value.by_address {
            let lp_values = match lp_source {
                Some(source) => source.valuations_for(address).await?,
                None => HashMap::new(),
            };
            let resolved = holdings
                .iter()
                .map(|holding| {
                    self.valuator.resolve(
                        holding,
                        manual.get(&holding.identifier),
                        lp_values.get(&holding.identifier).copied(),
                    )
                })
                .collect();
            valuations.insert(address.clone(), resolved);
        }

        let mut plan = ReconciliationPlan::from_valuations(&fetched.value.queried, &valuations);
        plan.keep_identifiers(fetched.value.reported.iter().cloned());
        let summary = self.store.apply_plan(&plan).await?;
        info!(
            addresses = fetched.value.queried.len(),
            deleted = summary.deleted,
            inserted = summary.inserted,
            updated = summary.updated,
            repriced = summary.repriced,
            "NFT table reconciled"
        );

        let ignored = self.ignored.ignored_identifiers().await?;
        let visible = filter_ignored(&valuations, &ignored)
            .into_iter()
            .filter_map(|(address, items)| {
                let items: Vec<_> = items
                    .into_iter()
                    .filter(|item| include_zero || !item.is_zero())
                    .collect();
                (!items.is_empty()).then_some((address, items))
            })
            .collect();

        Ok(visible)
    }

    /// Stored NFT prices converted to USD, optionally for one identifier.
    /// Entries whose price asset can't be priced are skipped.
    pub async fn get_cached_priced_assets(
        &self,
        identifier: Option<&str>,
        lp_handling: LpHandling,
    ) -> Result<Vec<PricedAsset>> {
        let mut filter = NftFilterQuery::new()
            .priced_only()
            .with_lp_handling(lp_handling);
        if let Some(identifier) = identifier {
            filter = filter.with_identifier(identifier);
        }

        let rows = self.store.query(&filter).await?;
        Ok(self.valuator.price_stored(rows).await)
    }

    /// Sets a manual price for a stored NFT. Refreshes keep it until cleared.
    pub async fn set_manual_price(
        &self,
        identifier: &str,
        price_asset: &str,
        amount: Decimal,
    ) -> Result<()> {
        let price_asset = price_asset.trim().to_uppercase();
        let affected = self
            .store
            .set_manual_price(identifier, amount, &price_asset)
            .await?;
        expect_one_row(identifier, affected)?;
        info!(
            nft = %identifier,
            asset = %price_asset,
            amount = %amount,
            "manual NFT price set"
        );
        Ok(())
    }

    /// Removes the stored price of an NFT, manual or not. The next refresh
    /// stores a fresh price for it.
    pub async fn clear_manual_price(&self, identifier: &str) -> Result<()> {
        let affected = self.store.clear_price(identifier).await?;
        expect_one_row(identifier, affected)?;
        info!(nft = %identifier, "NFT price cleared");
        Ok(())
    }

    /// One stored NFT with its current USD value. `None` when it isn't
    /// stored or its price asset can't be priced right now.
    pub async fn get_single(&self, identifier: &str) -> Result<Option<StoredNftEntry>> {
        let Some(row) = self.store.get(identifier).await? else {
            return Ok(None);
        };
        Ok(self
            .valuator
            .value_stored(vec![row])
            .await
            .into_iter()
            .next()
            .map(|(row, usd_price)| stored_entry(row, usd_price)))
    }

    /// Stored NFTs matching `filter`, grouped by owner, with counts and the
    /// USD total of the returned page. Rows whose price asset can't be priced
    /// right now are logged and left out of the page.
    pub async fn get_stored_balances(&self, filter: &NftFilterQuery) -> Result<StoredBalances> {
        let rows = self.store.query(filter).await?;
        let entries_found = self.store.count(filter).await?;
        let entries_total = self.store.count_all().await?;

        let mut balances = StoredBalances {
            entries_found,
            entries_total,
            ..StoredBalances::default()
        };
        for (row, usd_price) in self.valuator.value_stored(rows).await {
            let owner = row.owner_address.clone();
            balances.total_usd_value += usd_price;
            balances
                .entries
                .entry(owner)
                .or_default()
                .push(stored_entry(row, usd_price));
        }
        Ok(balances)
    }

    /// Keeps the caller's order, dropping addresses the user doesn't track.
    async fn tracked_only(&self, addresses: &[Address]) -> Result<Vec<Address>> {
        let Some(tracked) = &self.tracked else {
            return Ok(addresses.to_vec());
        };
        let tracked = tracked.tracked_addresses().await?;
        let kept: Vec<Address> = addresses
            .iter()
            .filter(|address| tracked.contains(address))
            .cloned()
            .collect();
        if kept.len() != addresses.len() {
            debug!(
                requested = addresses.len(),
                kept = kept.len(),
                "skipping untracked addresses"
            );
        }
        Ok(kept)
    }
}

fn stored_entry(row: PersistedPriceRecord, usd_price: Decimal) -> StoredNftEntry {
    StoredNftEntry {
        id: row.identifier,
        name: row.name,
        price_in_asset: row.last_price.unwrap_or(Decimal::ZERO),
        price_asset: row.last_price_asset.unwrap_or_else(|| USD.to_string()),
        manually_input: row.manual_price,
        is_lp: row.is_lp,
        image_url: row.image_url,
        usd_price,
        collection_name: row.collection_name,
    }
}

fn expect_one_row(identifier: &str, affected: usize) -> Result<()> {
    if affected == 1 {
        Ok(())
    } else {
        Err(NftError::StoreConstraintViolation {
            identifier: identifier.to_string(),
            affected,
        })
    }
}
