use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use tracing::{debug, info};

use super::{NftProvider, QuotaLimiter};
use crate::error::Result;
use crate::models::{Address, HoldingRecord};

/// Raw holdings of one fetch pass, after quota truncation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchedHoldings {
    pub by_address: BTreeMap<Address, Vec<HoldingRecord>>,
    pub total: usize,
    /// Addresses the provider was asked about, in order. Addresses skipped
    /// because the quota ran out are not listed.
    pub queried: Vec<Address>,
    /// Every identifier the queried addresses reported, including the ones
    /// the quota cut from `by_address`.
    pub reported: BTreeSet<String>,
}

/// Queries the provider once per address, in the order given.
pub struct AddressFetcher {
    provider: Arc<dyn NftProvider>,
    quota: QuotaLimiter,
}

impl AddressFetcher {
    pub fn new(provider: Arc<dyn NftProvider>, quota: QuotaLimiter) -> Self {
        Self { provider, quota }
    }

    pub fn quota(&self) -> &QuotaLimiter {
        &self.quota
    }

    /// Fetches holdings for `addresses`. Any provider error fails the whole
    /// fetch; nothing gathered before the failure is returned.
    pub async fn fetch(&self, addresses: &[Address]) -> Result<FetchedHoldings> {
        let mut tracker = self.quota.tracker();
        let mut by_address = BTreeMap::new();
        let mut queried = Vec::new();
        let mut reported = BTreeSet::new();

        for address in addresses {
            if tracker.is_exhausted() {
                info!(
                    address = %address,
                    used = tracker.used(),
                    "NFT quota reached, not querying remaining addresses"
                );
                break;
            }

            let mut holdings = self.provider.list_holdings(address).await?;
            queried.push(address.clone());
            reported.extend(holdings.iter().map(|h| h.identifier.clone()));
            let available = holdings.len();
            let keep = tracker.admit(available);
            debug!(
                address = %address,
                provider = self.provider.name(),
                available,
                keep,
                "fetched NFT holdings"
            );
            if keep == 0 {
                continue;
            }

            holdings.truncate(keep);
            by_address.insert(address.clone(), holdings);
        }

        Ok(FetchedHoldings {
            by_address,
            total: tracker.used(),
            queried,
            reported,
        })
    }
}
