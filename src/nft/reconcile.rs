//! Reconciliation of a fresh fetch against the stored NFT table.
//!
//! A [`ReconciliationPlan`] lists everything one refresh wants to change:
//! rows to insert if missing, non-price fields to overwrite, prices to write
//! where the user has not set one, and which owners' stale rows to drop.
//! Rows carrying a manual price are never dropped.
//! Stores apply a plan as a unit with [`ReconciliationPlan::apply_to`].

use std::collections::{BTreeMap, BTreeSet};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::{Address, PersistedPriceRecord, ValuationResult};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldUpdate {
    pub identifier: String,
    pub name: Option<String>,
    pub owner_address: Address,
    pub image_url: Option<String>,
    pub collection_name: Option<String>,
}

/// Price write that only lands on rows without a manual price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceUpdate {
    pub identifier: String,
    pub last_price: Decimal,
    pub last_price_asset: String,
    pub is_lp: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciliationPlan {
    /// Owners whose rows are refreshed by this plan.
    pub delete_scope: BTreeSet<Address>,
    /// Identifiers still owned; rows in scope that are not listed here go
    /// unless they carry a manual price.
    pub keep: BTreeSet<String>,
    pub inserts: Vec<PersistedPriceRecord>,
    pub field_updates: Vec<FieldUpdate>,
    pub price_updates: Vec<PriceUpdate>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileSummary {
    pub deleted: usize,
    pub inserted: usize,
    pub updated: usize,
    pub repriced: usize,
}

impl ReconcileSummary {
    pub fn is_noop(&self) -> bool {
        *self == Self::default()
    }
}

impl ReconciliationPlan {
    pub fn new<I>(scope: I) -> Self
    where
        I: IntoIterator<Item = Address>,
    {
        Self {
            delete_scope: scope.into_iter().collect(),
            ..Self::default()
        }
    }

    /// Builds the plan for every valuation of a refreshed batch.
    pub fn from_valuations<'a, I>(
        scope: I,
        valuations: &BTreeMap<Address, Vec<ValuationResult>>,
    ) -> Self
    where
        I: IntoIterator<Item = &'a Address>,
    {
        let mut plan = Self::new(scope.into_iter().cloned());
        for (owner, items) in valuations {
            for item in items {
                plan.push(owner, item);
            }
        }
        plan
    }

    /// Marks identifiers as still owned without writing anything for them.
    /// Used for items the provider reported but the quota cut.
    pub fn keep_identifiers<I>(&mut self, identifiers: I)
    where
        I: IntoIterator<Item = String>,
    {
        self.keep.extend(identifiers);
    }

    pub fn push(&mut self, owner: &Address, valuation: &ValuationResult) {
        self.keep.insert(valuation.id.clone());
        self.inserts.push(PersistedPriceRecord {
            identifier: valuation.id.clone(),
            name: valuation.name.clone(),
            owner_address: owner.clone(),
            last_price: Some(valuation.price_in_asset),
            last_price_asset: Some(valuation.price_asset.clone()),
            manual_price: false,
            is_lp: valuation.is_lp,
            image_url: valuation.image_url.clone(),
            collection_name: valuation.collection_name.clone(),
        });
        self.field_updates.push(FieldUpdate {
            identifier: valuation.id.clone(),
            name: valuation.name.clone(),
            owner_address: owner.clone(),
            image_url: valuation.image_url.clone(),
            collection_name: valuation.collection_name.clone(),
        });
        self.price_updates.push(PriceUpdate {
            identifier: valuation.id.clone(),
            last_price: valuation.price_in_asset,
            last_price_asset: valuation.price_asset.clone(),
            is_lp: valuation.is_lp,
        });
    }

    pub fn is_empty(&self) -> bool {
        self.delete_scope.is_empty() && self.inserts.is_empty()
    }

    /// Applies the plan to `table`. Callers wanting all-or-nothing semantics
    /// apply it to a copy and publish the copy.
    pub fn apply_to(
        &self,
        table: &mut BTreeMap<String, PersistedPriceRecord>,
    ) -> ReconcileSummary {
        let mut summary = ReconcileSummary::default();

        let before = table.len();
        table.retain(|identifier, row| {
            !self.delete_scope.contains(&row.owner_address)
                || self.keep.contains(identifier)
                || row.manual_price
        });
        summary.deleted = before - table.len();

        for row in &self.inserts {
            if !table.contains_key(&row.identifier) {
                table.insert(row.identifier.clone(), row.clone());
                summary.inserted += 1;
            }
        }

        for update in &self.field_updates {
            let Some(row) = table.get_mut(&update.identifier) else {
                continue;
            };
            let changed = row.name != update.name
                || row.owner_address != update.owner_address
                || row.image_url != update.image_url
                || row.collection_name != update.collection_name;
            if changed {
                row.name = update.name.clone();
                row.owner_address = update.owner_address.clone();
                row.image_url = update.image_url.clone();
                row.collection_name = update.collection_name.clone();
                summary.updated += 1;
            }
        }

        for update in &self.price_updates {
            let Some(row) = table.get_mut(&update.identifier) else {
                continue;
            };
            if row.manual_price {
                continue;
            }
            let changed = row.last_price != Some(update.last_price)
                || row.last_price_asset.as_deref() != Some(update.last_price_asset.as_str())
                || row.is_lp != update.is_lp;
            if changed {
                row.last_price = Some(update.last_price);
                row.last_price_asset = Some(update.last_price_asset.clone());
                row.is_lp = update.is_lp;
                summary.repriced += 1;
            }
        }

        summary
    }
}
