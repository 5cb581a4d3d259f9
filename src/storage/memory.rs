//! In-memory NFT table, used in tests and by library consumers that persist
//! elsewhere.

use anyhow::Result;
use rust_decimal::Decimal;
use tokio::sync::Mutex;

use super::table::{self, Table};
use super::{NftFilterQuery, PricedRecordStore};
use crate::models::PersistedPriceRecord;
use crate::nft::{ReconcileSummary, ReconciliationPlan};

#[derive(Default)]
pub struct MemoryNftStore {
    rows: Mutex<Table>,
}

impl MemoryNftStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds rows directly, replacing rows with the same identifier.
    pub async fn insert_rows(&self, rows: impl IntoIterator<Item = PersistedPriceRecord>) {
        let mut table = self.rows.lock().await;
        for row in rows {
            table.insert(row.identifier.clone(), row);
        }
    }

    pub async fn all_rows(&self) -> Vec<PersistedPriceRecord> {
        self.rows.lock().await.values().cloned().collect()
    }
}

#[async_trait::async_trait]
impl PricedRecordStore for MemoryNftStore {
    async fn get(&self, identifier: &str) -> Result<Option<PersistedPriceRecord>> {
        let rows = self.rows.lock().await;
        Ok(rows.get(identifier).cloned())
    }

    async fn query(&self, filter: &NftFilterQuery) -> Result<Vec<PersistedPriceRecord>> {
        let rows = self.rows.lock().await;
        Ok(table::query(&rows, filter))
    }

    async fn count(&self, filter: &NftFilterQuery) -> Result<usize> {
        let rows = self.rows.lock().await;
        Ok(table::count(&rows, filter))
    }

    async fn count_all(&self) -> Result<usize> {
        Ok(self.rows.lock().await.len())
    }

    async fn apply_plan(&self, plan: &ReconciliationPlan) -> Result<ReconcileSummary> {
        let mut rows = self.rows.lock().await;
        let mut next = rows.clone();
        let summary = plan.apply_to(&mut next);
        *rows = next;
        Ok(summary)
    }

    async fn set_manual_price(
        &self,
        identifier: &str,
        amount: Decimal,
        asset: &str,
    ) -> Result<usize> {
        let mut rows = self.rows.lock().await;
        Ok(table::set_manual_price(&mut rows, identifier, amount, asset))
    }

    async fn clear_price(&self, identifier: &str) -> Result<usize> {
        let mut rows = self.rows.lock().await;
        Ok(table::clear_price(&mut rows, identifier))
    }
}
