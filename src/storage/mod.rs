mod filter;
mod json_file;
mod memory;
mod table;

pub use filter::{IgnoredHandling, NftFilterQuery};
pub use json_file::JsonFileNftStore;
pub use memory::MemoryNftStore;

use anyhow::Result;
use rust_decimal::Decimal;

use crate::models::PersistedPriceRecord;
use crate::nft::{ReconcileSummary, ReconciliationPlan};

/// Persistent table of NFTs seen for the user's addresses, with their last
/// known or manually entered price.
#[async_trait::async_trait]
pub trait PricedRecordStore: Send + Sync {
    async fn get(&self, identifier: &str) -> Result<Option<PersistedPriceRecord>>;

    /// Matching rows, ordered by identifier, after pagination.
    async fn query(&self, filter: &NftFilterQuery) -> Result<Vec<PersistedPriceRecord>>;

    /// Number of matching rows, ignoring pagination.
    async fn count(&self, filter: &NftFilterQuery) -> Result<usize>;

    async fn count_all(&self) -> Result<usize>;

    /// Applies every change in `plan` or none of them.
    async fn apply_plan(&self, plan: &ReconciliationPlan) -> Result<ReconcileSummary>;

    /// Sets a user price and marks it manual. Returns rows affected.
    async fn set_manual_price(&self, identifier: &str, amount: Decimal, asset: &str)
        -> Result<usize>;

    /// Drops the stored price and the manual mark. Returns rows affected.
    async fn clear_price(&self, identifier: &str) -> Result<usize>;
}
