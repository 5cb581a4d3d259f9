use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use tokio::fs;
use tokio::sync::Mutex;
use tracing::debug;

use super::table::{self, Table};
use super::{NftFilterQuery, PricedRecordStore};
use crate::models::PersistedPriceRecord;
use crate::nft::{ReconcileSummary, ReconciliationPlan};

/// NFT table kept as a single JSON document.
///
/// Layout:
/// ```text
/// data/
///   nfts.json
/// ```
///
/// Writes go to a sibling temp file that is then renamed over `nfts.json`,
/// so a reader sees either the table before a change or after it.
pub struct JsonFileNftStore {
    base_path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonFileNftStore {
    pub fn new(base_path: impl AsRef<Path>) -> Self {
        Self {
            base_path: base_path.as_ref().to_path_buf(),
            write_lock: Mutex::new(()),
        }
    }

    fn table_file(&self) -> PathBuf {
        self.base_path.join("nfts.json")
    }

    fn temp_file(&self) -> PathBuf {
        self.base_path.join("nfts.json.tmp")
    }

    async fn read_table(&self) -> Result<Table> {
        let path = self.table_file();
        let rows: Vec<PersistedPriceRecord> = match fs::read_to_string(&path).await {
            Ok(content) => serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse JSON from {}", path.display()))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(e).context("Failed to read NFT table"),
        };
        Ok(rows
            .into_iter()
            .map(|row| (row.identifier.clone(), row))
            .collect())
    }

    async fn write_table(&self, table: &Table) -> Result<()> {
        fs::create_dir_all(&self.base_path)
            .await
            .context("Failed to create data directory")?;

        let rows: Vec<&PersistedPriceRecord> = table.values().collect();
        let content = serde_json::to_string_pretty(&rows).context("Failed to serialize NFT table")?;

        let temp = self.temp_file();
        fs::write(&temp, content)
            .await
            .context("Failed to write NFT table")?;
        fs::rename(&temp, self.table_file())
            .await
            .context("Failed to replace NFT table")?;
        debug!(rows = table.len(), path = %self.table_file().display(), "NFT table written");
        Ok(())
    }

    /// Read-modify-write under the store's write lock. Nothing is written
    /// when `change` reports no affected rows.
    async fn modify<F>(&self, change: F) -> Result<usize>
    where
        F: FnOnce(&mut Table) -> usize + Send,
    {
        let _guard = self.write_lock.lock().await;
        let mut table = self.read_table().await?;
        let affected = change(&mut table);
        if affected > 0 {
            self.write_table(&table).await?;
        }
        Ok(affected)
    }
}

#[async_trait::async_trait]
impl PricedRecordStore for JsonFileNftStore {
    async fn get(&self, identifier: &str) -> Result<Option<PersistedPriceRecord>> {
        let mut table = self.read_table().await?;
        Ok(table.remove(identifier))
    }

    async fn query(&self, filter: &NftFilterQuery) -> Result<Vec<PersistedPriceRecord>> {
        let table = self.read_table().await?;
        Ok(table::query(&table, filter))
    }

    async fn count(&self, filter: &NftFilterQuery) -> Result<usize> {
        let table = self.read_table().await?;
        Ok(table::count(&table, filter))
    }

    async fn count_all(&self) -> Result<usize> {
        Ok(self.read_table().await?.len())
    }

    async fn apply_plan(&self, plan: &ReconciliationPlan) -> Result<ReconcileSummary> {
        let _guard = self.write_lock.lock().await;
        let mut table = self.read_table().await?;
        let summary = plan.apply_to(&mut table);
        if !summary.is_noop() {
            self.write_table(&table).await?;
        }
        Ok(summary)
    }

    async fn set_manual_price(
        &self,
        identifier: &str,
        amount: Decimal,
        asset: &str,
    ) -> Result<usize> {
        self.modify(|table| table::set_manual_price(table, identifier, amount, asset))
            .await
    }

    async fn clear_price(&self, identifier: &str) -> Result<usize> {
        self.modify(|table| table::clear_price(table, identifier))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Address;
    use tempfile::TempDir;

    fn owner() -> Address {
        Address::parse("0x00000000000000000000000000000000000000aa").unwrap()
    }

    #[tokio::test]
    async fn missing_file_reads_as_empty_table() -> Result<()> {
        let dir = TempDir::new()?;
        let store = JsonFileNftStore::new(dir.path().join("nested"));
        assert_eq!(store.count_all().await?, 0);
        assert!(store.get("nft-1").await?.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn plan_is_persisted_and_reloaded() -> Result<()> {
        let dir = TempDir::new()?;
        let store = JsonFileNftStore::new(dir.path());

        let mut plan = ReconciliationPlan::new([owner()]);
        plan.inserts.push(PersistedPriceRecord::bare("nft-1", owner()));
        plan.keep.insert("nft-1".to_string());
        let summary = store.apply_plan(&plan).await?;
        assert_eq!(summary.inserted, 1);
        assert!(!dir.path().join("nfts.json.tmp").exists());

        let reopened = JsonFileNftStore::new(dir.path());
        let row = reopened.get("nft-1").await?.expect("row persisted");
        assert_eq!(row.owner_address, owner());

        assert_eq!(reopened.set_manual_price("nft-1", Decimal::from(3), "ETH").await?, 1);
        let row = store.get("nft-1").await?.expect("row");
        assert!(row.manual_price);
        assert_eq!(row.last_price_asset.as_deref(), Some("ETH"));
        Ok(())
    }

    #[tokio::test]
    async fn corrupt_file_is_an_error() -> Result<()> {
        let dir = TempDir::new()?;
        std::fs::write(dir.path().join("nfts.json"), "{not json")?;
        let store = JsonFileNftStore::new(dir.path());
        assert!(store.count_all().await.is_err());
        Ok(())
    }
}
