mod support;

use std::sync::Arc;

use anyhow::Result;
use nftbook::models::HoldingRecord;
use nftbook::nft::{NftService, Tier};
use nftbook::storage::{JsonFileNftStore, PricedRecordStore};
use support::{addr, usd, CountingProvider, ScriptedOracle};
use tempfile::TempDir;

fn service(provider: Arc<CountingProvider>, dir: &TempDir) -> NftService {
    NftService::new(
        provider,
        Arc::new(ScriptedOracle::new()),
        Arc::new(JsonFileNftStore::new(dir.path())),
        Tier::Premium,
    )
}

#[tokio::test]
async fn repeated_refresh_leaves_file_unchanged() -> Result<()> {
    let dir = TempDir::new()?;
    let provider = Arc::new(CountingProvider::new());
    provider.set_holdings(
        &addr(1),
        vec![
            HoldingRecord::new("a", addr(1)).with_prices(usd(1), usd(2)),
            HoldingRecord::new("b", addr(1)),
        ],
    );
    let svc = service(provider, &dir);

    svc.get_balances(&[addr(1)], None, true, true).await?;
    let first = std::fs::read_to_string(dir.path().join("nfts.json"))?;
    svc.get_balances(&[addr(1)], None, true, true).await?;
    let second = std::fs::read_to_string(dir.path().join("nfts.json"))?;

    assert_eq!(first, second);
    Ok(())
}

#[tokio::test]
async fn manual_price_persists_across_reopen() -> Result<()> {
    let dir = TempDir::new()?;
    let provider = Arc::new(CountingProvider::new());
    provider.set_holdings(
        &addr(1),
        vec![HoldingRecord::new("x", addr(1)).with_prices(usd(1), usd(2))],
    );

    service(provider.clone(), &dir)
        .get_balances(&[addr(1)], None, false, false)
        .await?;
    service(provider.clone(), &dir)
        .set_manual_price("x", "USD", usd(9))
        .await?;

    let reopened = service(provider, &dir);
    let balances = reopened.get_balances(&[addr(1)], None, false, true).await?;
    assert_eq!(balances[&addr(1)][0].usd_price, usd(9));

    let row = JsonFileNftStore::new(dir.path())
        .get("x")
        .await?
        .expect("row persisted");
    assert!(row.manual_price);
    Ok(())
}

#[tokio::test]
async fn amounts_are_written_as_strings() -> Result<()> {
    let dir = TempDir::new()?;
    let provider = Arc::new(CountingProvider::new());
    provider.set_holdings(
        &addr(1),
        vec![HoldingRecord::new("a", addr(1))
            .with_prices(rust_decimal::Decimal::new(125, 2), usd(3))],
    );
    service(provider, &dir)
        .get_balances(&[addr(1)], None, false, false)
        .await?;

    let raw: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(dir.path().join("nfts.json"))?)?;
    assert_eq!(raw[0]["last_price"], "1.25");
    assert_eq!(raw[0]["last_price_asset"], "ETH");
    Ok(())
}
