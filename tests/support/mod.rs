#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use nftbook::error::{NftError, Result};
use nftbook::models::{Address, HoldingRecord};
use nftbook::nft::{NftProvider, PriceOracle};
use rust_decimal::Decimal;

pub fn addr(n: u8) -> Address {
    Address::parse(format!("0x{:040x}", n)).expect("valid test address")
}

pub fn usd(amount: i64) -> Decimal {
    Decimal::from(amount)
}

/// Provider serving scripted holdings per address. Counts calls per address
/// and can be slowed down to widen race windows.
#[derive(Default)]
pub struct CountingProvider {
    holdings: Mutex<HashMap<Address, Vec<HoldingRecord>>>,
    calls: Mutex<HashMap<Address, usize>>,
    total_calls: AtomicUsize,
    delay: Option<Duration>,
}

impl CountingProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn set_holdings(&self, address: &Address, holdings: Vec<HoldingRecord>) {
        self.holdings
            .lock()
            .unwrap()
            .insert(address.clone(), holdings);
    }

    pub fn calls_for(&self, address: &Address) -> usize {
        self.calls.lock().unwrap().get(address).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.total_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl NftProvider for CountingProvider {
    async fn list_holdings(&self, address: &Address) -> Result<Vec<HoldingRecord>> {
        self.total_calls.fetch_add(1, Ordering::SeqCst);
        *self
            .calls
            .lock()
            .unwrap()
            .entry(address.clone())
            .or_default() += 1;
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        Ok(self
            .holdings
            .lock()
            .unwrap()
            .get(address)
            .cloned()
            .unwrap_or_default())
    }

    fn name(&self) -> &str {
        "counting"
    }
}

/// Provider that always fails as if the remote were down.
pub struct DownProvider;

#[async_trait]
impl NftProvider for DownProvider {
    async fn list_holdings(&self, _address: &Address) -> Result<Vec<HoldingRecord>> {
        Err(NftError::remote("down", anyhow::anyhow!("connection refused")))
    }

    fn name(&self) -> &str {
        "down"
    }
}

/// Oracle with a fixed USD rate per symbol. Symbols not listed are unknown.
/// Counts every lookup.
#[derive(Default)]
pub struct ScriptedOracle {
    rates: HashMap<String, Decimal>,
    calls: AtomicUsize,
}

impl ScriptedOracle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rate(mut self, symbol: &str, rate: Decimal) -> Self {
        self.rates.insert(symbol.to_uppercase(), rate);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PriceOracle for ScriptedOracle {
    async fn usd_price(&self, asset: &str) -> Result<Decimal> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.rates
            .get(&asset.to_uppercase())
            .copied()
            .ok_or_else(|| NftError::UnknownAsset(asset.to_string()))
    }

    fn name(&self) -> &str {
        "scripted"
    }
}
