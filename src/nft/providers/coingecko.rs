//! CoinGecko current-price oracle.
//!
//! Uses the free `/simple/price` endpoint. No API key is required, though
//! rate limits apply.

use std::collections::HashMap;
use std::time::Duration;

use anyhow::{anyhow, Context};
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::debug;

use super::{number_to_decimal, USER_AGENT};
use crate::error::{NftError, Result};
use crate::nft::PriceOracle;

const COINGECKO_API_BASE: &str = "https://api.coingecko.com/api/v3";
const SERVICE: &str = "coingecko";

/// `{"ethereum": {"usd": 2534.89}}`
#[derive(Debug, Deserialize)]
#[serde(transparent)]
struct SimplePriceResponse(HashMap<String, HashMap<String, serde_json::Number>>);

pub struct CoinGeckoOracle {
    client: reqwest::Client,
    base_url: String,
    /// Symbol to CoinGecko id overrides, keyed by upper-case symbol.
    custom_mappings: HashMap<String, String>,
}

impl CoinGeckoOracle {
    pub fn new() -> Self {
        Self::with_client(reqwest::Client::new())
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self {
            client,
            base_url: COINGECKO_API_BASE.to_string(),
            custom_mappings: HashMap::new(),
        }
    }

    pub fn with_timeout(timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build CoinGecko HTTP client")?;
        Ok(Self::with_client(client))
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_mapping(
        mut self,
        symbol: impl Into<String>,
        coingecko_id: impl Into<String>,
    ) -> Self {
        self.custom_mappings
            .insert(symbol.into().to_uppercase(), coingecko_id.into());
        self
    }

    fn coingecko_id(&self, symbol: &str) -> Option<String> {
        let symbol = symbol.to_uppercase();
        if let Some(id) = self.custom_mappings.get(&symbol) {
            return Some(id.clone());
        }

        let id = match symbol.as_str() {
            "BTC" => "bitcoin",
            "ETH" => "ethereum",
            "WETH" => "weth",
            "STETH" => "staked-ether",
            "WBTC" => "wrapped-bitcoin",
            "USDT" => "tether",
            "USDC" => "usd-coin",
            "DAI" => "dai",
            "MATIC" | "POL" => "matic-network",
            "SOL" => "solana",
            "BNB" => "binancecoin",
            "AVAX" => "avalanche-2",
            "ARB" => "arbitrum",
            "OP" => "optimism",
            "APE" => "apecoin",
            "LINK" => "chainlink",
            "UNI" => "uniswap",
            "AAVE" => "aave",
            "MKR" => "maker",
            "LDO" => "lido-dao",
            "ENS" => "ethereum-name-service",
            "SAND" => "the-sandbox",
            "MANA" => "decentraland",
            "AXS" => "axie-infinity",
            "BLUR" => "blur",
            _ => return None,
        };
        Some(id.to_string())
    }

    async fn fetch_simple_price(&self, coingecko_id: &str) -> anyhow::Result<SimplePriceResponse> {
        let url = format!("{}/simple/price", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[("ids", coingecko_id), ("vs_currencies", "usd")])
            .header("Accept", "application/json")
            .header("User-Agent", USER_AGENT)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("CoinGecko simple/price API error: {} - {}", status, body));
        }

        Ok(response.json().await?)
    }
}

impl Default for CoinGeckoOracle {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl PriceOracle for CoinGeckoOracle {
    async fn usd_price(&self, asset: &str) -> Result<Decimal> {
        let Some(coingecko_id) = self.coingecko_id(asset) else {
            return Err(NftError::UnknownAsset(asset.to_string()));
        };

        let SimplePriceResponse(prices) = self
            .fetch_simple_price(&coingecko_id)
            .await
            .map_err(|e| NftError::remote(SERVICE, e))?;

        let price = prices
            .get(&coingecko_id)
            .and_then(|quote| quote.get("usd"))
            .and_then(number_to_decimal)
            .unwrap_or(Decimal::ZERO);
        debug!(asset, coingecko_id = %coingecko_id, price = %price, "CoinGecko quote");
        Ok(price)
    }

    fn name(&self) -> &str {
        SERVICE
    }
}
