//! OpenSea v2 holdings provider.
//!
//! Lists an account's NFTs page by page and values each one at its
//! collection's floor price.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context};
use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, warn};

use super::{number_to_decimal, USER_AGENT};
use crate::error::{NftError, Result};
use crate::models::{Address, HoldingRecord};
use crate::nft::{NftProvider, PriceOracle, DEFAULT_NATIVE_CURRENCY};

const OPENSEA_API_BASE: &str = "https://api.opensea.io";
const SERVICE: &str = "opensea";
const PAGE_LIMIT: &str = "200";
/// Accounts needing more pages than this fail instead of paging forever.
const MAX_PAGES: usize = 100;

#[derive(Debug, Deserialize)]
struct AccountNftsResponse {
    #[serde(default)]
    nfts: Vec<OpenSeaNft>,
    next: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct OpenSeaNft {
    identifier: String,
    collection: Option<String>,
    contract: String,
    name: Option<String>,
    image_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CollectionStatsResponse {
    total: CollectionTotals,
}

#[derive(Debug, Deserialize)]
struct CollectionTotals {
    floor_price: Option<serde_json::Number>,
    floor_price_symbol: Option<String>,
}

/// Floor price of a collection, in the provider's native currency.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Floor {
    native: Decimal,
    usd: Decimal,
}

impl OpenSeaNft {
    /// Stable id shared with the stored table: `_nft_<contract>_<token id>`.
    fn token_identifier(&self) -> String {
        format!("_nft_{}_{}", self.contract.to_lowercase(), self.identifier)
    }

    fn into_holding(self, owner: &Address, floor: Option<Floor>) -> HoldingRecord {
        let mut holding = HoldingRecord::new(self.token_identifier(), owner.clone());
        if let Some(name) = self.name.filter(|n| !n.is_empty()) {
            holding = holding.with_name(name);
        }
        if let Some(collection) = self.collection {
            holding = holding.with_collection(collection);
        }
        if let Some(url) = self.image_url.filter(|u| !u.is_empty()) {
            holding = holding.with_image_url(url);
        }
        if let Some(floor) = floor {
            holding = holding.with_prices(floor.native, floor.usd);
        }
        holding
    }
}

pub struct OpenSeaProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<SecretString>,
    chain: String,
    /// Converts floor prices to USD. Without one, holdings carry no price.
    oracle: Option<Arc<dyn PriceOracle>>,
    native_currency: String,
    max_pages: usize,
}

impl OpenSeaProvider {
    pub fn new() -> Self {
        Self::with_client(reqwest::Client::new())
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self {
            client,
            base_url: OPENSEA_API_BASE.to_string(),
            api_key: None,
            chain: "ethereum".to_string(),
            oracle: None,
            native_currency: DEFAULT_NATIVE_CURRENCY.to_string(),
            max_pages: MAX_PAGES,
        }
    }

    pub fn with_timeout(timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .gzip(true)
            .build()
            .context("Failed to build OpenSea HTTP client")?;
        Ok(Self::with_client(client))
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_api_key(mut self, api_key: SecretString) -> Self {
        self.api_key = Some(api_key);
        self
    }

    pub fn with_oracle(mut self, oracle: Arc<dyn PriceOracle>) -> Self {
        self.oracle = Some(oracle);
        self
    }

    pub fn with_native_currency(mut self, currency: impl Into<String>) -> Self {
        self.native_currency = currency.into().trim().to_uppercase();
        self
    }

    pub fn with_max_pages(mut self, max_pages: usize) -> Self {
        self.max_pages = max_pages.max(1);
        self
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, &str)],
    ) -> anyhow::Result<T> {
        let mut request = self
            .client
            .get(url)
            .query(query)
            .header("Accept", "application/json")
            .header("User-Agent", USER_AGENT);
        if let Some(key) = &self.api_key {
            request = request.header("x-api-key", key.expose_secret());
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("OpenSea API error: {} - {}", status, body));
        }
        response
            .json()
            .await
            .with_context(|| format!("Failed to parse OpenSea response from {url}"))
    }

    async fn fetch_all_nfts(&self, address: &Address) -> anyhow::Result<Vec<OpenSeaNft>> {
        let url = format!(
            "{}/api/v2/chain/{}/account/{}/nfts",
            self.base_url, self.chain, address
        );
        let mut nfts = Vec::new();
        let mut cursor: Option<String> = None;
        let mut seen_cursors = HashSet::new();

        for _ in 0..self.max_pages {
            let mut query = vec![("limit", PAGE_LIMIT)];
            if let Some(next) = cursor.as_deref() {
                query.push(("next", next));
            }
            let page: AccountNftsResponse = self.get_json(&url, &query).await?;
            debug!(address = %address, page_size = page.nfts.len(), "OpenSea page");
            nfts.extend(page.nfts);

            let Some(next) = page.next.filter(|n| !n.is_empty()) else {
                return Ok(nfts);
            };
            if !seen_cursors.insert(next.clone()) {
                return Err(anyhow!("OpenSea repeated page cursor {next} for {address}"));
            }
            cursor = Some(next);
        }

        Err(anyhow!(
            "OpenSea listing for {address} exceeded {} pages",
            self.max_pages
        ))
    }

    async fn collection_floor(
        &self,
        slug: &str,
        native_usd: Decimal,
    ) -> anyhow::Result<Option<Floor>> {
        let url = format!("{}/api/v2/collections/{}/stats", self.base_url, slug);
        let stats: CollectionStatsResponse = self.get_json(&url, &[]).await?;

        let Some(native) = stats.total.floor_price.as_ref().and_then(number_to_decimal) else {
            return Ok(None);
        };
        if let Some(symbol) = &stats.total.floor_price_symbol {
            if !symbol.is_empty() && !symbol.eq_ignore_ascii_case(&self.native_currency) {
                warn!(
                    collection = slug,
                    symbol = %symbol,
                    "floor price not in native currency, skipping"
                );
                return Ok(None);
            }
        }
        Ok(Some(Floor {
            native,
            usd: native * native_usd,
        }))
    }

    async fn floors_for(
        &self,
        nfts: &[OpenSeaNft],
    ) -> anyhow::Result<HashMap<String, Option<Floor>>> {
        let mut floors = HashMap::new();
        let Some(oracle) = &self.oracle else {
            return Ok(floors);
        };
        if nfts.is_empty() {
            return Ok(floors);
        }

        let native_usd = oracle.usd_price(&self.native_currency).await?;
        for slug in nfts.iter().filter_map(|nft| nft.collection.as_deref()) {
            if floors.contains_key(slug) {
                continue;
            }
            let floor = self.collection_floor(slug, native_usd).await?;
            floors.insert(slug.to_string(), floor);
        }
        Ok(floors)
    }
}

impl Default for OpenSeaProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl NftProvider for OpenSeaProvider {
    async fn list_holdings(&self, address: &Address) -> Result<Vec<HoldingRecord>> {
        let nfts = self
            .fetch_all_nfts(address)
            .await
            .map_err(|e| NftError::remote(SERVICE, e))?;
        let floors = self
            .floors_for(&nfts)
            .await
            .map_err(|e| NftError::remote(SERVICE, e))?;

        Ok(nfts
            .into_iter()
            .map(|nft| {
                let floor = nft
                    .collection
                    .as_deref()
                    .and_then(|slug| floors.get(slug).copied().flatten());
                nft.into_holding(address, floor)
            })
            .collect())
    }

    fn name(&self) -> &str {
        SERVICE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_PAGE: &str = r#"{
        "nfts": [
            {
                "identifier": "1337",
                "collection": "cryptopunks",
                "contract": "0xB47e3cd837dDF8e4c57F05d70Ab865de6e193BBB",
                "token_standard": "cryptopunks",
                "name": "CryptoPunk #1337",
                "image_url": "https://img.example/1337.png",
                "is_disabled": false
            },
            {
                "identifier": "7",
                "collection": null,
                "contract": "0x0000000000000000000000000000000000000001",
                "name": "",
                "image_url": null
            }
        ],
        "next": "abc"
    }"#;

    fn owner() -> Address {
        Address::parse("0x00000000000000000000000000000000000000aa").unwrap()
    }

    #[test]
    fn parse_account_page() {
        let page: AccountNftsResponse =
            serde_json::from_str(SAMPLE_PAGE).expect("Failed to parse page");
        assert_eq!(page.nfts.len(), 2);
        assert_eq!(page.next.as_deref(), Some("abc"));
        assert_eq!(
            page.nfts[0].token_identifier(),
            "_nft_0xb47e3cd837ddf8e4c57f05d70ab865de6e193bbb_1337"
        );
    }

    #[test]
    fn holdings_carry_floor_price_when_known() {
        let page: AccountNftsResponse = serde_json::from_str(SAMPLE_PAGE).unwrap();
        let mut nfts = page.nfts.into_iter();

        let punk = nfts.next().unwrap().into_holding(
            &owner(),
            Some(Floor {
                native: Decimal::from(50),
                usd: Decimal::from(100_000),
            }),
        );
        assert_eq!(punk.name.as_deref(), Some("CryptoPunk #1337"));
        assert_eq!(punk.collection_name.as_deref(), Some("cryptopunks"));
        assert_eq!(punk.price_usd, Decimal::from(100_000));

        let unnamed = nfts.next().unwrap().into_holding(&owner(), None);
        assert!(unnamed.name.is_none());
        assert!(unnamed.image_url.is_none());
        assert_eq!(unnamed.price_usd, Decimal::ZERO);
    }

    #[test]
    fn parse_collection_stats() {
        let stats: CollectionStatsResponse = serde_json::from_str(
            r#"{"total": {"volume": 10.5, "floor_price": 0.25, "floor_price_symbol": "ETH"}}"#,
        )
        .unwrap();
        let floor = stats.total.floor_price.as_ref().and_then(number_to_decimal);
        assert_eq!(floor, Some(Decimal::new(25, 2)));
    }
}
