mod config;
mod nfts;

use std::sync::Arc;

use anyhow::Result;
use secrecy::{ExposeSecret, SecretString};

use crate::config::ResolvedConfig;
use crate::nft::providers::{CoinGeckoOracle, OpenSeaProvider};
use crate::nft::{NftService, PriceOracle, StaticIgnoredAssets};
use crate::storage::JsonFileNftStore;

pub use config::config_output;
pub use nfts::{
    balances, clear_price, holdings, prices, set_price, stored, BalancesOutput, IgnoredView,
    StoredQueryArgs,
};

/// Wires the NFT service to OpenSea, CoinGecko and the JSON table in the
/// configured data directory.
pub fn build_service(config: &ResolvedConfig) -> Result<NftService> {
    let oracle: Arc<dyn PriceOracle> = Arc::new(
        CoinGeckoOracle::with_timeout(config.coingecko.timeout)?
            .with_base_url(&config.coingecko.base_url),
    );

    let mut provider = OpenSeaProvider::with_timeout(config.opensea.timeout)?
        .with_base_url(&config.opensea.base_url)
        .with_native_currency(&config.native_currency)
        .with_oracle(Arc::clone(&oracle));
    if let Some(key) = &config.opensea.api_key {
        provider = provider.with_api_key(SecretString::new(key.expose_secret().into()));
    }

    let store = Arc::new(JsonFileNftStore::new(&config.data_dir));
    let ignored = Arc::new(StaticIgnoredAssets::new(config.ignored.iter().cloned()));

    Ok(
        NftService::new(Arc::new(provider), oracle, store, config.tier)
            .with_ignored_assets(ignored)
            .with_native_currency(&config.native_currency),
    )
}
