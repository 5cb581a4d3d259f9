//! HTTP-backed NFT provider and price oracle.

pub mod coingecko;
pub mod opensea;

pub use coingecko::CoinGeckoOracle;
pub use opensea::OpenSeaProvider;

use std::str::FromStr;

use rust_decimal::Decimal;

const USER_AGENT: &str = concat!("nftbook/", env!("CARGO_PKG_VERSION"));

/// Converts a JSON number without going through `f64` formatting quirks.
fn number_to_decimal(number: &serde_json::Number) -> Option<Decimal> {
    let text = number.to_string();
    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .ok()
}
