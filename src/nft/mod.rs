//! NFT holdings sync and valuation.

mod cache;
mod fetcher;
mod ignore;
mod quota;
mod reconcile;
mod service;
mod sources;
mod valuator;

#[cfg(feature = "providers")]
pub mod providers;

pub use cache::{CachedValue, SingleFlightCache};
pub use fetcher::{AddressFetcher, FetchedHoldings};
pub use ignore::{filter_ignored, NftIdentified};
pub use quota::{QuotaLimiter, QuotaTracker, Tier, FREE_NFT_LIMIT};
pub use reconcile::{FieldUpdate, PriceUpdate, ReconcileSummary, ReconciliationPlan};
pub use service::NftService;
pub use sources::{
    IgnoredAssets, LiquidityPositionSource, LiquidityPositionValues, NftProvider, PriceOracle,
    StaticIgnoredAssets, TrackedAccounts, UsdOnlyOracle,
};
pub use valuator::{Valuator, DEFAULT_NATIVE_CURRENCY};
