mod address;
mod holding;
mod record;
mod valuation;

pub use address::{Address, AddressError};
pub use holding::HoldingRecord;
pub use record::{LpHandling, PersistedPriceRecord};
pub use valuation::{
    NftResult, PricedAsset, StoredBalances, StoredNftEntry, ValuationResult, ValuationSource,
};

/// Identifier of the reference currency all valuations resolve to.
pub const USD: &str = "USD";
