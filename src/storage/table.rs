//! Row operations shared by the map-backed stores.

use std::collections::BTreeMap;

use rust_decimal::Decimal;

use super::NftFilterQuery;
use crate::models::PersistedPriceRecord;

pub(super) type Table = BTreeMap<String, PersistedPriceRecord>;

pub(super) fn query(table: &Table, filter: &NftFilterQuery) -> Vec<PersistedPriceRecord> {
    filter.paginate(table.values().filter(|row| filter.matches(row)))
}

pub(super) fn count(table: &Table, filter: &NftFilterQuery) -> usize {
    table.values().filter(|row| filter.matches(row)).count()
}

pub(super) fn set_manual_price(
    table: &mut Table,
    identifier: &str,
    amount: Decimal,
    asset: &str,
) -> usize {
    match table.get_mut(identifier) {
        Some(row) => {
            row.last_price = Some(amount);
            row.last_price_asset = Some(asset.to_string());
            row.manual_price = true;
            1
        }
        None => 0,
    }
}

pub(super) fn clear_price(table: &mut Table, identifier: &str) -> usize {
    match table.get_mut(identifier) {
        Some(row) => {
            row.last_price = None;
            row.last_price_asset = None;
            row.manual_price = false;
            1
        }
        None => 0,
    }
}
