use std::collections::{BTreeMap, HashSet};

use crate::models::{Address, HoldingRecord, ValuationResult};

/// Anything carrying an NFT identifier.
pub trait NftIdentified {
    fn nft_id(&self) -> &str;
}

impl NftIdentified for HoldingRecord {
    fn nft_id(&self) -> &str {
        &self.identifier
    }
}

impl NftIdentified for ValuationResult {
    fn nft_id(&self) -> &str {
        &self.id
    }
}

/// Returns a copy of `items` without ignored identifiers.
///
/// Works on a copy so cached fetch results stay intact: ignoring an NFT has
/// nothing to do with how fresh the remote data is. Addresses left with no
/// items keep an empty list.
pub fn filter_ignored<T>(
    items: &BTreeMap<Address, Vec<T>>,
    ignored: &HashSet<String>,
) -> BTreeMap<Address, Vec<T>>
where
    T: NftIdentified + Clone,
{
    items
        .iter()
        .map(|(address, entries)| {
            let kept = entries
                .iter()
                .filter(|entry| !ignored.contains(entry.nft_id()))
                .cloned()
                .collect();
            (address.clone(), kept)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(n: u8) -> Address {
        Address::parse(format!("0x{:040x}", n)).unwrap()
    }

    #[test]
    fn removes_ignored_and_keeps_order() {
        let a = addr(1);
        let b = addr(2);
        let mut items = BTreeMap::new();
        items.insert(
            a.clone(),
            vec![
                HoldingRecord::new("1", a.clone()),
                HoldingRecord::new("z", a.clone()),
                HoldingRecord::new("3", a.clone()),
            ],
        );
        items.insert(b.clone(), vec![HoldingRecord::new("z2", b.clone())]);
        let ignored: HashSet<String> = ["z".to_string(), "z2".to_string()].into();

        let filtered = filter_ignored(&items, &ignored);

        let ids: Vec<_> = filtered[&a].iter().map(|h| h.identifier.as_str()).collect();
        assert_eq!(ids, vec!["1", "3"]);
        assert!(filtered[&b].is_empty());
        // Input untouched.
        assert_eq!(items[&a].len(), 3);
    }
}
