use std::collections::HashSet;

use crate::models::{Address, LpHandling, PersistedPriceRecord};

/// How the user's ignored NFTs take part in a query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum IgnoredHandling {
    #[default]
    None,
    Exclude(HashSet<String>),
    ShowOnly(HashSet<String>),
}

/// Predicate plus pagination over stored NFT rows. Rows come back ordered by
/// identifier.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NftFilterQuery {
    pub identifier: Option<String>,
    pub owner_addresses: Option<Vec<Address>>,
    /// Case-insensitive substring of the NFT name.
    pub name: Option<String>,
    /// Case-insensitive substring of the collection name.
    pub collection_name: Option<String>,
    pub lp_handling: LpHandling,
    pub priced_only: bool,
    /// Only rows whose price was set by the user.
    pub manual_only: bool,
    pub ignored: IgnoredHandling,
    pub limit: Option<usize>,
    pub offset: usize,
}

impl NftFilterQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_identifier(mut self, identifier: impl Into<String>) -> Self {
        self.identifier = Some(identifier.into());
        self
    }

    pub fn with_owners(mut self, owners: Vec<Address>) -> Self {
        self.owner_addresses = Some(owners);
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_collection_name(mut self, collection_name: impl Into<String>) -> Self {
        self.collection_name = Some(collection_name.into());
        self
    }

    pub fn with_lp_handling(mut self, lp_handling: LpHandling) -> Self {
        self.lp_handling = lp_handling;
        self
    }

    pub fn priced_only(mut self) -> Self {
        self.priced_only = true;
        self
    }

    pub fn manual_only(mut self) -> Self {
        self.manual_only = true;
        self
    }

    pub fn with_ignored(mut self, ignored: IgnoredHandling) -> Self {
        self.ignored = ignored;
        self
    }

    pub fn with_pagination(mut self, limit: usize, offset: usize) -> Self {
        self.limit = Some(limit);
        self.offset = offset;
        self
    }

    pub fn matches(&self, row: &PersistedPriceRecord) -> bool {
        if let Some(identifier) = &self.identifier {
            if &row.identifier != identifier {
                return false;
            }
        }
        if let Some(owners) = &self.owner_addresses {
            if !owners.contains(&row.owner_address) {
                return false;
            }
        }
        if !contains_ci(row.name.as_deref(), self.name.as_deref()) {
            return false;
        }
        if !contains_ci(row.collection_name.as_deref(), self.collection_name.as_deref()) {
            return false;
        }
        if !self.lp_handling.admits(row.is_lp) {
            return false;
        }
        if self.priced_only && !row.has_price() {
            return false;
        }
        if self.manual_only && !row.manual_price {
            return false;
        }
        match &self.ignored {
            IgnoredHandling::None => true,
            IgnoredHandling::Exclude(ignored) => !ignored.contains(&row.identifier),
            IgnoredHandling::ShowOnly(ignored) => ignored.contains(&row.identifier),
        }
    }

    /// Applies offset and limit to rows that already match.
    pub fn paginate<'a, I>(&self, rows: I) -> Vec<PersistedPriceRecord>
    where
        I: Iterator<Item = &'a PersistedPriceRecord>,
    {
        let rows = rows.skip(self.offset);
        match self.limit {
            Some(limit) => rows.take(limit).cloned().collect(),
            None => rows.cloned().collect(),
        }
    }
}

fn contains_ci(haystack: Option<&str>, needle: Option<&str>) -> bool {
    match needle {
        None => true,
        Some(needle) => haystack
            .map(|h| h.to_lowercase().contains(&needle.to_lowercase()))
            .unwrap_or(false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn addr(n: u8) -> Address {
        Address::parse(format!("0x{:040x}", n)).unwrap()
    }

    fn row(id: &str, owner: u8, name: &str, is_lp: bool) -> PersistedPriceRecord {
        let mut row = PersistedPriceRecord::bare(id, addr(owner));
        row.name = Some(name.to_string());
        row.is_lp = is_lp;
        row
    }

    #[test]
    fn matches_combines_all_conditions() {
        let query = NftFilterQuery::new()
            .with_owners(vec![addr(1)])
            .with_name("ape")
            .with_lp_handling(LpHandling::ExcludeLps);

        assert!(query.matches(&row("a", 1, "Bored Ape #1", false)));
        assert!(!query.matches(&row("b", 2, "Bored Ape #2", false)));
        assert!(!query.matches(&row("c", 1, "Bored Ape #3", true)));
        assert!(!query.matches(&row("d", 1, "Punk", false)));
    }

    #[test]
    fn priced_only_and_ignored() {
        let mut priced = row("p", 1, "P", false);
        priced.last_price = Some(Decimal::ONE);
        let unpriced = row("u", 1, "U", false);

        assert!(NftFilterQuery::new().priced_only().matches(&priced));
        assert!(!NftFilterQuery::new().priced_only().matches(&unpriced));

        let ignored: HashSet<String> = ["p".to_string()].into();
        let exclude =
            NftFilterQuery::new().with_ignored(IgnoredHandling::Exclude(ignored.clone()));
        let only = NftFilterQuery::new().with_ignored(IgnoredHandling::ShowOnly(ignored));
        assert!(!exclude.matches(&priced));
        assert!(exclude.matches(&unpriced));
        assert!(only.matches(&priced));
        assert!(!only.matches(&unpriced));
    }

    #[test]
    fn manual_only_skips_provider_prices() {
        let mut provider = row("p", 1, "P", false);
        provider.last_price = Some(Decimal::ONE);
        let mut manual = provider.clone();
        manual.identifier = "m".to_string();
        manual.manual_price = true;

        let query = NftFilterQuery::new().priced_only().manual_only();
        assert!(query.matches(&manual));
        assert!(!query.matches(&provider));
    }

    #[test]
    fn paginate_skips_then_takes() {
        let rows: Vec<_> = (0..5).map(|i| row(&i.to_string(), 1, "n", false)).collect();
        let page = NftFilterQuery::new().with_pagination(2, 1).paginate(rows.iter());
        let ids: Vec<_> = page.iter().map(|r| r.identifier.as_str()).collect();
        assert_eq!(ids, vec!["1", "2"]);
    }
}
