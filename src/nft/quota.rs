//! Result-volume cap for the free tier.
//!
//! Addresses are visited in caller order and each one keeps a prefix of its
//! provider-ordered holdings until the running total reaches the limit. Once
//! the limit is reached nothing after it is kept, or even queried.

use crate::models::Address;

/// Number of NFTs a free-tier user sees across all addresses.
pub const FREE_NFT_LIMIT: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    Premium,
    Free { limit: usize },
}

impl Tier {
    pub fn free() -> Self {
        Tier::Free {
            limit: FREE_NFT_LIMIT,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct QuotaLimiter {
    tier: Tier,
}

impl QuotaLimiter {
    pub fn new(tier: Tier) -> Self {
        Self { tier }
    }

    pub fn tier(&self) -> Tier {
        self.tier
    }

    /// Limit reported to callers. Premium users are not limited, but callers
    /// still get the free-tier figure for display.
    pub fn entries_limit(&self) -> usize {
        match self.tier {
            Tier::Premium => FREE_NFT_LIMIT,
            Tier::Free { limit } => limit,
        }
    }

    pub fn tracker(&self) -> QuotaTracker {
        QuotaTracker {
            limit: match self.tier {
                Tier::Premium => None,
                Tier::Free { limit } => Some(limit),
            },
            used: 0,
        }
    }

    /// Retained item count per address for the given available counts.
    ///
    /// Addresses with nothing to retain are left out. Iteration stops at the
    /// first address reached after the quota is used up.
    pub fn plan(&self, counts: &[(Address, usize)]) -> Vec<(Address, usize)> {
        let mut tracker = self.tracker();
        let mut retained = Vec::new();
        for (address, available) in counts {
            if tracker.is_exhausted() {
                break;
            }
            let keep = tracker.admit(*available);
            if keep > 0 {
                retained.push((address.clone(), keep));
            }
        }
        retained
    }
}

/// Running total for one pass over an ordered address list.
#[derive(Debug, Clone)]
pub struct QuotaTracker {
    limit: Option<usize>,
    used: usize,
}

impl QuotaTracker {
    pub fn is_exhausted(&self) -> bool {
        matches!(self.limit, Some(limit) if self.used >= limit)
    }

    pub fn remaining(&self) -> Option<usize> {
        self.limit.map(|limit| limit.saturating_sub(self.used))
    }

    /// Records `available` items for the next address and returns how many of
    /// them to keep.
    pub fn admit(&mut self, available: usize) -> usize {
        let keep = match self.remaining() {
            Some(remaining) => available.min(remaining),
            None => available,
        };
        self.used += keep;
        keep
    }

    pub fn used(&self) -> usize {
        self.used
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(n: u8) -> Address {
        Address::parse(format!("0x{:040x}", n)).unwrap()
    }

    #[test]
    fn free_tier_splits_limit_in_order() {
        let limiter = QuotaLimiter::new(Tier::Free { limit: 10 });
        let plan = limiter.plan(&[(addr(1), 7), (addr(2), 6)]);
        assert_eq!(plan, vec![(addr(1), 7), (addr(2), 3)]);
    }

    #[test]
    fn premium_keeps_everything() {
        let limiter = QuotaLimiter::new(Tier::Premium);
        let plan = limiter.plan(&[(addr(1), 70), (addr(2), 60)]);
        assert_eq!(plan, vec![(addr(1), 70), (addr(2), 60)]);
        assert_eq!(limiter.entries_limit(), FREE_NFT_LIMIT);
    }

    #[test]
    fn empty_addresses_are_skipped_without_stopping() {
        let limiter = QuotaLimiter::new(Tier::Free { limit: 10 });
        let plan = limiter.plan(&[(addr(1), 0), (addr(2), 4), (addr(3), 0), (addr(4), 4)]);
        assert_eq!(plan, vec![(addr(2), 4), (addr(4), 4)]);
    }

    #[test]
    fn addresses_after_exhaustion_get_nothing() {
        let limiter = QuotaLimiter::new(Tier::Free { limit: 5 });
        let plan = limiter.plan(&[(addr(1), 5), (addr(2), 3), (addr(3), 9)]);
        assert_eq!(plan, vec![(addr(1), 5)]);
    }

    #[test]
    fn retained_total_never_exceeds_limit() {
        for limit in 0..15 {
            let limiter = QuotaLimiter::new(Tier::Free { limit });
            let counts = vec![(addr(1), 3), (addr(2), 0), (addr(3), 5), (addr(4), 4)];
            let available: usize = counts.iter().map(|(_, n)| n).sum();
            let total: usize = limiter.plan(&counts).iter().map(|(_, n)| n).sum();
            assert!(total <= limit);
            if available >= limit {
                assert_eq!(total, limit, "limit {limit}");
            } else {
                assert_eq!(total, available);
            }
        }
    }

    #[test]
    fn tracker_reports_exhaustion() {
        let mut tracker = QuotaLimiter::new(Tier::Free { limit: 3 }).tracker();
        assert!(!tracker.is_exhausted());
        assert_eq!(tracker.admit(2), 2);
        assert_eq!(tracker.remaining(), Some(1));
        assert_eq!(tracker.admit(5), 1);
        assert!(tracker.is_exhausted());
        assert_eq!(tracker.used(), 3);
    }
}
