//! Single-flight cache.
//!
//! Each key owns a slot guarded by its own async mutex. Whoever holds the slot
//! lock is the only one computing for that key; everyone else waits on the
//! lock and then reads what was stored. The computation runs on a spawned task
//! that owns the lock guard, so it finishes and fills the slot even if the
//! caller that started it goes away.
//!
//! Filled slots live as long as the cache; there is no eviction. A slot whose
//! first computation fails is removed again when nobody else is waiting on it.

use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tracing::debug;

use crate::clock::{Clock, SystemClock};

/// A computed value and when it was stored. Never mutated after creation.
#[derive(Debug)]
pub struct CachedValue<V> {
    pub value: Arc<V>,
    pub fetched_at: DateTime<Utc>,
}

impl<V> Clone for CachedValue<V> {
    fn clone(&self) -> Self {
        Self {
            value: Arc::clone(&self.value),
            fetched_at: self.fetched_at,
        }
    }
}

type Slot<V> = Arc<Mutex<Option<CachedValue<V>>>>;

pub struct SingleFlightCache<K, V> {
    slots: Mutex<HashMap<K, Slot<V>>>,
    clock: Arc<dyn Clock>,
}

impl<K, V> SingleFlightCache<K, V>
where
    K: Eq + Hash + Clone + Send + 'static,
    V: Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Returns the cached value for `key`, computing it if there is none or if
    /// `bypass` is set. A failed computation leaves the slot as it was.
    pub async fn get_or_compute<F, Fut, E>(
        &self,
        key: K,
        bypass: bool,
        compute: F,
    ) -> Result<CachedValue<V>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>> + Send + 'static,
        E: From<tokio::task::JoinError> + Send + 'static,
    {
        let slot = {
            let mut slots = self.slots.lock().await;
            Arc::clone(slots.entry(key.clone()).or_default())
        };

        let mut guard = Arc::clone(&slot).lock_owned().await;
        if !bypass {
            if let Some(cached) = guard.as_ref() {
                debug!(fetched_at = %cached.fetched_at, "single-flight cache hit");
                return Ok(cached.clone());
            }
        }

        debug!(bypass, "single-flight cache computing");
        let pending = compute();
        let clock = Arc::clone(&self.clock);
        let handle = tokio::spawn(async move {
            let value = pending.await?;
            let cached = CachedValue {
                value: Arc::new(value),
                fetched_at: clock.now(),
            };
            *guard = Some(cached.clone());
            Ok::<_, E>(cached)
        });

        let result = match handle.await {
            Ok(result) => result,
            Err(err) => Err(E::from(err)),
        };
        if result.is_err() {
            self.forget_if_unused(&key, &slot).await;
        }
        result
    }

    /// Drops `slot` from the map if it never got a value and no other caller
    /// holds it. Callers only clone a slot while holding the map lock.
    async fn forget_if_unused(&self, key: &K, slot: &Slot<V>) {
        let mut slots = self.slots.lock().await;
        let unused = match slots.get(key) {
            Some(current) => {
                Arc::ptr_eq(current, slot)
                    && Arc::strong_count(slot) == 2
                    && matches!(slot.try_lock(), Ok(guard) if guard.is_none())
            }
            None => false,
        };
        if unused {
            slots.remove(key);
            debug!("dropped empty single-flight slot after failed computation");
        }
    }

    #[cfg(test)]
    async fn slot_count(&self) -> usize {
        self.slots.lock().await.len()
    }

    /// Current value for `key` without computing. Waits for an in-flight
    /// computation on that key.
    pub async fn cached(&self, key: &K) -> Option<CachedValue<V>> {
        let slot = {
            let slots = self.slots.lock().await;
            slots.get(key).cloned()?
        };
        let guard = slot.lock().await;
        guard.clone()
    }
}

impl<K, V> Default for SingleFlightCache<K, V>
where
    K: Eq + Hash + Clone + Send + 'static,
    V: Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use chrono::TimeZone;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    type TestCache = SingleFlightCache<String, usize>;

    async fn counted(calls: Arc<AtomicUsize>, delay: Duration) -> anyhow::Result<usize> {
        tokio::time::sleep(delay).await;
        Ok(calls.fetch_add(1, Ordering::SeqCst) + 1)
    }

    #[tokio::test]
    async fn concurrent_callers_share_one_computation() -> anyhow::Result<()> {
        let cache = Arc::new(TestCache::new());
        let calls = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let cache = Arc::clone(&cache);
            let calls = Arc::clone(&calls);
            handles.push(tokio::spawn(async move {
                cache
                    .get_or_compute("k".to_string(), false, move || {
                        counted(calls, Duration::from_millis(50))
                    })
                    .await
            }));
        }

        for handle in handles {
            let cached = handle.await??;
            assert_eq!(*cached.value, 1);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        Ok(())
    }

    #[tokio::test]
    async fn bypass_recomputes_and_replaces_entry() -> anyhow::Result<()> {
        let start = Utc.with_ymd_and_hms(2026, 1, 10, 12, 0, 0).unwrap();
        let clock = Arc::new(ManualClock::new(start));
        let cache = TestCache::new().with_clock(clock.clone());
        let calls = Arc::new(AtomicUsize::new(0));

        let first = cache
            .get_or_compute("k".to_string(), false, {
                let calls = Arc::clone(&calls);
                move || counted(calls, Duration::ZERO)
            })
            .await?;
        clock.advance(chrono::Duration::minutes(1));

        let second = cache
            .get_or_compute("k".to_string(), true, {
                let calls = Arc::clone(&calls);
                move || counted(calls, Duration::ZERO)
            })
            .await?;

        assert_eq!(*first.value, 1);
        assert_eq!(*second.value, 2);
        assert_eq!(first.fetched_at, start);
        assert_eq!(second.fetched_at, start + chrono::Duration::minutes(1));

        let stored = cache.cached(&"k".to_string()).await.expect("entry");
        assert_eq!(*stored.value, 2);
        // The earlier handle still sees its own snapshot.
        assert_eq!(*first.value, 1);
        Ok(())
    }

    #[tokio::test]
    async fn distinct_keys_compute_independently() -> anyhow::Result<()> {
        let cache = TestCache::new();
        let calls = Arc::new(AtomicUsize::new(0));

        for key in ["a", "b", "a"] {
            let calls = Arc::clone(&calls);
            cache
                .get_or_compute(key.to_string(), false, move || {
                    counted(calls, Duration::ZERO)
                })
                .await?;
        }

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        Ok(())
    }

    #[tokio::test]
    async fn failed_computation_keeps_previous_value() -> anyhow::Result<()> {
        let cache = TestCache::new();
        cache
            .get_or_compute("k".to_string(), false, || async { Ok::<_, anyhow::Error>(7) })
            .await?;

        let failed = cache
            .get_or_compute("k".to_string(), true, || async {
                Err::<usize, _>(anyhow::anyhow!("remote down"))
            })
            .await;
        assert!(failed.is_err());

        let stored = cache.cached(&"k".to_string()).await.expect("entry");
        assert_eq!(*stored.value, 7);
        assert_eq!(cache.slot_count().await, 1);
        Ok(())
    }

    #[tokio::test]
    async fn failed_first_computation_leaves_no_slot() -> anyhow::Result<()> {
        let cache = TestCache::new();
        for key in ["a", "b", "c"] {
            let failed = cache
                .get_or_compute(key.to_string(), false, || async {
                    Err::<usize, _>(anyhow::anyhow!("remote down"))
                })
                .await;
            assert!(failed.is_err());
        }
        assert_eq!(cache.slot_count().await, 0);

        cache
            .get_or_compute("a".to_string(), false, || async { Ok::<_, anyhow::Error>(1) })
            .await?;
        assert_eq!(cache.slot_count().await, 1);
        Ok(())
    }

    #[tokio::test]
    async fn abandoned_caller_still_fills_the_cache() -> anyhow::Result<()> {
        let cache = Arc::new(TestCache::new());
        let calls = Arc::new(AtomicUsize::new(0));

        let abandoned = {
            let cache = Arc::clone(&cache);
            let calls = Arc::clone(&calls);
            tokio::spawn(async move {
                cache
                    .get_or_compute("k".to_string(), false, move || {
                        counted(calls, Duration::from_millis(100))
                    })
                    .await
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        abandoned.abort();

        let stored = cache.cached(&"k".to_string()).await.expect("entry");
        assert_eq!(*stored.value, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        Ok(())
    }
}
