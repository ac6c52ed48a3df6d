//! Weight-bounded cache with single-flight loading
//!
//! Resident entries live in a `DashMap` and carry a logical access clock used
//! for least-recently-used eviction. Loads in progress are tracked in a
//! separate registry of shared futures so concurrent requests for the same
//! key wait on one loader invocation. Failed loads are handed to every waiter
//! and then forgotten.
//!
//! The registry lock only covers registry bookkeeping. Inserting a finished
//! value, and any eviction that triggers, happen after it is released.
//! A load whose waiters are all dropped before it finishes is abandoned and
//! leaves the registry.

use crate::config::CacheConfig;
use crate::error::CacheResult;
use crate::stats::{AtomicCacheMetrics, CacheStats};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry as StorageEntry;
use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, trace};

/// Computes the weight of an entry
pub type Weigher<K, V> = Arc<dyn Fn(&K, &V) -> u64 + Send + Sync>;

type SharedLoad<V, E> = Shared<BoxFuture<'static, Result<V, E>>>;

type Registry<K, V, E> = Mutex<HashMap<K, InFlight<V, E>>>;

#[derive(Debug)]
struct CacheEntry<V> {
    value: V,
    weight: u64,
    /// Logical clock value of the most recent access
    last_accessed: AtomicU64,
}

/// A load in the registry
struct InFlight<V, E> {
    load: SharedLoad<V, E>,
    /// Callers currently awaiting `load`
    waiters: usize,
    /// Set once a finished waiter has taken over storing the outcome
    settled: bool,
}

/// Withdraws a waiter from its registry entry if it is dropped mid-load
///
/// The last waiter to go removes the entry, which drops the load.
struct WaiterGuard<'a, K: Eq + Hash, V, E> {
    registry: &'a Registry<K, V, E>,
    key: &'a K,
    load: &'a SharedLoad<V, E>,
    armed: bool,
}

impl<K: Eq + Hash, V, E> Drop for WaiterGuard<'_, K, V, E> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }

        let abandoned = {
            let mut registry = self.registry.lock();
            match registry.get_mut(self.key) {
                Some(current) if current.load.ptr_eq(self.load) => {
                    current.waiters -= 1;
                    if current.waiters == 0 {
                        registry.remove(self.key)
                    } else {
                        None
                    }
                }
                _ => None,
            }
        };

        if abandoned.is_some() {
            trace!("Abandoned load with no remaining waiters");
        }
    }
}

/// Concurrent cache bounded by total entry weight
///
/// `get_or_load` guarantees at most one loader invocation per key at a time.
/// Values must be cheap to clone (`Bytes`, `Arc<_>`), since every waiter
/// receives its own clone.
pub struct BoundedCache<K, V, E> {
    storage: DashMap<K, CacheEntry<V>>,
    in_flight: Registry<K, V, E>,
    eviction_lock: Mutex<()>,
    weigher: Weigher<K, V>,
    config: CacheConfig,
    total_weight: AtomicU64,
    clock: AtomicU64,
    metrics: AtomicCacheMetrics,
}

impl<K: Eq + Hash, V, E> std::fmt::Debug for BoundedCache<K, V, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoundedCache")
            .field("config", &self.config)
            .field("entries", &self.storage.len())
            .field("weight", &self.total_weight.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl<K, V, E> BoundedCache<K, V, E>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    /// Create a cache with the given configuration and weigher
    pub fn new<W>(config: CacheConfig, weigher: W) -> CacheResult<Self>
    where
        W: Fn(&K, &V) -> u64 + Send + Sync + 'static,
    {
        config.validate()?;

        Ok(Self {
            storage: DashMap::new(),
            in_flight: Mutex::new(HashMap::new()),
            eviction_lock: Mutex::new(()),
            weigher: Arc::new(weigher),
            config,
            total_weight: AtomicU64::new(0),
            clock: AtomicU64::new(0),
            metrics: AtomicCacheMetrics::new(),
        })
    }

    /// Return the resident value for `key`, loading it on a miss
    ///
    /// If a load for `key` is already running, this waits for it instead of
    /// calling `loader`. Every waiter observes the same outcome. Successful
    /// values become resident (subject to the weight ceiling); failures are
    /// not cached, so the next call after a failure starts a fresh load.
    ///
    /// Dropping the returned future withdraws this caller. When every caller
    /// waiting on a load has been dropped, the load is dropped too and the
    /// next request starts over.
    ///
    /// `loader` is invoked while the in-flight registry is locked and must
    /// only construct the future, not do blocking work.
    pub async fn get_or_load<F, Fut>(&self, key: K, loader: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>> + Send + 'static,
    {
        if let Some(value) = self.touch(&key) {
            self.metrics.record_get(true);
            return Ok(value);
        }
        self.metrics.record_get(false);

        let shared = {
            let mut in_flight = self.in_flight.lock();

            // A load may have completed between the first check and the lock
            if let Some(value) = self.touch(&key) {
                return Ok(value);
            }

            match in_flight.entry(key.clone()) {
                Entry::Occupied(mut existing) => {
                    trace!("Joining in-flight load");
                    let current = existing.get_mut();
                    current.waiters += 1;
                    current.load.clone()
                }
                Entry::Vacant(slot) => {
                    self.metrics.record_load();
                    let load = loader().boxed().shared();
                    slot.insert(InFlight {
                        load: load.clone(),
                        waiters: 1,
                        settled: false,
                    });
                    load
                }
            }
        };

        let mut guard = WaiterGuard {
            registry: &self.in_flight,
            key: &key,
            load: &shared,
            armed: true,
        };
        let result = shared.clone().await;
        guard.armed = false;
        drop(guard);

        // The first waiter to finish stores the outcome, then retires the
        // registry entry; callers arriving in between join the finished load
        let claimed = {
            let mut in_flight = self.in_flight.lock();
            match in_flight.get_mut(&key) {
                Some(current) if current.load.ptr_eq(&shared) && !current.settled => {
                    current.settled = true;
                    true
                }
                _ => false,
            }
        };

        if claimed {
            match &result {
                Ok(value) => self.insert(key.clone(), value.clone()),
                Err(_) => self.metrics.record_load_failure(),
            }

            let mut in_flight = self.in_flight.lock();
            if in_flight
                .get(&key)
                .is_some_and(|current| current.load.ptr_eq(&shared))
            {
                in_flight.remove(&key);
            }
        }

        result
    }

    /// Return the resident value for `key` without loading
    pub fn get(&self, key: &K) -> Option<V> {
        let value = self.touch(key);
        self.metrics.record_get(value.is_some());
        value
    }

    /// Insert a value directly, bypassing the loader
    ///
    /// Entries heavier than the ceiling are not retained.
    pub fn insert(&self, key: K, value: V) {
        let weight = (self.weigher)(&key, &value);
        if weight > self.config.max_weight {
            trace!(
                weight,
                max_weight = self.config.max_weight,
                "Entry exceeds cache ceiling, not retained"
            );
            return;
        }

        let entry = CacheEntry {
            value,
            weight,
            last_accessed: AtomicU64::new(self.tick()),
        };

        // Weight is adjusted while the shard guard is held
        match self.storage.entry(key) {
            StorageEntry::Occupied(mut occupied) => {
                let previous = occupied.insert(entry);
                if weight >= previous.weight {
                    self.total_weight
                        .fetch_add(weight - previous.weight, Ordering::Relaxed);
                } else {
                    self.total_weight
                        .fetch_sub(previous.weight - weight, Ordering::Relaxed);
                }
            }
            StorageEntry::Vacant(vacant) => {
                let _slot = vacant.insert(entry);
                self.total_weight.fetch_add(weight, Ordering::Relaxed);
            }
        }

        if self.total_weight.load(Ordering::Relaxed) > self.config.max_weight {
            self.evict();
        }
    }

    /// Remove a resident entry
    pub fn invalidate(&self, key: &K) -> bool {
        self.storage
            .remove_if(key, |_, entry| {
                self.total_weight.fetch_sub(entry.weight, Ordering::Relaxed);
                true
            })
            .is_some()
    }

    /// Remove all resident entries
    ///
    /// Loads already in flight still complete and become resident.
    pub fn clear(&self) {
        let _guard = self.eviction_lock.lock();
        self.storage.retain(|_, entry| {
            self.total_weight.fetch_sub(entry.weight, Ordering::Relaxed);
            false
        });
    }

    /// Check whether `key` is resident
    pub fn contains_key(&self, key: &K) -> bool {
        self.storage.contains_key(key)
    }

    /// Number of resident entries
    pub fn len(&self) -> usize {
        self.storage.len()
    }

    /// Check if no entries are resident
    pub fn is_empty(&self) -> bool {
        self.storage.is_empty()
    }

    /// Total weight of resident entries
    pub fn weight(&self) -> u64 {
        self.total_weight.load(Ordering::Relaxed)
    }

    /// Number of loads currently in flight
    pub fn in_flight_count(&self) -> usize {
        self.in_flight.lock().len()
    }

    /// Cache configuration
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Snapshot of the cache statistics
    pub fn stats(&self) -> CacheStats {
        self.metrics
            .snapshot(self.storage.len() as u64, self.weight())
    }

    /// Zero the hit, miss, load and eviction counters
    ///
    /// Resident entries and their weight are unaffected.
    pub fn reset_stats(&self) {
        self.metrics.reset();
    }

    fn tick(&self) -> u64 {
        self.clock.fetch_add(1, Ordering::Relaxed)
    }

    fn touch(&self, key: &K) -> Option<V> {
        self.storage.get(key).map(|entry| {
            entry.last_accessed.store(self.tick(), Ordering::Relaxed);
            entry.value.clone()
        })
    }

    /// Drop least recently used entries until the weight reaches the target
    fn evict(&self) {
        let _guard = self.eviction_lock.lock();

        let target = self.config.eviction_target();
        if self.weight() <= self.config.max_weight {
            return;
        }

        let mut candidates: Vec<(K, u64)> = self
            .storage
            .iter()
            .map(|entry| {
                (
                    entry.key().clone(),
                    entry.value().last_accessed.load(Ordering::Relaxed),
                )
            })
            .collect();

        // Oldest first
        candidates.sort_by_key(|(_, last_accessed)| *last_accessed);

        let mut evicted = 0usize;
        for (key, seen) in candidates {
            if self.weight() <= target {
                break;
            }
            // Entries touched or replaced since the snapshot stay
            let removed = self.storage.remove_if(&key, |_, entry| {
                let stale = entry.last_accessed.load(Ordering::Relaxed) == seen;
                if stale {
                    self.total_weight.fetch_sub(entry.weight, Ordering::Relaxed);
                }
                stale
            });
            if let Some((_, entry)) = removed {
                self.metrics.record_eviction(entry.weight);
                evicted += 1;
            }
        }

        debug!(
            evicted,
            weight = self.weight(),
            target,
            "Evicted cache entries"
        );
    }
}
