//! # Query Cache
//!
//! This module implements the shared, type-erased cache behind the query client:
//! - **Observable state**: every key owns a `watch` channel carrying its [`QueryState`].
//! - **Single flight**: a pending fetch is stored as a [`Shared`] future, so every
//!   caller of a pending key awaits the same fetch.
//! - **Staleness**: successful results are timestamped; invalidation marks them stale.
//! - **Stats**: entry, observer and fetch counts for introspection.
//!
//! Entries are created on first use of a key and live until they are removed or
//! the cache is cleared. There is no eviction.

use std::{
    any::Any,
    collections::HashMap,
    sync::{
        Arc, Mutex, MutexGuard, PoisonError,
        atomic::{AtomicU32, AtomicU64, Ordering},
    },
    time::Duration,
};

use futures::{
    FutureExt,
    future::{BoxFuture, Shared},
};
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::{query::QueryKey, query_state::QueryState};

// Platform-specific time imports
#[cfg(not(target_family = "wasm"))]
use std::time::Instant;
#[cfg(target_family = "wasm")]
use web_time::Instant;

/// A fetch that every caller of a pending key awaits together
pub type SharedFetch<T, E> = Shared<BoxFuture<'static, Result<T, E>>>;

/// The registered fetch function of a key
pub type Fetcher<T, E> = Arc<dyn Fn() -> BoxFuture<'static, Result<T, E>> + Send + Sync>;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Cache entry for one key, typed by the query's output and error
pub struct QuerySlot<T, E> {
    key: QueryKey,
    state: watch::Sender<QueryState<T, E>>,
    in_flight: Mutex<Option<SharedFetch<T, E>>>,
    fetcher: Mutex<Option<Fetcher<T, E>>>,
    updated_at: Mutex<Option<Instant>>,
    fetch_count: AtomicU32,
    // Only the latest started fetch may settle the state
    generation: AtomicU64,
}

impl<T, E> QuerySlot<T, E>
where
    T: Clone + PartialEq + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    fn new(key: QueryKey) -> Self {
        let (state, _) = watch::channel(QueryState::Loading);
        Self {
            key,
            state,
            in_flight: Mutex::new(None),
            fetcher: Mutex::new(None),
            updated_at: Mutex::new(None),
            fetch_count: AtomicU32::new(0),
            generation: AtomicU64::new(0),
        }
    }

    pub fn key(&self) -> &QueryKey {
        &self.key
    }

    /// Snapshot of the current state
    pub fn current(&self) -> QueryState<T, E> {
        self.state.borrow().clone()
    }

    /// Observe every state change of this key
    pub fn subscribe(&self) -> watch::Receiver<QueryState<T, E>> {
        self.state.subscribe()
    }

    /// Replace the fetch function used by invalidation-driven refetches
    pub fn set_fetcher(&self, fetcher: Fetcher<T, E>) {
        *lock(&self.fetcher) = Some(fetcher);
    }

    /// Whether successful data should be revalidated before being trusted
    ///
    /// Data without a timestamp has been invalidated and is always stale.
    pub fn is_stale(&self, stale_time: Option<Duration>) -> bool {
        match *lock(&self.updated_at) {
            None => true,
            Some(updated_at) => stale_time.is_some_and(|stale| updated_at.elapsed() > stale),
        }
    }

    /// Number of times a fetch has been started for this key
    pub fn fetch_count(&self) -> u32 {
        self.fetch_count.load(Ordering::SeqCst)
    }

    /// Start a fetch, or join the one already pending for this key
    pub fn start_fetch(self: &Arc<Self>, fetcher: &Fetcher<T, E>) -> SharedFetch<T, E> {
        let mut in_flight = lock(&self.in_flight);
        if let Some(pending) = in_flight.as_ref() {
            debug!("[QUERY-FETCH] Joining pending fetch for key: {}", self.key);
            return pending.clone();
        }
        self.launch(&mut in_flight, fetcher)
    }

    /// Start a new fetch even if one is pending.
    ///
    /// Callers already awaiting the pending fetch still get its result, but only
    /// the new fetch updates the state.
    pub fn restart_fetch(self: &Arc<Self>, fetcher: &Fetcher<T, E>) -> SharedFetch<T, E> {
        let mut in_flight = lock(&self.in_flight);
        if in_flight.take().is_some() {
            debug!("[QUERY-FETCH] Superseding pending fetch for key: {}", self.key);
        }
        self.launch(&mut in_flight, fetcher)
    }

    fn launch(
        self: &Arc<Self>,
        in_flight: &mut Option<SharedFetch<T, E>>,
        fetcher: &Fetcher<T, E>,
    ) -> SharedFetch<T, E> {
        self.fetch_count.fetch_add(1, Ordering::SeqCst);
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        // An errored query has no data to keep showing; go back to loading
        self.state.send_if_modified(|state| {
            if state.is_error() {
                *state = QueryState::Loading;
                true
            } else {
                false
            }
        });
        debug!("[QUERY-FETCH] Starting fetch for key: {}", self.key);

        let slot = Arc::clone(self);
        let fetch = fetcher();
        let shared = async move {
            let result = fetch.await;
            slot.settle(generation, &result);
            result
        }
        .boxed()
        .shared();

        *in_flight = Some(shared.clone());
        shared
    }

    fn settle(&self, generation: u64, result: &Result<T, E>) {
        {
            let mut in_flight = lock(&self.in_flight);
            if self.generation.load(Ordering::SeqCst) != generation {
                debug!("[QUERY-FETCH] Discarding superseded result for key: {}", self.key);
                return;
            }
            in_flight.take();
        }
        match result {
            Ok(data) => {
                *lock(&self.updated_at) = Some(Instant::now());
                let changed = self.state.send_if_modified(|state| {
                    if state.data() == Some(data) {
                        false
                    } else {
                        *state = QueryState::Success(data.clone());
                        true
                    }
                });
                if changed {
                    debug!("[QUERY-CACHE] Stored data for key: {}", self.key);
                } else {
                    debug!(
                        "[QUERY-CACHE] Value unchanged for key: {}, refreshing timestamp",
                        self.key
                    );
                }
            }
            Err(error) => {
                self.state.send_replace(QueryState::Error(error.clone()));
                debug!("[QUERY-FETCH] Fetch failed for key: {}", self.key);
            }
        }
    }
}

/// The key-agnostic view of a [`QuerySlot`] the cache works with
pub trait ErasedSlot: Send + Sync {
    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;

    /// Live `watch` receivers, one per mounted hook
    fn observer_count(&self) -> usize;

    fn fetch_count(&self) -> u32;

    fn is_fetching(&self) -> bool;

    fn has_data(&self) -> bool;

    /// Drop the freshness timestamp so the next `ensure` refetches
    fn mark_stale(&self);

    /// Refetch with the registered fetch function, if there is one.
    ///
    /// A pending fetch is superseded, since it may predate the invalidation.
    fn revalidate(self: Arc<Self>) -> Option<BoxFuture<'static, ()>>;

    /// Forget the pending fetch, if any
    fn reset(&self);
}

impl<T, E> ErasedSlot for QuerySlot<T, E>
where
    T: Clone + PartialEq + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }

    fn observer_count(&self) -> usize {
        self.state.receiver_count()
    }

    fn fetch_count(&self) -> u32 {
        QuerySlot::fetch_count(self)
    }

    fn is_fetching(&self) -> bool {
        lock(&self.in_flight).is_some()
    }

    fn has_data(&self) -> bool {
        self.state.borrow().is_success()
    }

    fn mark_stale(&self) {
        lock(&self.updated_at).take();
    }

    fn revalidate(self: Arc<Self>) -> Option<BoxFuture<'static, ()>> {
        let fetcher = lock(&self.fetcher).clone()?;
        Some(self.restart_fetch(&fetcher).map(|_| ()).boxed())
    }

    fn reset(&self) {
        lock(&self.in_flight).take();
    }
}

/// Shared cache of query slots, keyed by [`QueryKey`]
#[derive(Clone, Default)]
pub struct QueryCache {
    entries: Arc<Mutex<HashMap<QueryKey, Arc<dyn ErasedSlot>>>>,
}

impl QueryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the typed slot for a key, creating it on first use.
    ///
    /// A key reused with different output or error types gets a fresh slot;
    /// the old entry is dropped.
    pub fn slot<T, E>(&self, key: &QueryKey) -> Arc<QuerySlot<T, E>>
    where
        T: Clone + PartialEq + Send + Sync + 'static,
        E: Clone + Send + Sync + 'static,
    {
        let mut entries = lock(&self.entries);
        if let Some(existing) = entries.get(key) {
            match Arc::clone(existing).into_any().downcast::<QuerySlot<T, E>>() {
                Ok(slot) => return slot,
                Err(_) => warn!(
                    "[QUERY-CACHE] Key {} reused with different types, replacing entry",
                    key
                ),
            }
        }

        let slot = Arc::new(QuerySlot::<T, E>::new(key.clone()));
        entries.insert(key.clone(), slot.clone());
        debug!("[QUERY-CACHE] Created entry for key: {}", key);
        slot
    }

    /// Lookup without creating an entry
    pub fn get<T, E>(&self, key: &str) -> Option<Arc<QuerySlot<T, E>>>
    where
        T: Clone + PartialEq + Send + Sync + 'static,
        E: Clone + Send + Sync + 'static,
    {
        let erased = self.get_erased(key)?;
        erased.into_any().downcast::<QuerySlot<T, E>>().ok()
    }

    pub fn get_erased(&self, key: &str) -> Option<Arc<dyn ErasedSlot>> {
        lock(&self.entries).get(key).cloned()
    }

    pub fn contains(&self, key: &str) -> bool {
        lock(&self.entries).contains_key(key)
    }

    /// Removes an entry by key.
    ///
    /// Live observers keep their last state but receive no further updates.
    pub fn remove(&self, key: &str) -> bool {
        let removed = lock(&self.entries).remove(key);
        match removed {
            Some(slot) => {
                slot.reset();
                debug!("[QUERY-CACHE] Removed entry for key: {}", key);
                true
            }
            None => false,
        }
    }

    /// Clears all entries
    pub fn clear(&self) {
        let drained: Vec<_> = lock(&self.entries).drain().collect();
        for (_, slot) in &drained {
            slot.reset();
        }
        debug!("[QUERY-CACHE] Cleared {} cache entries", drained.len());
    }

    pub fn size(&self) -> usize {
        lock(&self.entries).len()
    }

    pub fn keys(&self) -> Vec<QueryKey> {
        let mut keys: Vec<_> = lock(&self.entries).keys().cloned().collect();
        keys.sort();
        keys
    }

    pub fn stats(&self) -> CacheStats {
        let entries = lock(&self.entries);
        let mut stats = CacheStats {
            entry_count: entries.len(),
            ..CacheStats::default()
        };
        for slot in entries.values() {
            stats.total_observers += slot.observer_count();
            stats.total_fetches += slot.fetch_count();
            if slot.is_fetching() {
                stats.fetching_count += 1;
            }
            if slot.has_data() {
                stats.with_data_count += 1;
            }
        }
        stats
    }
}

/// General cache statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub entry_count: usize,
    pub with_data_count: usize,
    pub fetching_count: usize,
    pub total_observers: usize,
    pub total_fetches: u32,
}
