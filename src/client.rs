//! # Query Client
//!
//! The client owns the shared [`QueryCache`] and runs queries against it. Hooks
//! and plain async code use the same operations:
//!
//! - [`QueryClient::ensure`]: serve fresh cached data, or run (or join) the fetch
//! - [`QueryClient::refetch`]: always run (or join) the fetch
//! - [`QueryClient::subscribe`]: observe every state change of a key
//! - [`QueryClient::invalidate`]: mark a key stale and refetch it if it is observed
//!
//! A fetch is driven by whoever awaits it. If every awaiting task is dropped
//! the fetch is parked, and the next caller of the key resumes it.
//!
//! ```rust,no_run
//! use dioxus_clinic_queries::{client::QueryClient, query::NamedQuery};
//!
//! # async fn run() {
//! let client = QueryClient::new();
//! let query = NamedQuery::new("greeting", || async { Ok::<_, String>("hello".to_string()) });
//! let greeting = client.ensure(&query).await;
//! assert_eq!(greeting.as_deref(), Ok("hello"));
//! # }
//! ```

use std::sync::Arc;

use futures::FutureExt;
use tokio::sync::watch;
use tracing::debug;

use crate::{
    cache::{CacheStats, Fetcher, QueryCache, QuerySlot},
    config::QueryClientConfig,
    query::Query,
    query_state::QueryState,
};

/// Shared query cache plus the settings applied to every query in it
#[derive(Clone, Default)]
pub struct QueryClient {
    cache: QueryCache,
    config: QueryClientConfig,
}

impl QueryClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: QueryClientConfig) -> Self {
        Self {
            cache: QueryCache::new(),
            config,
        }
    }

    pub fn config(&self) -> &QueryClientConfig {
        &self.config
    }

    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }

    /// Get the key's slot and make `query` its current fetch function
    fn register<Q: Query>(
        &self,
        query: &Q,
    ) -> (Arc<QuerySlot<Q::Output, Q::Error>>, Fetcher<Q::Output, Q::Error>) {
        let slot = self.cache.slot::<Q::Output, Q::Error>(&query.key());
        let query = query.clone();
        let fetcher: Fetcher<Q::Output, Q::Error> = Arc::new(move || {
            let query = query.clone();
            async move { query.fetch().await }.boxed()
        });
        slot.set_fetcher(fetcher.clone());
        (slot, fetcher)
    }

    /// Observe the query's state; the receiver starts at the current state
    pub fn subscribe<Q: Query>(&self, query: &Q) -> watch::Receiver<QueryState<Q::Output, Q::Error>> {
        let (slot, _) = self.register(query);
        slot.subscribe()
    }

    /// Snapshot of the cached state, `None` if the key was never used
    pub fn state<Q: Query>(&self, query: &Q) -> Option<QueryState<Q::Output, Q::Error>> {
        self.cache
            .get::<Q::Output, Q::Error>(query.key().as_str())
            .map(|slot| slot.current())
    }

    /// Return cached data if it is still fresh, otherwise fetch it.
    ///
    /// Observers keep seeing stale data while it is revalidated. A key in the
    /// error state has no data and is always fetched again.
    pub async fn ensure<Q: Query>(&self, query: &Q) -> Result<Q::Output, Q::Error> {
        let (slot, fetcher) = self.register(query);
        if let QueryState::Success(data) = slot.current() {
            if !slot.is_stale(self.config.stale_time) {
                debug!("[QUERY-CACHE] Cache hit for key: {}", slot.key());
                return Ok(data);
            }
            debug!(
                "[QUERY-SWR] Data is stale for key: {} - revalidating",
                slot.key()
            );
        }
        slot.start_fetch(&fetcher).await
    }

    /// Run the fetch again, joining it if one is already pending
    pub async fn refetch<Q: Query>(&self, query: &Q) -> Result<Q::Output, Q::Error> {
        let (slot, fetcher) = self.register(query);
        debug!("[QUERY-REFETCH] Refetch requested for key: {}", slot.key());
        slot.start_fetch(&fetcher).await
    }

    /// Mark a key stale.
    ///
    /// If any observer is subscribed to the key it is refetched right away,
    /// otherwise the next [`QueryClient::ensure`] fetches it. A fetch already
    /// pending is superseded by the new one, so observers never settle on a
    /// result requested before the invalidation.
    pub async fn invalidate(&self, key: &str) {
        let Some(slot) = self.cache.get_erased(key) else {
            return;
        };
        slot.mark_stale();
        debug!("[QUERY-INVALIDATE] Invalidated cache entry for key: {}", key);

        if slot.observer_count() > 0 {
            if let Some(revalidation) = slot.revalidate() {
                revalidation.await;
            }
        }
    }

    pub fn remove(&self, key: &str) -> bool {
        self.cache.remove(key)
    }

    /// Drop every entry; used at shutdown and between tests
    pub fn clear(&self) {
        self.cache.clear();
    }

    pub fn stats(&self) -> CacheStats {
        self.cache.stats()
    }
}
