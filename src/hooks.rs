//! # Query Hooks
//!
//! This module provides the Dioxus hooks for consuming named queries.
//!
//! ## Key Features
//!
//! - **One generic hook**: [`use_query`] binds any [`Query`] to a component
//! - **Shared cache**: every hook instance of a key reads the same entry
//! - **Single flight**: hooks mounted while a key is pending join its fetch
//! - **Manual refetch**: [`UseQuery::refetch`] re-runs the fetch on demand
//! - **Scoped tasks**: the observer task is cancelled when the component unmounts
//!
//! ## Usage
//!
//! ```rust,ignore
//! use dioxus::prelude::*;
//! use dioxus_clinic_queries::prelude::*;
//!
//! #[component]
//! fn Greeting() -> Element {
//!     let greeting = use_query(NamedQuery::new("greeting", || async {
//!         Ok::<_, FetchError>("hello".to_string())
//!     }));
//!
//!     match greeting.state() {
//!         QueryState::Loading => rsx! { div { "Loading..." } },
//!         QueryState::Success(text) => rsx! { div { "{text}" } },
//!         QueryState::Error(err) => rsx! { div { "Error: {err}" } },
//!     }
//! }
//! ```

use dioxus::{dioxus_core::Task, prelude::*};
use futures::future;
use tracing::{debug, warn};

use crate::{
    client::QueryClient,
    global,
    query::{Query, QueryKey},
    query_state::QueryState,
};

/// Hook to get the query client
///
/// Resolves the client provided through context, falling back to the global
/// client when none was provided.
pub fn use_query_client() -> QueryClient {
    try_use_context::<QueryClient>().unwrap_or_else(|| global::query_client().clone())
}

/// Hook to provide a query client to the component subtree
///
/// ## Example
///
/// ```rust,ignore
/// use dioxus::prelude::*;
/// use dioxus_clinic_queries::prelude::*;
///
/// #[component]
/// fn App() -> Element {
///     use_query_client_provider(QueryClient::new);
///     rsx! { div { "app" } }
/// }
/// ```
pub fn use_query_client_provider(init: impl FnOnce() -> QueryClient) -> QueryClient {
    use_context_provider(init)
}

/// Query state bound to a component, plus the operations a caller can trigger
pub struct UseQuery<Q: Query> {
    query: Q,
    client: QueryClient,
    state: Signal<QueryState<Q::Output, Q::Error>>,
}

impl<Q: Query> Clone for UseQuery<Q> {
    fn clone(&self) -> Self {
        Self {
            query: self.query.clone(),
            client: self.client.clone(),
            state: self.state,
        }
    }
}

impl<Q: Query> UseQuery<Q> {
    pub fn key(&self) -> QueryKey {
        self.query.key()
    }

    /// The reactive state signal; reading it subscribes the component
    pub fn signal(&self) -> Signal<QueryState<Q::Output, Q::Error>> {
        self.state
    }

    pub fn state(&self) -> QueryState<Q::Output, Q::Error> {
        self.state.read().clone()
    }

    /// Current data, `None` until the first successful fetch
    pub fn data(&self) -> Option<Q::Output> {
        self.state.read().data().cloned()
    }

    pub fn error(&self) -> Option<Q::Error> {
        self.state.read().error().cloned()
    }

    pub fn is_loading(&self) -> bool {
        self.state.read().is_loading()
    }

    pub fn is_success(&self) -> bool {
        self.state.read().is_success()
    }

    pub fn is_error(&self) -> bool {
        self.state.read().is_error()
    }

    /// Re-run the fetch; every hook on this key sees the new result
    pub fn refetch(&self) -> Task {
        let client = self.client.clone();
        let query = self.query.clone();
        spawn(async move {
            if client.refetch(&query).await.is_err() {
                debug!("[QUERY-HOOK] Refetch failed for key: {}", query.key());
            }
        })
    }
}

/// Hook for using a named query in a Dioxus component
///
/// On first render the hook subscribes to the query's cache entry and makes
/// sure it has data: cached data is served immediately, a pending fetch is
/// joined, and a missing entry is fetched. The query passed on later renders
/// is ignored; the hook stays bound to the first one.
///
/// If the entry is removed from the cache (for example by clearing it), the
/// hook subscribes to a fresh entry and fetches again. If instead the key is
/// taken over by a query with different output or error types, the hook keeps
/// its last state and stops observing.
pub fn use_query<Q: Query>(query: Q) -> UseQuery<Q> {
    let client = use_query_client();
    let query = use_hook(move || query);
    let state = use_signal(|| client.state(&query).unwrap_or_default());

    use_hook({
        let client = client.clone();
        let query = query.clone();
        move || {
            let mut state = state;
            spawn(async move {
                loop {
                    let mut receiver = client.subscribe(&query);
                    let current = receiver.borrow_and_update().clone();
                    state.set(current);

                    let observe = async {
                        while receiver.changed().await.is_ok() {
                            let next = receiver.borrow_and_update().clone();
                            state.set(next);
                        }
                    };
                    let fetch = async {
                        if client.ensure(&query).await.is_err() {
                            debug!("[QUERY-HOOK] Fetch failed for key: {}", query.key());
                        }
                    };
                    future::join(observe, fetch).await;

                    let taken_over = client.cache().contains(query.key().as_str())
                        && client.state(&query).is_none();
                    if taken_over {
                        warn!(
                            "[QUERY-HOOK] Key {} now holds a query of another type, no longer observing",
                            query.key()
                        );
                        return;
                    }
                    debug!(
                        "[QUERY-HOOK] Entry for key {} was dropped, resubscribing",
                        query.key()
                    );
                }
            })
        }
    });

    UseQuery {
        query,
        client,
        state,
    }
}

/// Hook to invalidate a query by key
///
/// Returns a function that, when called, marks the entry stale and refetches
/// it if any component is observing it.
pub fn use_invalidate_query(key: &str) -> impl Fn() + Clone + use<> {
    let client = use_query_client();
    let key = QueryKey::new(key);

    move || {
        let client = client.clone();
        let key = key.clone();
        spawn(async move {
            client.invalidate(key.as_str()).await;
        });
    }
}

/// Hook to clear the entire query cache
///
/// Mounted hooks resubscribe to fresh entries and fetch again.
pub fn use_clear_query_cache() -> impl Fn() + Clone {
    let client = use_query_client();

    move || {
        client.clear();
    }
}
