//! # Named Queries
//!
//! A query is a cache key bound to a zero-argument async fetch function.
//! Everything the hooks and the client do is keyed by [`QueryKey`], so two
//! queries with the same key share one cache entry and one in-flight fetch.
//!
//! ```rust,no_run
//! use dioxus_clinic_queries::query::{NamedQuery, Query};
//!
//! let query = NamedQuery::new("greeting", || async { Ok::<_, String>("hello".to_string()) });
//! assert_eq!(query.key().as_str(), "greeting");
//! ```

use std::{borrow::Borrow, fmt, future::Future, sync::Arc};

/// Identifier scoping one query's cached result in the shared cache
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QueryKey(Arc<str>);

impl QueryKey {
    pub fn new(key: impl AsRef<str>) -> Self {
        Self(Arc::from(key.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for QueryKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for QueryKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for QueryKey {
    fn from(key: &str) -> Self {
        Self::new(key)
    }
}

impl From<String> for QueryKey {
    fn from(key: String) -> Self {
        Self(Arc::from(key))
    }
}

/// A keyed async fetch whose result is cached by the query client
///
/// Implementors must tolerate repeated calls to [`Query::fetch`]: the client
/// runs it again on refetch, on invalidation and when cached data goes stale.
pub trait Query: Clone + Send + Sync + 'static {
    /// The type of data returned on success
    type Output: Clone + PartialEq + Send + Sync + 'static;
    /// The type of error returned on failure
    type Error: Clone + Send + Sync + 'static;

    /// The cache key; must be unique per logical dataset
    fn key(&self) -> QueryKey;

    /// Run the fetch
    fn fetch(&self) -> impl Future<Output = Result<Self::Output, Self::Error>> + Send;
}

/// A [`Query`] built from an explicit key and a zero-argument fetch function
#[derive(Clone)]
pub struct NamedQuery<F> {
    key: QueryKey,
    fetcher: F,
}

impl<F> NamedQuery<F> {
    pub fn new(key: impl Into<QueryKey>, fetcher: F) -> Self {
        Self {
            key: key.into(),
            fetcher,
        }
    }
}

impl<F> fmt::Debug for NamedQuery<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NamedQuery").field("key", &self.key).finish()
    }
}

impl<F, Fut, T, E> Query for NamedQuery<F>
where
    F: Fn() -> Fut + Clone + Send + Sync + 'static,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
    T: Clone + PartialEq + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    type Output = T;
    type Error = E;

    fn key(&self) -> QueryKey {
        self.key.clone()
    }

    fn fetch(&self) -> impl Future<Output = Result<T, E>> + Send {
        (self.fetcher)()
    }
}
