//! # Global Query Client
//!
//! This module provides the process-wide query client used by hooks that run
//! outside a [`QueryClient`] context. Prefer providing a client through
//! context at the app root; the global one exists for apps that want a single
//! cache without threading it through the component tree.

use std::sync::OnceLock;

use tracing::debug;

use crate::{client::QueryClient, config::QueryClientConfig};

/// Error type for global query client operations
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum GlobalClientError {
    #[error("Global query client not initialized. Call init_query_client() first.")]
    NotInitialized,
    #[error("Global query client already initialized")]
    AlreadyInitialized,
}

/// Global singleton instance of the query client
static GLOBAL_CLIENT: OnceLock<QueryClient> = OnceLock::new();

/// Initialize the global query client
///
/// This should be called once at the start of your application,
/// before any component that reads the global client is rendered.
///
/// ## Example
///
/// ```rust,no_run
/// use dioxus_clinic_queries::{config::QueryClientConfig, global::init_query_client};
///
/// fn main() {
///     init_query_client(QueryClientConfig::default()).expect("client initialized twice");
///     // dioxus::launch(app);
/// }
/// ```
pub fn init_query_client(
    config: QueryClientConfig,
) -> Result<&'static QueryClient, GlobalClientError> {
    let mut created = false;
    let client = GLOBAL_CLIENT.get_or_init(|| {
        created = true;
        QueryClient::with_config(config)
    });
    if created {
        debug!("[QUERY-CLIENT] Initialized global query client");
        Ok(client)
    } else {
        Err(GlobalClientError::AlreadyInitialized)
    }
}

/// Get the global query client
///
/// ## Errors
///
/// Returns `GlobalClientError::NotInitialized` if no global client exists yet.
pub fn get_query_client() -> Result<&'static QueryClient, GlobalClientError> {
    GLOBAL_CLIENT.get().ok_or(GlobalClientError::NotInitialized)
}

/// Get the global query client, creating it with the default config if needed
pub fn query_client() -> &'static QueryClient {
    GLOBAL_CLIENT.get_or_init(|| {
        debug!("[QUERY-CLIENT] Created global query client with default config");
        QueryClient::new()
    })
}

/// Check if the global query client has been initialized
pub fn is_initialized() -> bool {
    GLOBAL_CLIENT.get().is_some()
}

/// Clear the global cache at application shutdown or test teardown
///
/// The client itself stays installed; subsequent queries start from an
/// empty cache.
pub fn shutdown_query_client() {
    if let Some(client) = GLOBAL_CLIENT.get() {
        client.clear();
        debug!("[QUERY-CLIENT] Cleared global query client");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::NamedQuery;

    #[test]
    fn test_lazy_client_and_double_init() {
        let client = query_client();
        assert!(is_initialized());
        assert!(std::ptr::eq(client, get_query_client().unwrap()));

        // The lazy default already claimed the slot
        assert_eq!(
            init_query_client(QueryClientConfig::default()).err(),
            Some(GlobalClientError::AlreadyInitialized)
        );
    }

    #[tokio::test]
    async fn test_shutdown_clears_cache() {
        let client = query_client();
        let query = NamedQuery::new("global-shutdown-test", || async { Ok::<_, String>(1u8) });
        client.ensure(&query).await.unwrap();
        assert!(client.cache().contains("global-shutdown-test"));

        shutdown_query_client();
        assert!(!client.cache().contains("global-shutdown-test"));
    }
}
