#![doc = include_str!("../README.md")]

// Core modules
pub mod cache;
pub mod client;
pub mod config;
pub mod errors;
pub mod global;
pub mod query;
pub mod query_state;

// Dioxus integration
pub mod catalog;
pub mod hooks;

pub mod prelude {
    //! The prelude exports all the most common types and functions for using dioxus-clinic-queries.

    // The query trait and the generic named query
    pub use crate::query::{NamedQuery, Query, QueryKey};

    // The core hook and its handle
    pub use crate::hooks::{UseQuery, use_query};

    // Hooks for client and cache management
    pub use crate::hooks::{
        use_clear_query_cache, use_invalidate_query, use_query_client, use_query_client_provider,
    };

    // Clinic and product queries
    pub use crate::catalog::{
        Catalog, CatalogService, Clinic, Product, use_all_clinics, use_all_products,
        use_catalog, use_catalog_provider, use_clinics,
    };

    // The query state enum, needed for matching
    pub use crate::query_state::QueryState;

    pub use crate::client::QueryClient;
    pub use crate::config::QueryClientConfig;
    pub use crate::errors::FetchError;

    // Global initialization
    pub use crate::global::{init_query_client, shutdown_query_client};
}
