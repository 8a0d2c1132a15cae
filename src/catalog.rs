//! # Clinic and Product Queries
//!
//! The three named queries of the app, built on the generic [`NamedQuery`]:
//!
//! | Hook                 | Key            | Fetch function                         |
//! |----------------------|----------------|----------------------------------------|
//! | [`use_all_clinics`]  | `all-clinics`  | [`CatalogService::fetch_all_clinics`]  |
//! | [`use_all_products`] | `all-products` | [`CatalogService::fetch_all_products`] |
//! | [`use_clinics`]      | `user-clinics` | [`CatalogService::fetch_user_clinics`] |
//!
//! The fetch functions belong to the service layer, which is provided to the
//! component tree as a [`Catalog`] through context.
//!
//! `use_clinics` and `use_all_clinics` use distinct keys: they neither share
//! nor invalidate each other's entries.

use std::{fmt, sync::Arc};

use dioxus::prelude::*;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};

use crate::{
    errors::FetchError,
    hooks::{UseQuery, use_query},
    query::{NamedQuery, Query},
};

/// Cache key of every clinic
pub const ALL_CLINICS_KEY: &str = "all-clinics";
/// Cache key of every product
pub const ALL_PRODUCTS_KEY: &str = "all-products";
/// Cache key of the current user's clinics
pub const USER_CLINICS_KEY: &str = "user-clinics";

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Clinic {
    pub id: u64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Product {
    pub id: u64,
    pub name: String,
}

/// The backend calls behind the catalog queries
///
/// Implementations must be safe to call repeatedly; the query client calls
/// them again on refetch and invalidation.
pub trait CatalogService: Send + Sync + 'static {
    fn fetch_all_clinics(&self) -> BoxFuture<'_, Result<Vec<Clinic>, FetchError>>;

    fn fetch_all_products(&self) -> BoxFuture<'_, Result<Vec<Product>, FetchError>>;

    /// Clinics visible to the signed-in user
    fn fetch_user_clinics(&self) -> BoxFuture<'_, Result<Vec<Clinic>, FetchError>>;
}

/// Shared handle to the catalog service
#[derive(Clone)]
pub struct Catalog(Arc<dyn CatalogService>);

impl Catalog {
    pub fn new(service: impl CatalogService) -> Self {
        Self(Arc::new(service))
    }

    pub fn service(&self) -> &dyn CatalogService {
        self.0.as_ref()
    }
}

impl From<Arc<dyn CatalogService>> for Catalog {
    fn from(service: Arc<dyn CatalogService>) -> Self {
        Self(service)
    }
}

impl PartialEq for Catalog {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Catalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Catalog").finish_non_exhaustive()
    }
}

/// Every clinic, cached under [`ALL_CLINICS_KEY`]
pub fn all_clinics_query(catalog: Catalog) -> impl Query<Output = Vec<Clinic>, Error = FetchError> {
    NamedQuery::new(ALL_CLINICS_KEY, move || {
        let catalog = catalog.clone();
        async move { catalog.service().fetch_all_clinics().await }
    })
}

/// Every product, cached under [`ALL_PRODUCTS_KEY`]
pub fn all_products_query(
    catalog: Catalog,
) -> impl Query<Output = Vec<Product>, Error = FetchError> {
    NamedQuery::new(ALL_PRODUCTS_KEY, move || {
        let catalog = catalog.clone();
        async move { catalog.service().fetch_all_products().await }
    })
}

/// The current user's clinics, cached under [`USER_CLINICS_KEY`]
pub fn user_clinics_query(catalog: Catalog) -> impl Query<Output = Vec<Clinic>, Error = FetchError> {
    NamedQuery::new(USER_CLINICS_KEY, move || {
        let catalog = catalog.clone();
        async move { catalog.service().fetch_user_clinics().await }
    })
}

/// Hook to provide the catalog service to the component subtree
pub fn use_catalog_provider(init: impl FnOnce() -> Catalog) -> Catalog {
    use_context_provider(init)
}

/// Hook to get the catalog service provided by an ancestor
pub fn use_catalog() -> Catalog {
    use_context::<Catalog>()
}

/// Hook for every clinic
pub fn use_all_clinics() -> UseQuery<impl Query<Output = Vec<Clinic>, Error = FetchError>> {
    let catalog = use_catalog();
    use_query(all_clinics_query(catalog))
}

/// Hook for every product
pub fn use_all_products() -> UseQuery<impl Query<Output = Vec<Product>, Error = FetchError>> {
    let catalog = use_catalog();
    use_query(all_products_query(catalog))
}

/// Hook for the current user's clinics
pub fn use_clinics() -> UseQuery<impl Query<Output = Vec<Clinic>, Error = FetchError>> {
    let catalog = use_catalog();
    use_query(user_clinics_query(catalog))
}
