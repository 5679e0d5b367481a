//! Catalog and feature store services
//!
//! [`CatalogService`] owns the transactional namespace/feature records;
//! [`FeatureStore`] composes it with the storage backends.

mod catalog;
mod feature_store;
mod options;

pub use catalog::{CatalogEntity, CatalogService, LEADING_COLUMNS};
pub use feature_store::FeatureStore;
pub use options::{
    FeatureFilter, FeatureOptions, FeatureOptionsBuilder, FeatureUpdate, LoadMode, LoadOptions,
    NamespaceFilter, NamespaceOptions, NamespaceOptionsBuilder, NamespaceUpdate,
};
