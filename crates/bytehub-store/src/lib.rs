//! bytehub-store: feature catalog and time-series access for Bytehub
//!
//! Manages namespaces and the features they contain in a relational catalog
//! and reads and writes feature values through the storage backend named by
//! each namespace's url.

pub mod services;

pub use services::{
    CatalogEntity, CatalogService, FeatureFilter, FeatureOptions, FeatureOptionsBuilder,
    FeatureStore, FeatureUpdate, LoadMode, LoadOptions, NamespaceFilter, NamespaceOptions,
    NamespaceOptionsBuilder, NamespaceUpdate,
};

pub use bytehub_core::{
    FeatureRef, FeatureSelector, SelectorItem, StoreConfig, StoreError, StoreResult, Table,
};
pub use bytehub_timeseries::{Frame, Frequency};
