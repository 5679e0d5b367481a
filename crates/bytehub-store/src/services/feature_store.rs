use std::collections::BTreeMap;
use std::sync::Arc;

use bytehub_core::{
    resolve, split_name, FeatureRef, FeatureSelector, StoreConfig, StoreError, StoreResult, Table,
};
use bytehub_database::{establish_connection, DbConnection};
use bytehub_entities::{features, namespaces};
use bytehub_timeseries::{
    BackendRegistry, BackendTarget, FeatureBackend, Frame, LoadRequest, Partition, VALUE_COLUMN,
};
use futures::future::try_join_all;
use serde_json::Value;
use tracing::{debug, info, warn};

use super::catalog::CatalogService;
use super::options::{
    FeatureFilter, FeatureOptions, FeatureUpdate, LoadMode, LoadOptions, NamespaceFilter,
    NamespaceOptions, NamespaceUpdate,
};

/// Entry point for managing namespaces and features and for reading and
/// writing feature values.
///
/// Catalog records are never cached: every call resolves the features it
/// touches afresh.
pub struct FeatureStore {
    catalog: CatalogService,
    backends: Arc<BackendRegistry>,
}

impl FeatureStore {
    pub fn new(db: Arc<DbConnection>, backends: Arc<BackendRegistry>) -> Self {
        Self {
            catalog: CatalogService::new(db),
            backends,
        }
    }

    /// Connect to the configured catalog, migrate it and register the
    /// default storage backends
    pub async fn connect(config: &StoreConfig) -> StoreResult<Self> {
        let db = establish_connection(config).await?;
        let backends = Arc::new(BackendRegistry::with_defaults().await);
        Ok(Self::new(db, backends))
    }

    pub fn catalog(&self) -> &CatalogService {
        &self.catalog
    }

    pub fn backends(&self) -> &Arc<BackendRegistry> {
        &self.backends
    }

    pub async fn list_namespaces(&self, filter: NamespaceFilter) -> StoreResult<Table> {
        self.catalog
            .list::<namespaces::Entity>(None, filter.name.as_deref(), filter.regex.as_deref())
            .await
    }

    pub async fn create_namespace(&self, name: &str, options: NamespaceOptions) -> StoreResult<()> {
        self.catalog
            .create::<namespaces::Entity>(None, name, options)
            .await
    }

    pub async fn update_namespace(&self, name: &str, update: NamespaceUpdate) -> StoreResult<()> {
        self.catalog
            .update::<namespaces::Entity>(None, name, update)
            .await
    }

    /// Delete a namespace that no longer holds any feature
    pub async fn delete_namespace(&self, name: &str) -> StoreResult<()> {
        let features = self
            .list_features(FeatureFilter::new().namespace(name))
            .await?;
        if !features.is_empty() {
            warn!(
                "Refusing to delete namespace {} holding {} features",
                name,
                features.len()
            );
            return Err(StoreError::NonEmptyNamespace(name.to_string()));
        }

        self.catalog.delete::<namespaces::Entity>(None, name).await?;
        Ok(())
    }

    pub async fn list_features(&self, filter: FeatureFilter) -> StoreResult<Table> {
        self.catalog
            .list::<features::Entity>(
                filter.namespace.as_deref(),
                filter.name.as_deref(),
                filter.regex.as_deref(),
            )
            .await
    }

    /// Create a feature. `name` may be qualified as `namespace/name` when
    /// the options carry no namespace.
    pub async fn create_feature(&self, name: &str, options: FeatureOptions) -> StoreResult<()> {
        options.check_partition()?;
        let (namespace, name) = split_name(options.namespace.as_deref(), name);
        self.catalog
            .create::<features::Entity>(namespace.as_deref(), &name, options)
            .await
    }

    pub async fn update_feature(
        &self,
        name: &str,
        namespace: Option<&str>,
        update: FeatureUpdate,
    ) -> StoreResult<()> {
        let (namespace, name) = split_name(namespace, name);
        self.catalog
            .update::<features::Entity>(namespace.as_deref(), &name, update)
            .await
    }

    /// Delete a feature and drop the values stored for it
    pub async fn delete_feature(&self, name: &str, namespace: Option<&str>) -> StoreResult<()> {
        let (namespace, name) = split_name(namespace, name);
        let feature = self
            .catalog
            .delete::<features::Entity>(namespace.as_deref(), &name)
            .await?;

        let owner = self.catalog.namespace(&feature.namespace).await?;
        let backend = self.backends.open(&backend_target(&owner, &feature)?).await?;
        backend.drop_data().await?;

        info!("Dropped stored values of {}", feature.qualified_name());
        Ok(())
    }

    /// Look a feature up and open its storage backend
    async fn open_backend(
        &self,
        feature: &FeatureRef,
    ) -> StoreResult<(FeatureRef, Arc<dyn FeatureBackend>)> {
        let (model, owner) = self.catalog.feature_with_namespace(feature).await?;
        let backend = self.backends.open(&backend_target(&owner, &model)?).await?;
        Ok((FeatureRef::new(model.namespace, model.name), backend))
    }

    async fn load_one(&self, feature: &FeatureRef, request: &LoadRequest) -> StoreResult<Frame> {
        let (feature, backend) = self.open_backend(feature).await?;
        let frame = backend.load(request).await?;
        debug!("Loaded {} rows of {}", frame.len(), feature);
        Ok(frame.rename_column(VALUE_COLUMN, feature.column_name())?)
    }

    /// Load one or more features into a single frame.
    ///
    /// Each feature becomes a column named `namespace/name`. The frames are
    /// outer-joined on time and then forward-filled, so a feature keeps its
    /// last value until a newer one is observed.
    pub async fn load(
        &self,
        selector: impl Into<FeatureSelector>,
        options: LoadOptions,
    ) -> StoreResult<Frame> {
        let refs = resolve(&selector.into(), None)?;
        let request = LoadRequest {
            from_date: options.from_date,
            to_date: options.to_date,
            freq: options.freq,
            time_travel: options.time_travel,
        };

        let joined = match options.mode {
            LoadMode::InMemory => {
                let mut frames = Vec::with_capacity(refs.len());
                for feature in &refs {
                    frames.push(self.load_one(feature, &request).await?);
                }
                Frame::outer_join(frames)?
            }
            LoadMode::Parallel => {
                let frames =
                    try_join_all(refs.iter().map(|feature| self.load_one(feature, &request)))
                        .await?;
                frames
                    .into_iter()
                    .try_fold(Frame::default(), |joined, frame| joined.join(frame))?
            }
        };

        Ok(joined.forward_fill())
    }

    /// Save feature values.
    ///
    /// Every column of `frame` is a feature column. A single column named
    /// `value` needs an explicit `name` (optionally qualified, or with
    /// `namespace`); any other column names its feature as `namespace/name`
    /// or as a bare name inside `namespace`. Every target feature is checked
    /// before anything is written. Writes are not atomic across features.
    pub async fn save(
        &self,
        frame: &Frame,
        name: Option<&str>,
        namespace: Option<&str>,
    ) -> StoreResult<()> {
        let columns = frame.column_names();
        if columns.is_empty() {
            return Err(StoreError::invalid_input("Frame has no feature columns"));
        }

        let single = columns.len() == 1;
        let mut targets = Vec::with_capacity(columns.len());
        for column in columns {
            let feature = if single && column == VALUE_COLUMN {
                let name = name.ok_or_else(|| StoreError::MissingArgument("name".to_string()))?;
                let (namespace, name) = split_name(namespace, name);
                FeatureRef { namespace, name }
            } else {
                column_feature(column, namespace)?
            };
            let (feature, backend) = self.open_backend(&feature).await?;
            targets.push((column, feature, backend));
        }

        for (column, feature, backend) in targets {
            let values = frame.select(column)?.rename_column(column, VALUE_COLUMN)?;
            let count = backend.save(&values).await?;
            debug!("Saved {} rows of {}", count, feature);
        }
        Ok(())
    }

    /// Latest value of each feature, keyed by `namespace/name`
    pub async fn last(
        &self,
        selector: impl Into<FeatureSelector>,
    ) -> StoreResult<BTreeMap<String, Option<Value>>> {
        let mut result = BTreeMap::new();
        for feature in resolve(&selector.into(), None)? {
            let (feature, backend) = self.open_backend(&feature).await?;
            result.insert(feature.column_name(), backend.last().await?);
        }
        Ok(result)
    }

    pub async fn create_task(&self) -> StoreResult<()> {
        Err(StoreError::NotImplemented("create_task"))
    }

    pub async fn update_task(&self) -> StoreResult<()> {
        Err(StoreError::NotImplemented("update_task"))
    }

    pub async fn delete_task(&self) -> StoreResult<()> {
        Err(StoreError::NotImplemented("delete_task"))
    }
}

/// Feature named by a frame column header
fn column_feature(column: &str, namespace: Option<&str>) -> StoreResult<FeatureRef> {
    resolve(&FeatureSelector::from(column), namespace)?
        .pop()
        .ok_or_else(|| StoreError::invalid_input(format!("Column {} names no feature", column)))
}

fn backend_target(
    namespace: &namespaces::Model,
    feature: &features::Model,
) -> StoreResult<BackendTarget> {
    let partition: Partition = feature.partition.parse()?;
    Ok(
        BackendTarget::new(&namespace.url, &namespace.name, &feature.name)
            .with_storage_options(namespace.storage_options.clone())
            .with_partition(partition),
    )
}
