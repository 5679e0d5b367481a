use crate::error::{BackendError, Result};
use crate::file::FileBackendFactory;
use crate::frame::Frame;
use crate::frequency::Frequency;
use crate::memory::MemoryBackendFactory;
use crate::partition::Partition;
use crate::series::Series;
use async_trait::async_trait;
use bytehub_core::DBDateTime;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, warn};
use url::Url;

/// Parameters of a single-feature read
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadRequest {
    /// Inclusive lower bound on `time`
    pub from_date: Option<DBDateTime>,
    /// Inclusive upper bound on `time`
    pub to_date: Option<DBDateTime>,
    /// Resampling frequency
    pub freq: Option<Frequency>,
    /// Only values recorded at or before this instant are visible
    pub time_travel: Option<DBDateTime>,
}

impl LoadRequest {
    /// Apply time travel, the date range and resampling, in that order
    pub fn apply(&self, series: Series) -> Frame {
        let series = series
            .as_of(self.time_travel)
            .between(self.from_date, self.to_date);
        match self.freq {
            Some(freq) => series.resample(freq).to_frame(),
            None => series.to_frame(),
        }
    }
}

/// Everything a factory needs to open the backend of one feature
#[derive(Debug, Clone)]
pub struct BackendTarget {
    /// Storage url of the owning namespace
    pub url: String,
    /// Namespace storage options, passed through untouched
    pub storage_options: Option<Value>,
    pub namespace: String,
    pub feature: String,
    pub partition: Partition,
}

impl BackendTarget {
    pub fn new(
        url: impl Into<String>,
        namespace: impl Into<String>,
        feature: impl Into<String>,
    ) -> Self {
        Self {
            url: url.into(),
            storage_options: None,
            namespace: namespace.into(),
            feature: feature.into(),
            partition: Partition::default(),
        }
    }

    pub fn with_storage_options(mut self, storage_options: Option<Value>) -> Self {
        self.storage_options = storage_options;
        self
    }

    pub fn with_partition(mut self, partition: Partition) -> Self {
        self.partition = partition;
        self
    }

    pub fn parsed_url(&self) -> Result<Url> {
        Url::parse(&self.url).map_err(|e| BackendError::InvalidUrl {
            url: self.url.clone(),
            reason: e.to_string(),
        })
    }
}

/// Physical storage of one feature's series
#[async_trait]
pub trait FeatureBackend: Send + Sync {
    fn backend_type(&self) -> &'static str;

    /// Read the series as a frame with a single `value` column
    async fn load(&self, request: &LoadRequest) -> Result<Frame>;

    /// Append every row of a single-value-column frame, or none of them.
    /// Rows without a `created_time` are stamped with the current time.
    async fn save(&self, frame: &Frame) -> Result<usize>;

    /// Latest known value at the latest time
    async fn last(&self) -> Result<Option<Value>>;

    /// Remove everything stored for the feature
    async fn drop_data(&self) -> Result<()>;
}

/// Opens backends for one url scheme
#[async_trait]
pub trait BackendFactory: Send + Sync {
    fn scheme(&self) -> &'static str;

    async fn open(&self, target: &BackendTarget) -> Result<Arc<dyn FeatureBackend>>;
}

/// Maps url schemes to backend factories
pub struct BackendRegistry {
    factories: Arc<RwLock<HashMap<String, Arc<dyn BackendFactory>>>>,
}

impl BackendRegistry {
    pub fn new() -> Self {
        Self {
            factories: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Registry with the `memory://` and `file://` backends
    pub async fn with_defaults() -> Self {
        let registry = Self::new();
        registry
            .register_factory(Arc::new(MemoryBackendFactory::new()))
            .await;
        registry
            .register_factory(Arc::new(FileBackendFactory))
            .await;
        registry
    }

    pub async fn register_factory(&self, factory: Arc<dyn BackendFactory>) {
        let scheme = factory.scheme();
        let mut factories = self.factories.write().await;

        if factories.contains_key(scheme) {
            warn!("Overwriting existing backend factory for scheme: {}", scheme);
        }

        factories.insert(scheme.to_string(), factory);
        debug!("Registered backend factory for scheme: {}", scheme);
    }

    pub async fn schemes(&self) -> Vec<String> {
        let mut schemes: Vec<String> = self.factories.read().await.keys().cloned().collect();
        schemes.sort();
        schemes
    }

    /// Open the backend of a feature, dispatching on the url scheme
    pub async fn open(&self, target: &BackendTarget) -> Result<Arc<dyn FeatureBackend>> {
        let scheme = target.parsed_url()?.scheme().to_string();

        let factory = self
            .factories
            .read()
            .await
            .get(&scheme)
            .cloned()
            .ok_or_else(|| BackendError::UnsupportedScheme(scheme.clone()))?;

        debug!(
            "Opening {} backend for {}/{}",
            scheme, target.namespace, target.feature
        );
        factory.open(target).await
    }
}

impl Default for BackendRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_defaults_registered() {
        let registry = BackendRegistry::with_defaults().await;
        assert_eq!(registry.schemes().await, vec!["file", "memory"]);
    }

    #[tokio::test]
    async fn test_unknown_scheme() {
        let registry = BackendRegistry::with_defaults().await;
        let target = BackendTarget::new("s3://bucket/prefix", "demo", "price");
        let err = registry.open(&target).await.err().unwrap();
        assert!(matches!(err, BackendError::UnsupportedScheme(s) if s == "s3"));
    }

    #[tokio::test]
    async fn test_invalid_url() {
        let registry = BackendRegistry::new();
        let target = BackendTarget::new("not a url", "demo", "price");
        assert!(matches!(
            registry.open(&target).await,
            Err(BackendError::InvalidUrl { .. })
        ));
    }
}
