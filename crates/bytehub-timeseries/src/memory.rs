//! Process-local backend for `memory://` namespaces.
//!
//! Every backend opened by one factory shares the factory's map, so a feature
//! reopened later sees what was saved earlier.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::debug;

use crate::backend::{BackendFactory, BackendTarget, FeatureBackend, LoadRequest};
use crate::error::Result;
use crate::frame::Frame;
use crate::series::{Point, Series};

type PointStore = Arc<RwLock<HashMap<String, Vec<Point>>>>;

pub struct MemoryBackend {
    key: String,
    store: PointStore,
}

impl MemoryBackend {
    async fn series(&self) -> Series {
        let store = self.store.read().await;
        Series::new(store.get(&self.key).cloned().unwrap_or_default())
    }
}

#[async_trait]
impl FeatureBackend for MemoryBackend {
    fn backend_type(&self) -> &'static str {
        "memory"
    }

    async fn load(&self, request: &LoadRequest) -> Result<Frame> {
        let frame = request.apply(self.series().await);
        debug!("Loaded {} rows from memory://{}", frame.len(), self.key);
        Ok(frame)
    }

    async fn save(&self, frame: &Frame) -> Result<usize> {
        let points = Series::from_frame(frame, Utc::now())?.into_points();
        let count = points.len();

        let mut store = self.store.write().await;
        store.entry(self.key.clone()).or_default().extend(points);

        debug!("Saved {} rows to memory://{}", count, self.key);
        Ok(count)
    }

    async fn last(&self) -> Result<Option<Value>> {
        Ok(self.series().await.as_of(None).last_value())
    }

    async fn drop_data(&self) -> Result<()> {
        self.store.write().await.remove(&self.key);
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryBackendFactory {
    store: PointStore,
}

impl MemoryBackendFactory {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BackendFactory for MemoryBackendFactory {
    fn scheme(&self) -> &'static str {
        "memory"
    }

    async fn open(&self, target: &BackendTarget) -> Result<Arc<dyn FeatureBackend>> {
        let url = target.parsed_url()?;
        let key = format!(
            "{}/{}/{}",
            url.as_str().trim_end_matches('/'),
            target.namespace,
            target.feature
        );
        Ok(Arc::new(MemoryBackend {
            key,
            store: self.store.clone(),
        }))
    }
}
