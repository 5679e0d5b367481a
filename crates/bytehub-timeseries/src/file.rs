//! Local-file backend for `file://` namespaces.
//!
//! Layout: `<root>/<feature>/<partition>=<key>/part.jsonl`, one JSON-encoded
//! [`Point`] per line. The feature directory name is percent-encoded so that
//! names containing `/` stay a single path component.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use crate::backend::{BackendFactory, BackendTarget, FeatureBackend, LoadRequest};
use crate::error::{BackendError, Result};
use crate::frame::Frame;
use crate::partition::Partition;
use crate::series::{Point, Series};

const PART_FILE: &str = "part.jsonl";

pub struct FileBackend {
    dir: PathBuf,
    partition: Partition,
}

impl FileBackend {
    pub fn new(root: impl AsRef<Path>, feature: &str, partition: Partition) -> Self {
        Self {
            dir: root.as_ref().join(urlencoding::encode(feature).as_ref()),
            partition,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Partition keys present on disk, ascending
    async fn partition_keys(&self) -> Result<Vec<String>> {
        let mut keys = Vec::new();
        let mut entries = match fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(keys),
            Err(e) => return Err(e.into()),
        };

        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            if let Some(key) = name.to_str().and_then(|n| self.partition.parse_dir_name(n)) {
                keys.push(key.to_string());
            }
        }
        keys.sort();
        Ok(keys)
    }

    async fn read_partition(&self, key: &str) -> Result<Vec<Point>> {
        let path = self
            .dir
            .join(format!("{}={}", self.partition.as_str(), key))
            .join(PART_FILE);
        let contents = match fs::read_to_string(&path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        contents
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| serde_json::from_str(line).map_err(BackendError::from))
            .collect()
    }

    /// Open every part file before appending to any of them, recording in
    /// `undo` what has to be reverted if a later step fails.
    async fn append_batches(
        &self,
        batches: &BTreeMap<String, String>,
        undo: &mut SaveUndo,
    ) -> Result<()> {
        if !fs::try_exists(&self.dir).await? {
            fs::create_dir_all(&self.dir).await?;
            undo.created_dirs.push(self.dir.clone());
        }

        for dir_name in batches.keys() {
            let dir = self.dir.join(dir_name);
            if !fs::try_exists(&dir).await? {
                fs::create_dir(&dir).await?;
                undo.created_dirs.push(dir.clone());
            }
            let file = fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(dir.join(PART_FILE))
                .await?;
            let len = file.metadata().await?.len();
            undo.parts.push((file, len));
        }

        for ((file, _), batch) in undo.parts.iter_mut().zip(batches.values()) {
            file.write_all(batch.as_bytes()).await?;
            file.flush().await?;
        }
        Ok(())
    }

    async fn read_partitions(&self, keys: &[String]) -> Result<Series> {
        let mut points = Vec::new();
        for key in keys {
            points.extend(self.read_partition(key).await?);
        }
        Ok(Series::new(points))
    }
}

/// Part files opened by a save, with their length beforehand, and the
/// directories the save created
#[derive(Default)]
struct SaveUndo {
    created_dirs: Vec<PathBuf>,
    parts: Vec<(fs::File, u64)>,
}

impl SaveUndo {
    async fn roll_back(self) {
        for (file, len) in self.parts {
            if let Err(e) = file.set_len(len).await {
                warn!("Failed to truncate part file to {} bytes: {}", len, e);
            }
        }
        for dir in self.created_dirs.iter().rev() {
            if let Err(e) = fs::remove_dir_all(dir).await {
                if e.kind() != std::io::ErrorKind::NotFound {
                    warn!("Failed to remove {}: {}", dir.display(), e);
                }
            }
        }
    }
}

#[async_trait]
impl FeatureBackend for FileBackend {
    fn backend_type(&self) -> &'static str {
        "file"
    }

    async fn load(&self, request: &LoadRequest) -> Result<Frame> {
        let from_key = request.from_date.map(|ts| self.partition.key(ts));
        let to_key = request.to_date.map(|ts| self.partition.key(ts));

        let keys: Vec<String> = self
            .partition_keys()
            .await?
            .into_iter()
            .filter(|key| from_key.as_ref().map_or(true, |from| key >= from))
            .filter(|key| to_key.as_ref().map_or(true, |to| key <= to))
            .collect();

        let frame = request.apply(self.read_partitions(&keys).await?);
        debug!(
            "Loaded {} rows from {} partitions under {}",
            frame.len(),
            keys.len(),
            self.dir.display()
        );
        Ok(frame)
    }

    async fn save(&self, frame: &Frame) -> Result<usize> {
        let points = Series::from_frame(frame, Utc::now())?.into_points();
        let count = points.len();

        // Serialise everything before touching the filesystem
        let mut batches: BTreeMap<String, String> = BTreeMap::new();
        for point in &points {
            let batch = batches.entry(self.partition.dir_name(point.time)).or_default();
            batch.push_str(&serde_json::to_string(point)?);
            batch.push('\n');
        }

        let mut undo = SaveUndo::default();
        if let Err(e) = self.append_batches(&batches, &mut undo).await {
            warn!("Rolling back partial save under {}: {}", self.dir.display(), e);
            undo.roll_back().await;
            return Err(e);
        }

        debug!("Saved {} rows under {}", count, self.dir.display());
        Ok(count)
    }

    async fn last(&self) -> Result<Option<Value>> {
        // The newest non-empty partition holds the latest time
        for key in self.partition_keys().await?.iter().rev() {
            let series = Series::new(self.read_partition(key).await?).as_of(None);
            if !series.is_empty() {
                return Ok(series.last_value());
            }
        }
        Ok(None)
    }

    async fn drop_data(&self) -> Result<()> {
        match fs::remove_dir_all(&self.dir).await {
            Ok(()) => {
                debug!("Removed {}", self.dir.display());
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

pub struct FileBackendFactory;

#[async_trait]
impl BackendFactory for FileBackendFactory {
    fn scheme(&self) -> &'static str {
        "file"
    }

    async fn open(&self, target: &BackendTarget) -> Result<Arc<dyn FeatureBackend>> {
        let url = target.parsed_url()?;
        let root = url.to_file_path().map_err(|_| BackendError::InvalidUrl {
            url: target.url.clone(),
            reason: "not a local file path".to_string(),
        })?;
        Ok(Arc::new(FileBackend::new(
            root,
            &target.feature,
            target.partition,
        )))
    }
}
