//! Local filesystem storage implementation.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;
use geojson::FeatureCollection;
use serde::{Serialize, de::DeserializeOwned};
use tokio::io::AsyncWriteExt;

use crate::error::{AppError, Result};
use crate::models::Region;
use crate::storage::{SessionSnapshot, SessionStorage, WriteMetadata};

const VISITS_KEY: &str = "visits.json";
const REGIONS_KEY: &str = "regions.geojson";
const OVERLAYS_KEY: &str = "overlays.geojson";

/// Local filesystem storage backend.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    root_dir: PathBuf,
}

impl LocalStorage {
    /// Create a new LocalStorage rooted at the given directory.
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root_dir
    }

    /// Get the full path for a relative key.
    pub fn path(&self, key: &str) -> PathBuf {
        self.root_dir.join(key)
    }

    /// Ensure parent directory exists.
    async fn ensure_dir(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        Ok(())
    }

    /// Write bytes atomically (write to temp, then rename).
    async fn write_bytes(&self, key: &str, bytes: &[u8]) -> Result<()> {
        let path = self.path(key);
        self.ensure_dir(&path).await?;

        let tmp = path.with_extension("tmp");
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        drop(file);

        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }

    async fn write_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(value)?;
        self.write_bytes(key, &bytes).await
    }

    /// Read bytes, returning None if file doesn't exist.
    async fn read_bytes(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let path = self.path(key);
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::Io(e)),
        }
    }

    async fn read_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.read_bytes(key).await? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    fn written(key: &str, count: usize) -> WriteMetadata {
        log::info!("Wrote {} ({} items)", key, count);
        WriteMetadata {
            key: key.to_string(),
            count,
            timestamp: Utc::now(),
        }
    }
}

/// Read a GeoJSON feature collection from any path.
pub async fn read_feature_collection(path: impl AsRef<Path>) -> Result<FeatureCollection> {
    let text = tokio::fs::read_to_string(path.as_ref()).await?;
    text.parse::<geojson::GeoJson>()
        .map_err(AppError::geojson)
        .and_then(|geojson| FeatureCollection::try_from(geojson).map_err(AppError::geojson))
}

#[async_trait]
impl SessionStorage for LocalStorage {
    async fn write_snapshot(&self, snapshot: &SessionSnapshot) -> Result<WriteMetadata> {
        self.write_json(VISITS_KEY, snapshot).await?;
        Ok(Self::written(VISITS_KEY, snapshot.count))
    }

    async fn load_snapshot(&self) -> Result<Option<SessionSnapshot>> {
        self.read_json(VISITS_KEY).await
    }

    async fn write_regions(&self, regions: &[Region]) -> Result<WriteMetadata> {
        let collection = FeatureCollection {
            bbox: None,
            features: regions.iter().map(Region::to_feature).collect(),
            foreign_members: None,
        };
        self.write_json(REGIONS_KEY, &collection).await?;
        Ok(Self::written(REGIONS_KEY, regions.len()))
    }

    async fn load_regions(&self) -> Result<Vec<Region>> {
        let Some(collection) = self.read_json::<FeatureCollection>(REGIONS_KEY).await? else {
            return Ok(Vec::new());
        };
        collection
            .features
            .into_iter()
            .map(Region::from_feature)
            .collect()
    }

    async fn write_overlays(&self, overlays: &FeatureCollection) -> Result<WriteMetadata> {
        self.write_json(OVERLAYS_KEY, overlays).await?;
        Ok(Self::written(OVERLAYS_KEY, overlays.features.len()))
    }
}
