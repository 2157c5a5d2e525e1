//! Artifact store gateway.
//!
//! Owns the naming scheme for stored weather documents and the put / list /
//! get operations against a single bucket of an [`ObjectStore`].

use anyhow::{Context, anyhow};
use futures::StreamExt;
use object_store::{
    Attribute, Attributes, ObjectStore, PutOptions, gcp::GoogleCloudStorageBuilder,
    local::LocalFileSystem, memory::InMemory, path::Path,
};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::{
    config::{Config, StorageBackend},
    model::{WeatherArtifact, WeatherQuery},
};

/// Name prefix shared by every artifact this service writes.
pub const ARTIFACT_PREFIX: &str = "weather_";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Failed to encode payload for {name}: {source}")]
    Encode {
        name: String,
        source: serde_json::Error,
    },

    #[error("Failed to write {name}: {source}")]
    Write {
        name: String,
        source: object_store::Error,
    },

    #[error("Failed to list objects with prefix '{prefix}': {source}")]
    List {
        prefix: String,
        source: object_store::Error,
    },

    /// Absent, unreadable and unparsable blobs all land here.
    #[error("File '{name}' not found or unable to retrieve/parse content.")]
    NotFound { name: String },
}

/// Deterministic artifact name for a query.
///
/// Coordinates keep two decimals with `.` turned into `_`; dates are
/// compacted to `YYYYMMDD`. Queries that agree at that precision share a name.
pub fn artifact_name(query: &WeatherQuery) -> String {
    format!(
        "{ARTIFACT_PREFIX}lat{}_lon{}_from{}_to{}.json",
        coordinate(query.latitude()),
        coordinate(query.longitude()),
        query.start_date().format("%Y%m%d"),
        query.end_date().format("%Y%m%d"),
    )
}

fn coordinate(value: f64) -> String {
    format!("{value:.2}").replace('.', "_")
}

/// Gateway to the bucket holding weather artifacts.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    store: Arc<dyn ObjectStore>,
    bucket: String,
    /// URL prefix that object names are appended to.
    location: String,
    attributes: Attributes,
}

impl ArtifactStore {
    pub fn new(store: Arc<dyn ObjectStore>, bucket: impl Into<String>) -> Self {
        let bucket = bucket.into();
        Self {
            store,
            location: format!("gs://{bucket}"),
            bucket,
            attributes: json_attributes(),
        }
    }

    /// Open the backend selected in `config`.
    pub fn open(config: &Config) -> anyhow::Result<Self> {
        let bucket = config.require_bucket()?.to_string();

        let store = match config.storage {
            StorageBackend::Gcs => {
                let gcs = GoogleCloudStorageBuilder::from_env()
                    .with_bucket_name(&bucket)
                    .build()
                    .with_context(|| format!("Failed to create GCS client for bucket '{bucket}'"))?;
                Self::new(Arc::new(gcs), bucket)
            }
            StorageBackend::Local => {
                let root = config.local_root.as_ref().ok_or_else(|| {
                    anyhow!("The 'local' storage backend needs WEATHER_LOCAL_ROOT or local_root")
                })?;
                std::fs::create_dir_all(root)
                    .with_context(|| format!("Failed to create {}", root.display()))?;
                let root = std::fs::canonicalize(root)
                    .with_context(|| format!("Failed to resolve {}", root.display()))?;
                let local = LocalFileSystem::new_with_prefix(&root)
                    .with_context(|| format!("Failed to open {}", root.display()))?;
                // LocalFileSystem rejects object attributes.
                Self {
                    location: format!("file://{}", root.display()),
                    attributes: Attributes::new(),
                    ..Self::new(Arc::new(local), bucket)
                }
            }
            StorageBackend::Memory => Self {
                location: format!("memory://{bucket}"),
                ..Self::new(Arc::new(InMemory::new()), bucket)
            },
        };

        info!(backend = %config.storage, bucket = %store.bucket, "Artifact store ready");
        Ok(store)
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Fully qualified location of an artifact, e.g. `gs://bucket/name` or
    /// `file:///srv/weather/name` for the local backend.
    pub fn object_url(&self, name: &str) -> String {
        format!("{}/{}", self.location, name)
    }

    /// Write `payload` under the query's derived name, replacing any previous blob.
    #[instrument(skip(self, payload), fields(bucket = %self.bucket))]
    pub async fn put(
        &self,
        query: &WeatherQuery,
        payload: serde_json::Value,
    ) -> Result<WeatherArtifact, StoreError> {
        let name = artifact_name(query);
        let body = serde_json::to_vec_pretty(&payload).map_err(|source| StoreError::Encode {
            name: name.clone(),
            source,
        })?;
        debug!(%name, size = body.len(), "Writing artifact");

        let opts = PutOptions {
            attributes: self.attributes.clone(),
            ..Default::default()
        };
        self.store
            .put_opts(&Path::from(name.as_str()), body.into(), opts)
            .await
            .map_err(|source| StoreError::Write {
                name: name.clone(),
                source,
            })?;

        info!(url = %self.object_url(&name), "Artifact stored");
        Ok(WeatherArtifact { name, payload })
    }

    /// Names of all blobs starting with `prefix`, in backend order.
    ///
    /// A prefix without `/` (the default `weather_`) scans the whole bucket.
    /// Keys elsewhere in the bucket that are not valid object paths are
    /// skipped with a warning. Remote backends parse a listing page at a
    /// time, so such a key can still hide the rest of its page.
    #[instrument(skip(self), fields(bucket = %self.bucket))]
    pub async fn list(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        // object_store lists by whole path segments; narrow to the enclosing
        // directory and filter the final segment by name.
        let dir = prefix.rfind('/').map(|idx| Path::from(&prefix[..idx]));

        let mut names = Vec::new();
        let mut stream = self.store.list(dir.as_ref());
        while let Some(entry) = stream.next().await {
            let meta = match entry {
                Ok(meta) => meta,
                Err(err @ object_store::Error::InvalidPath { .. }) => {
                    warn!(%err, "Skipping unaddressable object");
                    continue;
                }
                Err(source) => {
                    return Err(StoreError::List {
                        prefix: prefix.to_string(),
                        source,
                    });
                }
            };
            let name = meta.location.to_string();
            if name.starts_with(prefix) {
                names.push(name);
            }
        }

        debug!(count = names.len(), "Listed artifacts");
        Ok(names)
    }

    /// Read back and parse a stored document.
    #[instrument(skip(self), fields(bucket = %self.bucket))]
    pub async fn get(&self, name: &str) -> Result<serde_json::Value, StoreError> {
        let not_found = || StoreError::NotFound {
            name: name.to_string(),
        };

        let location = Path::parse(name).map_err(|err| {
            warn!(%err, "Rejected artifact name");
            not_found()
        })?;
        if location.as_ref().is_empty() {
            return Err(not_found());
        }

        let result = self.store.get(&location).await.map_err(|err| {
            warn!(%err, "Artifact not readable");
            not_found()
        })?;
        let bytes = result.bytes().await.map_err(|err| {
            warn!(%err, "Artifact body not readable");
            not_found()
        })?;

        serde_json::from_slice(&bytes).map_err(|err| {
            warn!(%err, "Artifact is not valid JSON");
            not_found()
        })
    }
}

fn json_attributes() -> Attributes {
    let mut attributes = Attributes::new();
    attributes.insert(Attribute::ContentType, "application/json".into());
    attributes
}
