use std::sync::Arc;
use thiserror::Error;
use tracing::info;

use crate::{
    model::{FileList, StoreReceipt, WeatherQuery},
    provider::{FetchError, WeatherProvider},
    store::{ARTIFACT_PREFIX, ArtifactStore, StoreError},
    validate::ValidationError,
};

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Validate, fetch and store pipeline plus read-back of stored artifacts.
///
/// Holds no mutable state; clones share the same provider and store.
#[derive(Debug, Clone)]
pub struct WeatherService {
    provider: Arc<dyn WeatherProvider>,
    store: ArtifactStore,
}

impl WeatherService {
    pub fn new(provider: Arc<dyn WeatherProvider>, store: ArtifactStore) -> Self {
        Self { provider, store }
    }

    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }

    /// Validate a raw request body, then fetch and store.
    pub async fn store_weather_json(&self, body: &[u8]) -> Result<StoreReceipt, ServiceError> {
        let query = WeatherQuery::from_body(body)?;
        self.store_weather(&query).await
    }

    pub async fn store_weather(&self, query: &WeatherQuery) -> Result<StoreReceipt, ServiceError> {
        info!(
            latitude = query.latitude(),
            longitude = query.longitude(),
            start_date = %query.start_date(),
            end_date = %query.end_date(),
            "Fetching weather data"
        );
        let payload = self.provider.fetch(query).await?;
        let artifact = self.store.put(query, payload).await?;

        Ok(StoreReceipt {
            message: "Weather data fetched and stored successfully.".to_string(),
            gcs_path: self.store.object_url(&artifact.name),
            file_name: artifact.name,
        })
    }

    /// Artifacts under the default `weather_` prefix, in backend order.
    pub async fn list_files(&self) -> Result<FileList, ServiceError> {
        self.list_files_with_prefix(ARTIFACT_PREFIX).await
    }

    pub async fn list_files_with_prefix(&self, prefix: &str) -> Result<FileList, ServiceError> {
        let files = self.store.list(prefix).await?;
        Ok(FileList {
            bucket: self.store.bucket().to_string(),
            files,
        })
    }

    pub async fn file_content(&self, name: &str) -> Result<serde_json::Value, ServiceError> {
        Ok(self.store.get(name).await?)
    }
}
