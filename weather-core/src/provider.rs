use crate::{config::UpstreamConfig, model::WeatherQuery, provider::open_meteo::OpenMeteoProvider};
use async_trait::async_trait;
use std::{fmt::Debug, sync::Arc};
use thiserror::Error;

pub mod open_meteo;

/// Daily variables requested from the upstream archive. Not user-selectable.
pub const DAILY_VARIABLES: [&str; 6] = [
    "temperature_2m_max",
    "temperature_2m_min",
    "temperature_2m_mean",
    "apparent_temperature_max",
    "apparent_temperature_min",
    "apparent_temperature_mean",
];

/// Failure to obtain a usable document from the upstream provider.
///
/// Callers treat every variant the same way; the split exists for logs.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("Failed to send request to weather provider: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("Weather provider request failed with status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Failed to parse weather provider JSON: {0}")]
    Decode(#[from] serde_json::Error),
}

#[async_trait]
pub trait WeatherProvider: Send + Sync + Debug {
    /// Fetch the daily series for `query`, returning the provider's JSON body untouched.
    async fn fetch(&self, query: &WeatherQuery) -> Result<serde_json::Value, FetchError>;
}

/// Construct the upstream provider from config.
pub fn provider_from_config(
    config: &UpstreamConfig,
) -> Result<Arc<dyn WeatherProvider>, FetchError> {
    Ok(Arc::new(OpenMeteoProvider::new(config)?))
}
