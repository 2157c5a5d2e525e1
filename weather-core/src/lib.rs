//! Core library for the weather archive service.
//!
//! This crate defines:
//! - Configuration (TOML file plus environment overrides)
//! - Validation of fetch requests into [`WeatherQuery`]
//! - Abstraction over the historical-weather provider
//! - The artifact store gateway that names, writes, lists and reads documents
//! - The HTTP router exposing those operations
//!
//! It is used by `weather-cli`, but can also be reused by other binaries or services.

pub mod api;
pub mod config;
pub mod model;
pub mod provider;
pub mod service;
pub mod store;
pub mod validate;

pub use api::create_router;
pub use config::{Config, StorageBackend, UpstreamConfig};
pub use model::{FileList, StoreReceipt, WeatherArtifact, WeatherQuery};
pub use provider::{FetchError, WeatherProvider, provider_from_config};
pub use service::{ServiceError, WeatherService};
pub use store::{ARTIFACT_PREFIX, ArtifactStore, StoreError, artifact_name};
pub use validate::ValidationError;
