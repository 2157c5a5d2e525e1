//! HTTP surface.
//!
//! The only place where typed errors become status codes and JSON bodies.

use std::sync::Arc;

use axum::{
    Json, Router,
    body::Bytes,
    extract::{Path, State, rejection::PathRejection},
    http::{StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde_json::{Value, json};
use tower_http::trace::TraceLayer;
use tracing::{error, warn};

use crate::{
    model::{ErrorBody, FileList, StoreReceipt},
    service::{ServiceError, WeatherService},
    store::StoreError,
};

pub const STORE_FAILED: &str = "Failed to store weather data in GCS.";
pub const LIST_FAILED: &str = "Failed to retrieve file list from GCS.";
pub const FETCH_FAILED: &str = "Failed to fetch weather data from external API.";

/// Shared, read-only request state built once at startup.
#[derive(Debug, Clone)]
pub struct AppState {
    pub service: WeatherService,
}

pub fn create_router(service: WeatherService) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/store-weather-data", post(store_weather_data))
        .route("/list-weather-files", get(list_weather_files))
        .route("/weather-file-content/{*file_name}", get(weather_file_content))
        .layer(TraceLayer::new_for_http())
        .with_state(Arc::new(AppState { service }))
}

async fn index() -> Json<Value> {
    Json(json!({ "message": "Welcome to the Weather Data Service API!" }))
}

async fn store_weather_data(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<(StatusCode, Json<StoreReceipt>), ServiceError> {
    let receipt = state.service.store_weather_json(&body).await?;
    Ok((StatusCode::CREATED, Json(receipt)))
}

/// File names come back in whatever order the backend lists them.
async fn list_weather_files(
    State(state): State<Arc<AppState>>,
) -> Result<Json<FileList>, ServiceError> {
    Ok(Json(state.service.list_files().await?))
}

const FILE_CONTENT_ROUTE: &str = "/weather-file-content/";

/// Names that do not percent-decode to UTF-8 are reported like any other
/// unknown file, echoing the raw request path.
async fn weather_file_content(
    State(state): State<Arc<AppState>>,
    uri: Uri,
    file_name: Result<Path<String>, PathRejection>,
) -> Result<Json<Value>, ServiceError> {
    let file_name = match file_name {
        Ok(Path(name)) => name,
        Err(rejection) => {
            let name = uri
                .path()
                .strip_prefix(FILE_CONTENT_ROUTE)
                .unwrap_or(uri.path())
                .to_string();
            warn!(%rejection, %name, "Undecodable file name");
            return Err(StoreError::NotFound { name }.into());
        }
    };
    Ok(Json(state.service.file_content(&file_name).await?))
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ServiceError::Validation(err) => {
                warn!(%err, "Rejected store request");
                (StatusCode::BAD_REQUEST, err.to_string())
            }
            ServiceError::Fetch(err) => {
                error!(%err, "Weather provider call failed");
                (StatusCode::BAD_GATEWAY, FETCH_FAILED.to_string())
            }
            ServiceError::Store(err @ StoreError::NotFound { .. }) => {
                (StatusCode::NOT_FOUND, err.to_string())
            }
            ServiceError::Store(err @ StoreError::List { .. }) => {
                error!(%err, "Listing artifacts failed");
                (StatusCode::INTERNAL_SERVER_ERROR, LIST_FAILED.to_string())
            }
            ServiceError::Store(err) => {
                error!(%err, "Storing artifact failed");
                (StatusCode::INTERNAL_SERVER_ERROR, STORE_FAILED.to_string())
            }
        };

        (status, Json(ErrorBody { error: message })).into_response()
    }
}
