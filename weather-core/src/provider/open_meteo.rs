use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, warn};

use crate::{config::UpstreamConfig, model::WeatherQuery};

use super::{DAILY_VARIABLES, FetchError, WeatherProvider};

/// Open-Meteo historical archive client.
#[derive(Debug, Clone)]
pub struct OpenMeteoProvider {
    base_url: String,
    timezone: String,
    http: Client,
}

impl OpenMeteoProvider {
    pub fn new(config: &UpstreamConfig) -> Result<Self, FetchError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(FetchError::Client)?;

        Ok(Self {
            base_url: config.base_url.clone(),
            timezone: config.timezone.clone(),
            http,
        })
    }

    fn query_params(&self, query: &WeatherQuery) -> [(&'static str, String); 6] {
        [
            ("latitude", query.latitude().to_string()),
            ("longitude", query.longitude().to_string()),
            ("start_date", query.start_date().format("%Y-%m-%d").to_string()),
            ("end_date", query.end_date().format("%Y-%m-%d").to_string()),
            ("daily", DAILY_VARIABLES.join(",")),
            ("timezone", self.timezone.clone()),
        ]
    }
}

#[async_trait]
impl WeatherProvider for OpenMeteoProvider {
    async fn fetch(&self, query: &WeatherQuery) -> Result<serde_json::Value, FetchError> {
        let res = self
            .http
            .get(&self.base_url)
            .query(&self.query_params(query)[..])
            .send()
            .await
            .map_err(FetchError::Transport)?;

        let status = res.status();
        let body = res.text().await.map_err(FetchError::Transport)?;

        if !status.is_success() {
            warn!(%status, "Open-Meteo returned an error status");
            return Err(FetchError::Status {
                status: status.as_u16(),
                body: truncate_body(&body),
            });
        }

        debug!(bytes = body.len(), "Open-Meteo response received");
        Ok(serde_json::from_str(&body)?)
    }
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}
