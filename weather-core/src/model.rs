use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::validate::ValidationError;

pub const LATITUDE_RANGE: (f64, f64) = (-90.0, 90.0);
pub const LONGITUDE_RANGE: (f64, f64) = (-180.0, 180.0);

/// A validated request for historical weather over a date range.
///
/// Only obtainable through [`WeatherQuery::new`] or the validator, so every
/// instance has in-range coordinates and `start_date <= end_date`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeatherQuery {
    latitude: f64,
    longitude: f64,
    start_date: NaiveDate,
    end_date: NaiveDate,
}

impl WeatherQuery {
    pub fn new(
        latitude: f64,
        longitude: f64,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Self, ValidationError> {
        let mut out_of_range = Vec::new();
        if !in_range(latitude, LATITUDE_RANGE) {
            out_of_range.push("latitude");
        }
        if !in_range(longitude, LONGITUDE_RANGE) {
            out_of_range.push("longitude");
        }
        if !out_of_range.is_empty() {
            return Err(ValidationError::OutOfRange(out_of_range));
        }

        if start_date > end_date {
            return Err(ValidationError::DateOrder {
                start: start_date,
                end: end_date,
            });
        }

        Ok(Self {
            latitude,
            longitude,
            start_date,
            end_date,
        })
    }

    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    pub fn longitude(&self) -> f64 {
        self.longitude
    }

    pub fn start_date(&self) -> NaiveDate {
        self.start_date
    }

    pub fn end_date(&self) -> NaiveDate {
        self.end_date
    }
}

fn in_range(value: f64, (min, max): (f64, f64)) -> bool {
    value.is_finite() && value >= min && value <= max
}

/// A stored upstream response and the key it lives under.
#[derive(Debug, Clone, PartialEq)]
pub struct WeatherArtifact {
    pub name: String,
    pub payload: serde_json::Value,
}

/// Body returned after a successful fetch-and-store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreReceipt {
    pub message: String,
    pub file_name: String,
    pub gcs_path: String,
}

/// Body returned by the listing endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileList {
    pub bucket: String,
    pub files: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}
