//! Request validation for the fetch-and-store operation.
//!
//! Pure functions from loosely-typed input to a [`WeatherQuery`]. Each stage
//! reports every offending field at once rather than stopping at the first.

use chrono::NaiveDate;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::model::WeatherQuery;

pub const REQUIRED_FIELDS: [&str; 4] = ["latitude", "longitude", "start_date", "end_date"];

const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("Invalid request: No JSON payload received.")]
    EmptyPayload,

    #[error("Invalid request: Malformed JSON.")]
    MalformedJson,

    #[error("Missing parameters: {}", .0.join(", "))]
    Missing(Vec<&'static str>),

    #[error("Invalid data type for {}. Must be float or integer.", .0.join(", "))]
    NotANumber(Vec<&'static str>),

    #[error("Invalid date format for {}. Use YYYY-MM-DD.", .0.join(", "))]
    BadDate(Vec<&'static str>),

    #[error(
        "Out of range value for {}. Latitude must be within [-90, 90] and longitude within [-180, 180].",
        .0.join(", ")
    )]
    OutOfRange(Vec<&'static str>),

    #[error("start_date {start} is later than end_date {end}.")]
    DateOrder { start: NaiveDate, end: NaiveDate },
}

impl WeatherQuery {
    /// Parse a raw request body.
    pub fn from_body(body: &[u8]) -> Result<Self, ValidationError> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Err(ValidationError::EmptyPayload);
        }
        let value: Value =
            serde_json::from_slice(body).map_err(|_| ValidationError::MalformedJson)?;
        Self::from_value(&value)
    }

    /// Validate an already-decoded JSON document.
    pub fn from_value(value: &Value) -> Result<Self, ValidationError> {
        match value {
            Value::Object(map) => Self::from_map(map),
            _ => Err(ValidationError::EmptyPayload),
        }
    }

    /// Validate a free-form mapping of request parameters.
    ///
    /// `null` values count as missing. Coordinates must be JSON numbers and
    /// dates must be `YYYY-MM-DD` strings.
    pub fn from_map(map: &Map<String, Value>) -> Result<Self, ValidationError> {
        let field = |name: &str| map.get(name).filter(|v| !v.is_null());

        let missing: Vec<&'static str> = REQUIRED_FIELDS
            .into_iter()
            .filter(|name| field(*name).is_none())
            .collect();
        if !missing.is_empty() {
            return Err(ValidationError::Missing(missing));
        }

        let latitude = field("latitude").and_then(Value::as_f64);
        let longitude = field("longitude").and_then(Value::as_f64);
        let (Some(latitude), Some(longitude)) = (latitude, longitude) else {
            let mut bad = Vec::new();
            if latitude.is_none() {
                bad.push("latitude");
            }
            if longitude.is_none() {
                bad.push("longitude");
            }
            return Err(ValidationError::NotANumber(bad));
        };

        let start_date = field("start_date").and_then(parse_date);
        let end_date = field("end_date").and_then(parse_date);
        let (Some(start_date), Some(end_date)) = (start_date, end_date) else {
            let mut bad = Vec::new();
            if start_date.is_none() {
                bad.push("start_date");
            }
            if end_date.is_none() {
                bad.push("end_date");
            }
            return Err(ValidationError::BadDate(bad));
        };

        WeatherQuery::new(latitude, longitude, start_date, end_date)
    }
}

fn parse_date(value: &Value) -> Option<NaiveDate> {
    value
        .as_str()
        .and_then(|s| NaiveDate::parse_from_str(s, DATE_FORMAT).ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn berlin() -> Value {
        json!({
            "latitude": 52.52,
            "longitude": 13.41,
            "start_date": "2023-01-01",
            "end_date": "2023-01-05",
        })
    }

    #[test]
    fn parses_valid_request() {
        let q = WeatherQuery::from_value(&berlin()).expect("valid request");
        assert_eq!(q.latitude(), 52.52);
        assert_eq!(q.longitude(), 13.41);
        assert_eq!(q.start_date().to_string(), "2023-01-01");
        assert_eq!(q.end_date().to_string(), "2023-01-05");
    }

    #[test]
    fn integer_coordinates_are_accepted() {
        let mut req = berlin();
        req["latitude"] = json!(52);
        req["longitude"] = json!(-13);
        let q = WeatherQuery::from_value(&req).unwrap();
        assert_eq!(q.latitude(), 52.0);
        assert_eq!(q.longitude(), -13.0);
    }

    #[test]
    fn missing_latitude_is_named() {
        let mut req = berlin();
        req.as_object_mut().unwrap().remove("latitude");
        let err = WeatherQuery::from_value(&req).unwrap_err();
        assert_eq!(err, ValidationError::Missing(vec!["latitude"]));
        assert_eq!(err.to_string(), "Missing parameters: latitude");
    }

    #[test]
    fn every_missing_field_is_listed() {
        let err = WeatherQuery::from_value(&json!({ "longitude": 1.0 })).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Missing parameters: latitude, start_date, end_date"
        );
    }

    #[test]
    fn null_counts_as_missing() {
        let mut req = berlin();
        req["end_date"] = Value::Null;
        let err = WeatherQuery::from_value(&req).unwrap_err();
        assert_eq!(err, ValidationError::Missing(vec!["end_date"]));
    }

    #[test]
    fn non_numeric_coordinates_are_rejected() {
        let mut req = berlin();
        req["latitude"] = json!("north");
        req["longitude"] = json!(true);
        let err = WeatherQuery::from_value(&req).unwrap_err();
        assert_eq!(err, ValidationError::NotANumber(vec!["latitude", "longitude"]));
        assert!(err.to_string().contains("Must be float or integer"));
    }

    #[test]
    fn malformed_dates_are_rejected() {
        let mut req = berlin();
        req["start_date"] = json!("01-03-2023");
        req["end_date"] = json!("2023-15-01");
        let err = WeatherQuery::from_value(&req).unwrap_err();
        assert_eq!(err, ValidationError::BadDate(vec!["start_date", "end_date"]));
        assert!(err.to_string().ends_with("Use YYYY-MM-DD."));
    }

    #[test]
    fn non_string_date_is_rejected() {
        let mut req = berlin();
        req["end_date"] = json!(20230105);
        let err = WeatherQuery::from_value(&req).unwrap_err();
        assert_eq!(err, ValidationError::BadDate(vec!["end_date"]));
    }

    #[test]
    fn reversed_dates_are_rejected() {
        let mut req = berlin();
        req["start_date"] = json!("2023-01-06");
        let err = WeatherQuery::from_value(&req).unwrap_err();
        assert!(matches!(err, ValidationError::DateOrder { .. }));
    }

    #[test]
    fn empty_and_non_object_bodies() {
        assert_eq!(
            WeatherQuery::from_body(b"").unwrap_err(),
            ValidationError::EmptyPayload
        );
        assert_eq!(
            WeatherQuery::from_body(b"  \n").unwrap_err(),
            ValidationError::EmptyPayload
        );
        assert_eq!(
            WeatherQuery::from_body(b"null").unwrap_err(),
            ValidationError::EmptyPayload
        );
        assert_eq!(
            WeatherQuery::from_body(b"[1, 2]").unwrap_err(),
            ValidationError::EmptyPayload
        );
    }

    #[test]
    fn malformed_body() {
        assert_eq!(
            WeatherQuery::from_body(b"{\"latitude\": ").unwrap_err(),
            ValidationError::MalformedJson
        );
    }

    #[test]
    fn body_round_trips_into_query() {
        let body = serde_json::to_vec(&berlin()).unwrap();
        assert!(WeatherQuery::from_body(&body).is_ok());
    }
}
