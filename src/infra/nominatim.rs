use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, instrument};

use crate::app::ports::GeocoderPort;
use crate::config::GeocoderConfig;
use crate::error::{GeocodeError, Result};
use crate::types::Coordinates;

/// OpenStreetMap Nominatim search client.
///
/// The usage policy requires an identifying User-Agent, which is set on the
/// underlying client so every request carries it. Spacing between requests is
/// the caller's job (see `RequestSpacer`).
pub struct NominatimGeocoder {
    client: reqwest::Client,
    base_url: String,
}

impl NominatimGeocoder {
    pub fn new(config: &GeocoderConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl GeocoderPort for NominatimGeocoder {
    #[instrument(skip(self))]
    async fn lookup(&self, address: &str) -> std::result::Result<Option<Coordinates>, GeocodeError> {
        let response = self
            .client
            .get(format!("{}/search", self.base_url))
            .query(&[("format", "json"), ("q", address)])
            .send()
            .await
            .map_err(|e| GeocodeError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(GeocodeError::Status(status.as_u16()));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| GeocodeError::Malformed(e.to_string()))?;
        let best = parse_best_match(&body)?;
        debug!(found = best.is_some(), "Geocoding lookup finished");
        Ok(best)
    }
}

/// First entry of a Nominatim result array; `lat`/`lon` arrive as strings
pub fn parse_best_match(body: &Value) -> std::result::Result<Option<Coordinates>, GeocodeError> {
    let places = body
        .as_array()
        .ok_or_else(|| GeocodeError::Malformed("expected a JSON array".into()))?;
    let Some(first) = places.first() else {
        return Ok(None);
    };

    let lat = coordinate_field(first, "lat")?;
    let lng = coordinate_field(first, "lon")?;
    Ok(Some(Coordinates::new(lat, lng)))
}

fn coordinate_field(place: &Value, key: &str) -> std::result::Result<f64, GeocodeError> {
    match place.get(key) {
        Some(Value::String(s)) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| GeocodeError::Malformed(format!("`{key}` is not a number: {s}"))),
        Some(Value::Number(n)) => n
            .as_f64()
            .ok_or_else(|| GeocodeError::Malformed(format!("`{key}` out of range"))),
        _ => Err(GeocodeError::Malformed(format!("missing `{key}`"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_best_match_takes_first_result() {
        let body = json!([
            {"lat": "30.2711286", "lon": "-97.7436995", "display_name": "Austin, Texas"},
            {"lat": "0", "lon": "0"}
        ]);
        let coords = parse_best_match(&body).unwrap().unwrap();
        assert!((coords.lat - 30.2711286).abs() < 1e-9);
        assert!((coords.lng + 97.7436995).abs() < 1e-9);
    }

    #[test]
    fn test_empty_result_is_not_found() {
        assert_eq!(parse_best_match(&json!([])).unwrap(), None);
    }

    #[test]
    fn test_malformed_bodies() {
        assert!(matches!(parse_best_match(&json!({"error": "x"})), Err(GeocodeError::Malformed(_))));
        assert!(matches!(parse_best_match(&json!([{"lat": "abc", "lon": "1"}])), Err(GeocodeError::Malformed(_))));
        assert!(matches!(parse_best_match(&json!([{"lat": "1"}])), Err(GeocodeError::Malformed(_))));
    }

    #[test]
    fn test_numeric_fields_accepted() {
        let coords = parse_best_match(&json!([{"lat": 51.5, "lon": -0.12}])).unwrap().unwrap();
        assert_eq!(coords, Coordinates::new(51.5, -0.12));
    }
}
