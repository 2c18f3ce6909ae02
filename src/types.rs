use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One contact object as returned by the CRM
///
/// Properties stay opaque JSON: HubSpot sends `null` for unset fields and may
/// add bookkeeping properties (`createdate`, `hs_object_id`) we never read.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RawContactRecord {
    pub id: String,
    #[serde(default)]
    pub properties: Map<String, Value>,
}

impl RawContactRecord {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into(), properties: Map::new() }
    }

    /// Builder-style helper used by fixtures and tests
    pub fn with_property(mut self, key: &str, value: impl Into<String>) -> Self {
        self.properties.insert(key.to_string(), Value::String(value.into()));
        self
    }

    /// String value of a property; `None` when missing, null or non-string
    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).and_then(Value::as_str)
    }
}

/// Normalized contact ready for enrichment
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Contact {
    pub id: String,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    /// Never empty after normalization
    pub roles: Vec<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinates {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Finite and inside the WGS84 latitude/longitude ranges
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lng)
    }
}

/// Which path produced a contact's coordinates
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CoordinateSource {
    Resolved,
    Fallback,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EnrichedContact {
    #[serde(flatten)]
    pub contact: Contact,
    pub coordinates: Coordinates,
    pub coordinate_source: CoordinateSource,
}

impl EnrichedContact {
    pub fn marker_color(&self) -> &'static str {
        self.contact
            .roles
            .first()
            .map(|r| crate::constants::role_color(r))
            .unwrap_or(crate::constants::DEFAULT_ROLE_COLOR)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_raw_record_deserializes_null_properties() {
        let raw: RawContactRecord = serde_json::from_value(json!({
            "id": "151",
            "properties": {"firstname": "Ada", "lastname": null, "createdate": "2024-01-01"}
        }))
        .unwrap();

        assert_eq!(raw.property("firstname"), Some("Ada"));
        assert_eq!(raw.property("lastname"), None);
        assert_eq!(raw.property("address"), None);
    }

    #[test]
    fn test_raw_record_without_properties() {
        let raw: RawContactRecord = serde_json::from_value(json!({"id": "7"})).unwrap();
        assert!(raw.properties.is_empty());
    }

    #[test]
    fn test_coordinate_validity() {
        assert!(Coordinates::new(47.6, -122.3).is_valid());
        assert!(!Coordinates::new(91.0, 0.0).is_valid());
        assert!(!Coordinates::new(0.0, -180.5).is_valid());
        assert!(!Coordinates::new(f64::NAN, 0.0).is_valid());
    }

    #[test]
    fn test_enriched_contact_serializes_flat() {
        let enriched = EnrichedContact {
            contact: Contact {
                id: "1".into(),
                name: "Ada Lovelace".into(),
                email: String::new(),
                phone: String::new(),
                address: "Austin, TX".into(),
                roles: vec!["Geo Tech".into()],
            },
            coordinates: Coordinates::new(30.27, -97.74),
            coordinate_source: CoordinateSource::Resolved,
        };

        let value = serde_json::to_value(&enriched).unwrap();
        assert_eq!(value["name"], "Ada Lovelace");
        assert_eq!(value["coordinates"]["lng"], -97.74);
        assert_eq!(value["coordinate_source"], "resolved");
        assert_eq!(enriched.marker_color(), "#ff66cc");
    }
}
