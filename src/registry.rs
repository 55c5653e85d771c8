//! Station registry lookup
//!
//! The registry answers `?search=<id>` with a JSON array of matches. The first
//! match carries a `boundingbox` of four values ordered
//! `[min_lat, max_lat, min_lon, max_lon]`, either as numbers or numeric strings.

use crate::http::HttpSource;
use crate::record::StationId;
use crate::ScrapeError;
use log::{debug, info};
use serde_json::Value;

/// Geographic extent in EPSG:4326 degrees
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

impl BoundingBox {
    pub fn new(min_lat: f64, max_lat: f64, min_lon: f64, max_lon: f64) -> Result<Self, ScrapeError> {
        let values = [min_lat, max_lat, min_lon, max_lon];
        if values.iter().any(|v| !v.is_finite()) {
            return Err(ScrapeError::MalformedData(format!(
                "bounding box has non-finite component: {:?}",
                values
            )));
        }
        if min_lat > max_lat || min_lon > max_lon {
            return Err(ScrapeError::MalformedData(format!(
                "bounding box min exceeds max: {:?}",
                values
            )));
        }
        Ok(Self {
            min_lat,
            max_lat,
            min_lon,
            max_lon,
        })
    }

    /// Build from the registry's `[min_lat, max_lat, min_lon, max_lon]` ordering
    pub fn from_components(components: &[f64]) -> Result<Self, ScrapeError> {
        match components {
            [min_lat, max_lat, min_lon, max_lon] => {
                Self::new(*min_lat, *max_lat, *min_lon, *max_lon)
            }
            _ => Err(ScrapeError::MalformedData(format!(
                "bounding box must have 4 components, got {}",
                components.len()
            ))),
        }
    }

    /// WFS bbox parameter: `minLon,minLat,maxLon,maxLat,EPSG:4326`
    pub fn to_wfs_param(&self) -> String {
        format!(
            "{},{},{},{},EPSG:4326",
            self.min_lon, self.min_lat, self.max_lon, self.max_lat
        )
    }
}

/// Resolves station identifiers to bounding boxes via the registry API
pub struct StationResolver<H> {
    http: H,
    registry_url: String,
}

impl<H: HttpSource> StationResolver<H> {
    pub fn new(http: H, registry_url: impl Into<String>) -> Self {
        Self {
            http,
            registry_url: registry_url.into(),
        }
    }

    pub fn resolve(&self, id: &StationId) -> Result<BoundingBox, ScrapeError> {
        debug!("Looking up station {} at {}", id, self.registry_url);
        let response = self
            .http
            .get(&self.registry_url, &[("search", id.as_str())])?
            .error_for_status(&self.registry_url)?;

        let bbox = parse_registry_response(&response.body, id)?;
        info!("Station {} bounding box: {:?}", id, bbox);
        Ok(bbox)
    }
}

/// Parse a registry response body into the first match's bounding box
pub fn parse_registry_response(body: &[u8], id: &StationId) -> Result<BoundingBox, ScrapeError> {
    let value: Value = serde_json::from_slice(body)
        .map_err(|e| ScrapeError::MalformedData(format!("registry response is not JSON: {}", e)))?;

    let matches = value.as_array().ok_or_else(|| {
        ScrapeError::MalformedData("registry response is not a JSON array".into())
    })?;

    let first = matches
        .first()
        .ok_or_else(|| ScrapeError::NotFound(id.to_string()))?;

    let raw_box = first
        .get("boundingbox")
        .and_then(Value::as_array)
        .ok_or_else(|| {
            ScrapeError::MalformedData(format!("station {} has no boundingbox array", id))
        })?;

    let components = raw_box
        .iter()
        .map(coordinate_value)
        .collect::<Option<Vec<f64>>>()
        .ok_or_else(|| {
            ScrapeError::MalformedData(format!(
                "station {} boundingbox has non-numeric component: {:?}",
                id, raw_box
            ))
        })?;

    BoundingBox::from_components(&components)
}

fn coordinate_value(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id() -> StationId {
        StationId::new("12345").unwrap()
    }

    #[test]
    fn test_parse_numeric_strings() {
        let body = br#"[{"boundingbox": ["52.0", "52.5", "20.9", "21.2"]}, {"boundingbox": []}]"#;
        let bbox = parse_registry_response(body, &id()).unwrap();
        assert_eq!(bbox, BoundingBox::new(52.0, 52.5, 20.9, 21.2).unwrap());
    }

    #[test]
    fn test_parse_numbers() {
        let body = br#"[{"id": 12345, "boundingbox": [52.0, 52.5, 20.9, 21.2]}]"#;
        let bbox = parse_registry_response(body, &id()).unwrap();
        assert_eq!(bbox.max_lon, 21.2);
    }

    #[test]
    fn test_empty_array_is_not_found() {
        let err = parse_registry_response(b"[]", &id()).unwrap_err();
        assert!(matches!(err, ScrapeError::NotFound(ref s) if s == "12345"));
    }

    #[test]
    fn test_wrong_arity_is_malformed() {
        for body in [
            &br#"[{"boundingbox": [52.0, 52.5, 20.9]}]"#[..],
            &br#"[{"boundingbox": [52.0, 52.5, 20.9, 21.2, 0.0]}]"#[..],
            &br#"[{"boundingbox": []}]"#[..],
        ] {
            let err = parse_registry_response(body, &id()).unwrap_err();
            assert!(matches!(err, ScrapeError::MalformedData(_)), "{:?}", err);
        }
    }

    #[test]
    fn test_non_numeric_component_is_malformed() {
        let body = br#"[{"boundingbox": ["52.0", "north", "20.9", "21.2"]}]"#;
        let err = parse_registry_response(body, &id()).unwrap_err();
        assert!(matches!(err, ScrapeError::MalformedData(_)));
    }

    #[test]
    fn test_missing_box_and_non_array() {
        assert!(matches!(
            parse_registry_response(br#"[{"name": "x"}]"#, &id()),
            Err(ScrapeError::MalformedData(_))
        ));
        assert!(matches!(
            parse_registry_response(br#"{"boundingbox": [1, 2, 3, 4]}"#, &id()),
            Err(ScrapeError::MalformedData(_))
        ));
        assert!(matches!(
            parse_registry_response(b"<html>", &id()),
            Err(ScrapeError::MalformedData(_))
        ));
    }

    #[test]
    fn test_inverted_box_rejected() {
        assert!(BoundingBox::new(52.5, 52.0, 20.9, 21.2).is_err());
        assert!(BoundingBox::new(52.0, 52.5, 21.2, 20.9).is_err());
        assert!(BoundingBox::new(52.0, 52.0, 21.0, 21.0).is_ok());
    }

    #[test]
    fn test_wfs_param_order() {
        let bbox = BoundingBox::new(52.0, 52.5, 20.9, 21.2).unwrap();
        assert_eq!(bbox.to_wfs_param(), "20.9,52,21.2,52.5,EPSG:4326");
    }
}
