//! WFS GetFeature queries for measurement report references
//!
//! Each frequency band is published as its own feature type. A query returns a
//! GeoJSON feature collection whose feature properties point at report PDFs.

use crate::fetcher::DocumentReference;
use crate::http::HttpSource;
use crate::registry::BoundingBox;
use crate::ScrapeError;
use log::{debug, info};
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Property keys that may hold the report URL, tried in order
pub const PDF_URL_KEYS: &[&str] = &["url", "pdf_url", "PDF_URL"];

/// Frequency-band measurement layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
pub enum FeatureLayer {
    #[serde(rename = "all", alias = "public:measures_all")]
    All,
    #[serde(rename = "7", alias = "public:measures_7")]
    Band7,
    #[serde(rename = "7-14", alias = "public:measures_7_14")]
    Band7To14,
    #[serde(rename = "14-21", alias = "public:measures_14_21")]
    Band14To21,
    #[serde(rename = "21-28", alias = "public:measures_21_28")]
    Band21To28,
    #[serde(rename = "28+", alias = "public:measures_28")]
    Band28Plus,
}

impl FeatureLayer {
    pub const ALL: [FeatureLayer; 6] = [
        FeatureLayer::All,
        FeatureLayer::Band7,
        FeatureLayer::Band7To14,
        FeatureLayer::Band14To21,
        FeatureLayer::Band21To28,
        FeatureLayer::Band28Plus,
    ];

    pub fn tag(&self) -> &'static str {
        match self {
            FeatureLayer::All => "all",
            FeatureLayer::Band7 => "7",
            FeatureLayer::Band7To14 => "7-14",
            FeatureLayer::Band14To21 => "14-21",
            FeatureLayer::Band21To28 => "21-28",
            FeatureLayer::Band28Plus => "28+",
        }
    }

    /// WFS `typeName` of this layer
    pub fn type_name(&self) -> &'static str {
        match self {
            FeatureLayer::All => "public:measures_all",
            FeatureLayer::Band7 => "public:measures_7",
            FeatureLayer::Band7To14 => "public:measures_7_14",
            FeatureLayer::Band14To21 => "public:measures_14_21",
            FeatureLayer::Band21To28 => "public:measures_21_28",
            FeatureLayer::Band28Plus => "public:measures_28",
        }
    }
}

impl fmt::Display for FeatureLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name())
    }
}

impl FromStr for FeatureLayer {
    type Err = ScrapeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FeatureLayer::ALL
            .iter()
            .find(|layer| layer.tag() == s || layer.type_name() == s)
            .copied()
            .ok_or_else(|| ScrapeError::Config(format!("unknown feature layer '{}'", s)))
    }
}

/// Issues GetFeature queries against one WFS endpoint
pub struct FeatureQueryClient<H> {
    http: H,
    wfs_url: String,
}

impl<H: HttpSource> FeatureQueryClient<H> {
    pub fn new(http: H, wfs_url: impl Into<String>) -> Self {
        Self {
            http,
            wfs_url: wfs_url.into(),
        }
    }

    /// Report references from one layer; an empty set means no coverage
    pub fn query_layer(
        &self,
        bbox: &BoundingBox,
        layer: FeatureLayer,
    ) -> Result<BTreeSet<DocumentReference>, ScrapeError> {
        let params = layer_query_params(bbox, layer);
        let query: Vec<(&str, &str)> = params.iter().map(|(k, v)| (*k, v.as_str())).collect();

        debug!("WFS GetFeature for layer '{}' bbox {}", layer, bbox.to_wfs_param());
        let response = self
            .http
            .get(&self.wfs_url, &query)?
            .error_for_status(&self.wfs_url)?;

        let references = parse_feature_collection(&response.body)?;
        if references.is_empty() {
            info!("No PDFs found in layer '{}'", layer);
        } else {
            info!("Found {} PDFs in layer '{}'", references.len(), layer);
        }
        Ok(references)
    }

    /// Union of the references of every layer, in layer order
    ///
    /// A failing layer aborts the whole collection.
    pub fn collect_references(
        &self,
        bbox: &BoundingBox,
        layers: &[FeatureLayer],
    ) -> Result<BTreeSet<DocumentReference>, ScrapeError> {
        let mut all = BTreeSet::new();
        for &layer in layers {
            all.extend(self.query_layer(bbox, layer)?);
        }
        info!("Total unique PDFs: {}", all.len());
        Ok(all)
    }
}

/// GetFeature query parameters for one layer, in the order they are sent
pub fn layer_query_params(bbox: &BoundingBox, layer: FeatureLayer) -> Vec<(&'static str, String)> {
    vec![
        ("service", "WFS".to_string()),
        ("version", "1.0.0".to_string()),
        ("request", "GetFeature".to_string()),
        ("typeName", layer.type_name().to_string()),
        ("outputFormat", "application/json".to_string()),
        ("bbox", bbox.to_wfs_param()),
    ]
}

/// Extract report references from a GeoJSON feature collection body
///
/// Empty bodies and collections without a `features` array yield an empty
/// set; bodies that are not JSON at all are malformed.
pub fn parse_feature_collection(body: &[u8]) -> Result<BTreeSet<DocumentReference>, ScrapeError> {
    if body.iter().all(|b| b.is_ascii_whitespace()) {
        return Ok(BTreeSet::new());
    }

    let value: Value = serde_json::from_slice(body)
        .map_err(|e| ScrapeError::MalformedData(format!("WFS response is not JSON: {}", e)))?;

    let features = match value.get("features").and_then(Value::as_array) {
        Some(features) => features,
        None => return Ok(BTreeSet::new()),
    };

    Ok(features
        .iter()
        .filter_map(|feature| feature.get("properties"))
        .filter_map(pdf_url_from_properties)
        .map(DocumentReference::new)
        .collect())
}

fn pdf_url_from_properties(properties: &Value) -> Option<&str> {
    PDF_URL_KEYS.iter().find_map(|key| {
        properties
            .get(*key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|url| !url.is_empty())
    })
}
