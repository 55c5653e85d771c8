//! Pipeline configuration
//!
//! Every field has a default matching the public si2pem endpoints, so an empty
//! TOML file (or no file at all) gives a working configuration.

use crate::wfs::FeatureLayer;
use crate::ScrapeError;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_REGISTRY_URL: &str = "https://si2pem.gov.pl/api/public/base_station";
pub const DEFAULT_WFS_URL: &str = "https://si2pem.gov.pl/geoserver/public/wfs";

/// Configuration for a station scraping run
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Registry lookup endpoint, queried with `search=<station id>`
    pub registry_url: String,
    /// WFS GetFeature endpoint
    pub wfs_url: String,
    /// Layers to query, in order (must not be empty)
    pub layers: Vec<FeatureLayer>,
    /// Worker threads used for PDF downloads (default: 5)
    pub max_concurrent_downloads: usize,
    /// Per-request timeout in seconds
    pub request_timeout_secs: u64,
    /// Directory the PDFs are saved to
    pub download_dir: PathBuf,
    /// CSV artifact written by the sink
    pub output_path: PathBuf,
    pub user_agent: String,
    /// Minimum delay between registry lookups in a batch (0 disables)
    pub registry_cooldown_ms: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            registry_url: DEFAULT_REGISTRY_URL.to_string(),
            wfs_url: DEFAULT_WFS_URL.to_string(),
            layers: FeatureLayer::ALL.to_vec(),
            max_concurrent_downloads: 5,
            request_timeout_secs: 30,
            download_dir: PathBuf::from("pdfs"),
            output_path: PathBuf::from("antenna_data.csv"),
            user_agent: concat!("azimuth-inspector/", env!("CARGO_PKG_VERSION")).to_string(),
            registry_cooldown_ms: 0,
        }
    }
}

impl PipelineConfig {
    /// Load a TOML configuration file; missing keys fall back to defaults
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ScrapeError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ScrapeError> {
        let config: PipelineConfig =
            toml::from_str(content).map_err(|e| ScrapeError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ScrapeError> {
        if self.layers.is_empty() {
            return Err(ScrapeError::Config("layer list must not be empty".into()));
        }
        if self.max_concurrent_downloads == 0 {
            return Err(ScrapeError::Config(
                "max_concurrent_downloads must be at least 1".into(),
            ));
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn registry_cooldown(&self) -> Duration {
        Duration::from_millis(self.registry_cooldown_ms)
    }
}
