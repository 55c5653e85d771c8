//! Base-station measurement report scraping and azimuth extraction
//!
//! This crate provides:
//! - Station lookup in the public registry (identifier to bounding box)
//! - WFS feature queries across frequency-band layers to find report PDFs
//! - Bounded parallel download of the referenced reports
//! - Table extraction from the report page that lists antenna sectors
//! - CSV export of the per-document results

pub mod azimuth;
pub mod config;
pub mod extractor;
pub mod fetcher;
pub mod http;
pub mod pipeline;
pub mod rate_limit;
pub mod record;
pub mod registry;
pub mod sink;
pub mod tables;
pub mod wfs;

pub use azimuth::AzimuthTableExtractor;
pub use config::PipelineConfig;
pub use fetcher::{DocumentFetcher, DocumentReference, DownloadedDocument};
pub use http::{HttpClient, HttpResponse, HttpSource};
pub use pipeline::StationPipeline;
pub use rate_limit::RateLimiter;
pub use record::{ExtractedRecord, ExtractionStatus, RecordOutcome, StationId, StationResultSet};
pub use registry::{BoundingBox, StationResolver};
pub use sink::{ExportRow, ResultSink};
pub use wfs::{FeatureLayer, FeatureQueryClient};

use std::path::Path;

/// Run the extraction stage alone against a PDF already on disk
///
/// Useful for re-processing a download directory without touching the network.
pub fn extract_local_pdf<P: AsRef<Path>>(path: P, station_id: &StationId) -> ExtractedRecord {
    let document = DownloadedDocument::local(path.as_ref());
    AzimuthTableExtractor::new().extract(&document, station_id)
}

#[derive(Debug, thiserror::Error)]
pub enum ScrapeError {
    #[error("transport error for {url}: {reason}")]
    Transport { url: String, reason: String },
    #[error("malformed data: {0}")]
    MalformedData(String),
    #[error("station {0} not found in registry")]
    NotFound(String),
    #[error("station identifier must not be empty")]
    EmptyStationId,
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("PDF parsing error: {0}")]
    Pdf(String),
    #[error("configuration error: {0}")]
    Config(String),
}

impl From<lopdf::Error> for ScrapeError {
    fn from(e: lopdf::Error) -> Self {
        ScrapeError::Pdf(e.to_string())
    }
}

impl ScrapeError {
    pub(crate) fn transport(url: &str, reason: impl ToString) -> Self {
        ScrapeError::Transport {
            url: url.to_string(),
            reason: reason.to_string(),
        }
    }
}
