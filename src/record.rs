//! Per-document extraction results and the per-station result set

use crate::ScrapeError;
use std::fmt;

/// Registry key of a transmitter installation
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StationId(String);

impl StationId {
    /// Build an identifier from user input, trimming surrounding whitespace
    pub fn new(raw: impl AsRef<str>) -> Result<Self, ScrapeError> {
        let trimmed = raw.as_ref().trim();
        if trimmed.is_empty() {
            return Err(ScrapeError::EmptyStationId);
        }
        Ok(StationId(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for StationId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Terminal status of a document that did not yield azimuths
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionStatus {
    FileMissing,
    NoTable,
    NoText,
    StationIdNotFound,
    NoAzimuthColumn,
    NoAzimuthsFound,
}

impl ExtractionStatus {
    /// Status string as written to the exported artifact
    pub fn as_str(&self) -> &'static str {
        match self {
            ExtractionStatus::FileMissing => "file missing",
            ExtractionStatus::NoTable => "no table",
            ExtractionStatus::NoText => "no text",
            ExtractionStatus::StationIdNotFound => "station id not found",
            ExtractionStatus::NoAzimuthColumn => "no azimuth column",
            ExtractionStatus::NoAzimuthsFound => "no azimuths found",
        }
    }
}

impl fmt::Display for ExtractionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Either the sector values read from the table or the gate that stopped extraction
#[derive(Debug, Clone, PartialEq)]
pub enum RecordOutcome {
    Sectors {
        /// Normalized `"<deg>°"` values, or raw cell text for unparseable cells
        azimuths: Vec<String>,
        /// Tilt values from tilt columns, when the table has any
        tilts: Vec<String>,
    },
    Failed(ExtractionStatus),
}

/// Result of processing one downloaded document
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedRecord {
    pub station_id: StationId,
    /// File name of the source PDF (final URL path segment)
    pub pdf_file: String,
    pub outcome: RecordOutcome,
}

impl ExtractedRecord {
    pub fn failed(station_id: StationId, pdf_file: String, status: ExtractionStatus) -> Self {
        Self {
            station_id,
            pdf_file,
            outcome: RecordOutcome::Failed(status),
        }
    }

    pub fn azimuths(&self) -> Option<&[String]> {
        match &self.outcome {
            RecordOutcome::Sectors { azimuths, .. } => Some(azimuths),
            RecordOutcome::Failed(_) => None,
        }
    }

    pub fn tilts(&self) -> Option<&[String]> {
        match &self.outcome {
            RecordOutcome::Sectors { tilts, .. } => Some(tilts),
            RecordOutcome::Failed(_) => None,
        }
    }

    pub fn status(&self) -> Option<ExtractionStatus> {
        match self.outcome {
            RecordOutcome::Failed(status) => Some(status),
            RecordOutcome::Sectors { .. } => None,
        }
    }

    /// Value of the `Azymuts` column: joined azimuths or the status string
    pub fn azimuth_column(&self) -> String {
        match &self.outcome {
            RecordOutcome::Sectors { azimuths, .. } => azimuths.join(", "),
            RecordOutcome::Failed(status) => status.as_str().to_string(),
        }
    }
}

/// All records produced for one station, ordered by PDF file name
#[derive(Debug, Clone, PartialEq)]
pub struct StationResultSet {
    pub station_id: StationId,
    pub records: Vec<ExtractedRecord>,
}

impl StationResultSet {
    pub fn empty(station_id: StationId) -> Self {
        Self {
            station_id,
            records: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records that produced at least one azimuth
    pub fn successes(&self) -> impl Iterator<Item = &ExtractedRecord> {
        self.records.iter().filter(|r| r.azimuths().is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_station_id_trims_input() {
        let id = StationId::new("  12345\n").unwrap();
        assert_eq!(id.as_str(), "12345");
    }

    #[test]
    fn test_station_id_rejects_blank() {
        assert!(matches!(
            StationId::new("   "),
            Err(ScrapeError::EmptyStationId)
        ));
    }

    #[test]
    fn test_azimuth_column_joins_values() {
        let record = ExtractedRecord {
            station_id: StationId::new("1").unwrap(),
            pdf_file: "a.pdf".into(),
            outcome: RecordOutcome::Sectors {
                azimuths: vec!["0°".into(), "120°".into(), "240°".into()],
                tilts: vec![],
            },
        };
        assert_eq!(record.azimuth_column(), "0°, 120°, 240°");
        assert_eq!(record.status(), None);
    }

    #[test]
    fn test_azimuth_column_uses_status_string() {
        let record = ExtractedRecord::failed(
            StationId::new("1").unwrap(),
            "a.pdf".into(),
            ExtractionStatus::StationIdNotFound,
        );
        assert_eq!(record.azimuth_column(), "station id not found");
        assert!(record.azimuths().is_none());
    }
}
