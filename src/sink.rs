//! CSV export of extraction records

use crate::record::ExtractedRecord;
use crate::ScrapeError;
use log::info;
use std::path::{Path, PathBuf};

pub const HEADER: [&str; 3] = ["Station ID", "PDF File", "Azymuts"];

/// One row of an exported artifact, as read back from disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportRow {
    pub station_id: String,
    pub pdf_file: String,
    /// Joined azimuth list or a status string
    pub azymuts: String,
}

impl ExportRow {
    /// Split the azimuth column back into values; status strings come back as one value
    pub fn azimuth_values(&self) -> Vec<&str> {
        self.azymuts.split(", ").collect()
    }
}

/// Writes records to a CSV file, replacing previous contents
#[derive(Debug, Clone)]
pub struct ResultSink {
    path: PathBuf,
}

impl ResultSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Export the records; an empty list leaves the destination untouched
    pub fn export(&self, records: &[ExtractedRecord]) -> Result<(), ScrapeError> {
        if records.is_empty() {
            info!("No data to export");
            return Ok(());
        }

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let mut writer = csv::Writer::from_path(&self.path)?;
        writer.write_record(HEADER)?;
        for record in records {
            writer.write_record([
                record.station_id.as_str(),
                record.pdf_file.as_str(),
                record.azimuth_column().as_str(),
            ])?;
        }
        writer.flush()?;

        info!("Exported {} records to {}", records.len(), self.path.display());
        Ok(())
    }

    /// Read an exported artifact back
    pub fn read<P: AsRef<Path>>(path: P) -> Result<Vec<ExportRow>, ScrapeError> {
        let mut reader = csv::Reader::from_path(path)?;

        let headers = reader.headers()?.clone();
        if headers.iter().ne(HEADER.iter().copied()) {
            return Err(ScrapeError::MalformedData(format!(
                "unexpected CSV header: {:?}",
                headers
            )));
        }

        let mut rows = Vec::new();
        for result in reader.records() {
            let record = result?;
            let field = |idx: usize| record.get(idx).unwrap_or_default().to_string();
            rows.push(ExportRow {
                station_id: field(0),
                pdf_file: field(1),
                azymuts: field(2),
            });
        }
        Ok(rows)
    }
}
