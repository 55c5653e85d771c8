//! Azimuth and tilt extraction from measurement report PDFs
//!
//! Reports list their antenna sectors in a table on the third page. A document
//! is accepted only if that page exists, has text, mentions the expected station
//! identifier and carries a table with an azimuth column. Individual cells are
//! read leniently: out-of-range angles are dropped, unparseable cells are kept
//! as written.

use crate::extractor;
use crate::fetcher::DownloadedDocument;
use crate::record::{ExtractedRecord, ExtractionStatus, RecordOutcome, StationId};
use crate::tables::{self, ParsedTable};
use log::{debug, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;

/// Reports need at least this many pages
pub const MIN_PAGE_COUNT: usize = 3;
/// 0-based index of the page holding the sector table
pub const TARGET_PAGE_INDEX: usize = 2;

/// Normalized header texts that denote an azimuth column
pub const AZIMUTH_HEADER_ALIASES: &[&str] = &[
    "azimuth",
    "azimuth h",
    "direction",
    "direction h",
    "azymut",
    "azymut h",
    "kierunek",
    "kierunek h",
    "kierunek wiązki",
];

/// Normalized header texts that denote a tilt column
pub const TILT_HEADER_ALIASES: &[&str] = &[
    "tilt",
    "tilt e",
    "tilt m",
    "downtilt",
    "pochylenie",
    "nachylenie",
];

static AZIMUTH_HEADER_RES: Lazy<Vec<Regex>> = Lazy::new(|| compile_aliases(AZIMUTH_HEADER_ALIASES));
static TILT_HEADER_RES: Lazy<Vec<Regex>> = Lazy::new(|| compile_aliases(TILT_HEADER_ALIASES));

static AZIMUTH_VALUE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\d+)\s*[°º]").unwrap());
static TILT_VALUE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^([-+−]?\s*\d+)\s*[°º]").unwrap());

fn compile_aliases(aliases: &[&str]) -> Vec<Regex> {
    aliases
        .iter()
        .map(|alias| Regex::new(&format!(r"\b{}\b", regex::escape(alias))).unwrap())
        .collect()
}

/// Kind of angle read from a sector table column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AngleKind {
    /// Integer degrees in [0, 360]
    Azimuth,
    /// Signed integer degrees in [-90, 90]
    Tilt,
}

impl AngleKind {
    fn pattern(&self) -> &'static Regex {
        match self {
            AngleKind::Azimuth => &AZIMUTH_VALUE_RE,
            AngleKind::Tilt => &TILT_VALUE_RE,
        }
    }

    fn range(&self) -> (i64, i64) {
        match self {
            AngleKind::Azimuth => (0, 360),
            AngleKind::Tilt => (-90, 90),
        }
    }

    fn name(&self) -> &'static str {
        match self {
            AngleKind::Azimuth => "azimuth",
            AngleKind::Tilt => "tilt",
        }
    }
}

/// Result of reading one table cell
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CellValue {
    /// Parsed and in range, normalized to `"<deg>°"`
    Angle(String),
    /// Parsed but outside the valid range
    OutOfRange(i64),
    /// No angle pattern; the trimmed cell text
    Raw(String),
}

/// Read one cell as an angle of the given kind
///
/// Returns `None` for empty cells.
pub fn parse_angle_cell(cell: &str, kind: AngleKind) -> Option<CellValue> {
    let trimmed = cell.trim();
    if trimmed.is_empty() {
        return None;
    }

    let Some(caps) = kind.pattern().captures(trimmed) else {
        return Some(CellValue::Raw(trimmed.to_string()));
    };

    let digits: String = caps[1]
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| if c == '−' { '-' } else { c })
        .collect();
    let Ok(degrees) = digits.parse::<i64>() else {
        // More digits than fit in i64: certainly out of range
        return Some(CellValue::OutOfRange(i64::MAX));
    };

    let (min, max) = kind.range();
    if (min..=max).contains(&degrees) {
        Some(CellValue::Angle(format!("{}°", degrees)))
    } else {
        Some(CellValue::OutOfRange(degrees))
    }
}

/// Lowercased, trimmed header text with inner whitespace collapsed
pub fn normalize_header(header: &str) -> String {
    header
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Indices of headers that match any alias as a whole word
pub fn resolve_columns(headers: &[String], aliases: &[Regex]) -> Vec<usize> {
    headers
        .iter()
        .enumerate()
        .filter(|(_, header)| {
            let normalized = normalize_header(header);
            aliases.iter().any(|re| re.is_match(&normalized))
        })
        .map(|(idx, _)| idx)
        .collect()
}

pub fn azimuth_columns(table: &ParsedTable) -> Vec<usize> {
    resolve_columns(&table.headers, &AZIMUTH_HEADER_RES)
}

pub fn tilt_columns(table: &ParsedTable) -> Vec<usize> {
    resolve_columns(&table.headers, &TILT_HEADER_RES)
}

/// Values of the given columns across all data rows, row by row
pub fn collect_column_values(
    table: &ParsedTable,
    columns: &[usize],
    kind: AngleKind,
    source: &str,
) -> Vec<String> {
    let mut values = Vec::new();
    for row in &table.rows {
        for &col in columns {
            let Some(cell) = row.get(col) else {
                continue;
            };
            match parse_angle_cell(cell, kind) {
                Some(CellValue::Angle(value)) | Some(CellValue::Raw(value)) => values.push(value),
                Some(CellValue::OutOfRange(degrees)) => {
                    warn!(
                        "Dropping out-of-range {} {}° in {}",
                        kind.name(),
                        degrees,
                        source
                    );
                }
                None => {}
            }
        }
    }
    values
}

/// Values read from a report's sector table
#[derive(Debug, Clone, PartialEq)]
pub struct SectorValues {
    pub azimuths: Vec<String>,
    pub tilts: Vec<String>,
}

/// Reads sector azimuths from downloaded reports
#[derive(Debug, Clone, Default)]
pub struct AzimuthTableExtractor;

impl AzimuthTableExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Produce exactly one record for the document, successful or not
    pub fn extract(&self, doc: &DownloadedDocument, expected_id: &StationId) -> ExtractedRecord {
        let pdf_file = doc.file_name();
        let outcome = match self.read_sectors(&doc.path, expected_id) {
            Ok(values) => RecordOutcome::Sectors {
                azimuths: values.azimuths,
                tilts: values.tilts,
            },
            Err(status) => {
                warn!("{}: {}", pdf_file, status);
                RecordOutcome::Failed(status)
            }
        };

        ExtractedRecord {
            station_id: expected_id.clone(),
            pdf_file,
            outcome,
        }
    }

    /// Run the gates in order; the first failing gate decides the status
    pub fn read_sectors(
        &self,
        path: &Path,
        expected_id: &StationId,
    ) -> Result<SectorValues, ExtractionStatus> {
        if !path.is_file() {
            return Err(ExtractionStatus::FileMissing);
        }

        let document = extractor::load_document(path).map_err(|e| {
            warn!("Cannot parse PDF {}: {}", path.display(), e);
            ExtractionStatus::NoText
        })?;

        let pages = extractor::page_count(&document);
        if pages < MIN_PAGE_COUNT {
            debug!("{} has {} pages, need {}", path.display(), pages, MIN_PAGE_COUNT);
            return Err(ExtractionStatus::NoTable);
        }

        let items = extractor::extract_page_items(&document, TARGET_PAGE_INDEX).unwrap_or_else(|e| {
            warn!("Cannot read page {} of {}: {}", TARGET_PAGE_INDEX + 1, path.display(), e);
            Vec::new()
        });
        let text = extractor::page_text(&items);
        if text.trim().is_empty() {
            return Err(ExtractionStatus::NoText);
        }

        if !contains_station_id(&text, expected_id) {
            return Err(ExtractionStatus::StationIdNotFound);
        }

        let found = tables::detect_tables(&items);
        let table = found.first().ok_or(ExtractionStatus::NoTable)?;
        debug!("{}: table headers {:?}", path.display(), table.headers);

        let azimuth_cols = azimuth_columns(table);
        if azimuth_cols.is_empty() {
            return Err(ExtractionStatus::NoAzimuthColumn);
        }

        let source = path.display().to_string();
        let azimuths = collect_column_values(table, &azimuth_cols, AngleKind::Azimuth, &source);
        if azimuths.is_empty() {
            return Err(ExtractionStatus::NoAzimuthsFound);
        }

        let tilts = collect_column_values(table, &tilt_columns(table), AngleKind::Tilt, &source);

        Ok(SectorValues { azimuths, tilts })
    }
}

/// The identifier must appear verbatim; kerned fragments are already joined by the extractor
fn contains_station_id(text: &str, id: &StationId) -> bool {
    text.contains(id.as_str())
}
