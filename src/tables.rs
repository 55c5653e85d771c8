//! Table detection on a single page
//!
//! Text items are banded into rows by Y position. A row with text in at least
//! two separate column clusters is tabular; consecutive tabular rows that are
//! vertically close and share column positions form a table. Inside a table,
//! a line with a single filled cell is a row of its own when it follows the
//! table's row pitch, and a wrapped cell line when it sits clearly closer.

use crate::extractor::TextItem;

/// Items closer than this vertically share a row
const ROW_Y_TOLERANCE: f32 = 4.0;
/// Minimum horizontal distance between two column clusters
const COLUMN_GAP: f32 = 20.0;
/// Largest vertical distance between consecutive rows of one table
const MAX_ROW_GAP: f32 = 30.0;
/// Largest vertical distance from a row to a wrapped line of its cells,
/// used until the table's row pitch is known
const CONTINUATION_GAP: f32 = 14.0;
/// Lines closer than this fraction of the row pitch are wrapped cell lines
const CONTINUATION_RATIO: f32 = 0.75;
/// Lines up to this multiple of the row pitch below may still be rows
const ROW_PITCH_SLACK: f32 = 1.5;
/// Horizontal distance for a wrapped line to count as under a column
const CONTINUATION_X_TOLERANCE: f32 = 10.0;
/// Horizontal distance for two rows' column starts to count as aligned
const ALIGNMENT_TOLERANCE: f32 = 40.0;
const MIN_ALIGNMENT: f32 = 0.5;

/// A table read from a page: header cells plus data rows
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl ParsedTable {
    /// Build from rows of cells, the first row being the header
    pub fn from_rows(mut rows: Vec<Vec<String>>) -> Option<Self> {
        if rows.is_empty() {
            return None;
        }
        let headers = rows.remove(0);
        Some(Self { headers, rows })
    }

    pub fn column_count(&self) -> usize {
        self.headers.len()
    }

    /// Cell text of a data row, `None` when the row is shorter than `col`
    pub fn cell(&self, row: usize, col: usize) -> Option<&str> {
        self.rows.get(row)?.get(col).map(String::as_str)
    }
}

/// A horizontal band of items sharing one baseline
#[derive(Debug)]
struct RowBand<'a> {
    y: f32,
    items: Vec<&'a TextItem>,
}

impl RowBand<'_> {
    /// Left edges of distinct column clusters in this band
    fn cluster_starts(&self) -> Vec<f32> {
        let mut starts: Vec<f32> = Vec::new();
        for item in &self.items {
            match starts.last() {
                Some(&last) if item.x - last <= COLUMN_GAP => {}
                _ => starts.push(item.x),
            }
        }
        starts
    }

    /// Key-value layout ("Adres:  ul. Polna 1"): a label on the left, plain values after it
    fn has_form_label(&self) -> bool {
        match self.items.split_first() {
            Some((first, rest)) => {
                is_label(&first.text) && !rest.iter().any(|item| is_label(&item.text))
            }
            None => false,
        }
    }

    fn is_tabular(&self) -> bool {
        self.cluster_starts().len() >= 2 && !self.has_form_label()
    }
}

fn is_label(text: &str) -> bool {
    let text = text.trim();
    text.ends_with(':') && text.len() > 1
}

/// One table row: a band and any wrapped lines below it
struct RowGroup {
    band: usize,
    continuations: Vec<usize>,
    starts: Vec<f32>,
}

/// Where a non-tabular band goes relative to the open table
enum Placement {
    /// A row with some cells empty, aligned with these column starts
    Row(Vec<f32>),
    /// A wrapped line of the previous row's cells
    Continuation,
    /// Not part of the table
    Outside,
}

/// Detect tables on one page, top to bottom
pub fn detect_tables(items: &[TextItem]) -> Vec<ParsedTable> {
    let bands = band_rows(items);
    let mut tables = Vec::new();
    let mut current: Vec<RowGroup> = Vec::new();

    for (idx, band) in bands.iter().enumerate() {
        if band.is_tabular() {
            let starts = band.cluster_starts();
            let joins_current = current.last().is_some_and(|prev| {
                let prev_y = last_y(&bands, prev);
                prev_y - band.y <= MAX_ROW_GAP
                    && alignment_score(&prev.starts, &starts) >= MIN_ALIGNMENT
            });
            if !joins_current {
                flush_run(&bands, &mut current, &mut tables);
            }
            current.push(RowGroup {
                band: idx,
                continuations: Vec::new(),
                starts,
            });
            continue;
        }

        match place_line(&bands, &current, band) {
            Placement::Row(starts) => current.push(RowGroup {
                band: idx,
                continuations: Vec::new(),
                starts,
            }),
            Placement::Continuation => {
                if let Some(prev) = current.last_mut() {
                    prev.continuations.push(idx);
                }
            }
            Placement::Outside => flush_run(&bands, &mut current, &mut tables),
        }
    }
    flush_run(&bands, &mut current, &mut tables);

    tables
}

/// Classify a band that has fewer than two column clusters
fn place_line(bands: &[RowBand], run: &[RowGroup], band: &RowBand) -> Placement {
    let Some(prev) = run.last() else {
        return Placement::Outside;
    };
    if band.has_form_label() {
        return Placement::Outside;
    }

    let gap = last_y(bands, prev) - band.y;
    let under_columns = |tolerance: f32| {
        band.items.iter().all(|item| {
            prev.starts
                .iter()
                .any(|&start| (item.x - start).abs() <= tolerance)
        })
    };

    let pitch = row_pitch(bands, run);
    let is_wrapped = match pitch {
        Some(pitch) => gap < pitch * CONTINUATION_RATIO,
        None => gap <= CONTINUATION_GAP,
    };
    if is_wrapped {
        return if under_columns(CONTINUATION_X_TOLERANCE) {
            Placement::Continuation
        } else {
            Placement::Outside
        };
    }

    let max_gap = pitch.map_or(MAX_ROW_GAP, |p| (p * ROW_PITCH_SLACK).min(MAX_ROW_GAP));
    if gap <= max_gap && under_columns(COLUMN_GAP) {
        Placement::Row(prev.starts.clone())
    } else {
        Placement::Outside
    }
}

/// Smallest distance between consecutive rows of the run, once it has two rows
fn row_pitch(bands: &[RowBand], run: &[RowGroup]) -> Option<f32> {
    run.windows(2)
        .map(|pair| bands[pair[0].band].y - bands[pair[1].band].y)
        .min_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
}

fn last_y(bands: &[RowBand], group: &RowGroup) -> f32 {
    let idx = group.continuations.last().copied().unwrap_or(group.band);
    bands[idx].y
}

/// Turn the collected run into a table if it has a header and data
fn flush_run(bands: &[RowBand], run: &mut Vec<RowGroup>, tables: &mut Vec<ParsedTable>) {
    let groups = std::mem::take(run);
    if groups.len() < 2 {
        return;
    }

    let mut anchor_xs: Vec<f32> = groups
        .iter()
        .flat_map(|g| bands[g.band].items.iter().map(|item| item.x))
        .collect();
    anchor_xs.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let columns = cluster_columns(&anchor_xs);

    let rows: Vec<Vec<String>> = groups
        .iter()
        .map(|group| {
            let mut cell_items: Vec<Vec<&TextItem>> = vec![Vec::new(); columns.len()];
            let band_ids = std::iter::once(group.band).chain(group.continuations.iter().copied());
            for band_id in band_ids {
                for item in &bands[band_id].items {
                    if let Some(col) = nearest_column(&columns, item.x) {
                        cell_items[col].push(*item);
                    }
                }
            }
            cell_items.iter().map(|items| join_cell_items(items)).collect()
        })
        .collect();

    if let Some(table) = ParsedTable::from_rows(rows) {
        tables.push(table);
    }
}

/// Band items into rows by Y, top to bottom, each row sorted by X
fn band_rows(items: &[TextItem]) -> Vec<RowBand<'_>> {
    let mut sorted: Vec<&TextItem> = items.iter().collect();
    sorted.sort_by(|a, b| b.y.partial_cmp(&a.y).unwrap_or(std::cmp::Ordering::Equal));

    let mut bands: Vec<RowBand> = Vec::new();
    for item in sorted {
        match bands.last_mut() {
            Some(band) if band.y - item.y < ROW_Y_TOLERANCE => band.items.push(item),
            _ => bands.push(RowBand {
                y: item.y,
                items: vec![item],
            }),
        }
    }

    for band in &mut bands {
        band.items
            .sort_by(|a, b| a.x.partial_cmp(&b.x).unwrap_or(std::cmp::Ordering::Equal));
    }
    bands
}

/// Fraction of column starts two rows have in common
fn alignment_score(a: &[f32], b: &[f32]) -> f32 {
    let matches_a = a
        .iter()
        .filter(|&&x| b.iter().any(|&y| (x - y).abs() < ALIGNMENT_TOLERANCE))
        .count();
    let matches_b = b
        .iter()
        .filter(|&&y| a.iter().any(|&x| (x - y).abs() < ALIGNMENT_TOLERANCE))
        .count();
    let max_len = a.len().max(b.len());
    if max_len == 0 {
        return 0.0;
    }
    (matches_a + matches_b) as f32 / (2 * max_len) as f32
}

/// Cluster sorted X positions into column centers
fn cluster_columns(sorted_xs: &[f32]) -> Vec<f32> {
    let Some((&first, rest)) = sorted_xs.split_first() else {
        return Vec::new();
    };

    let mut columns = Vec::new();
    let mut cluster: Vec<f32> = vec![first];
    for &x in rest {
        let center = cluster.iter().sum::<f32>() / cluster.len() as f32;
        if x - center > COLUMN_GAP {
            columns.push(center);
            cluster = vec![x];
        } else {
            cluster.push(x);
        }
    }
    columns.push(cluster.iter().sum::<f32>() / cluster.len() as f32);
    columns
}

fn nearest_column(columns: &[f32], x: f32) -> Option<usize> {
    columns
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| {
            (x - *a)
                .abs()
                .partial_cmp(&(x - *b).abs())
                .unwrap_or(std::cmp::Ordering::Equal)
        })
        .map(|(idx, _)| idx)
}

/// Join the items of one cell; no space is inserted around hyphens
fn join_cell_items(items: &[&TextItem]) -> String {
    let mut result = String::new();

    for item in items {
        let text = item.text.trim();
        if text.is_empty() {
            continue;
        }
        if !result.is_empty() && !result.ends_with('-') && !text.starts_with('-') {
            result.push(' ');
        }
        result.push_str(text);
    }

    result
}
