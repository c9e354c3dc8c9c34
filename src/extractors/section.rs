// src/extractors/section.rs

// --- Imports ---
use crate::extractors::config::ExtractorConfig;
use crate::sheet::{row_is_blank, row_text, Cell, Row, Sheet};
use crate::utils::error::ExtractError;
use std::collections::HashMap;

// --- Data Structures ---
/// Row indices of a located section, relative to the header-adjusted rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectionBounds {
    pub start: usize,
    pub end: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedSection {
    pub source_name: String,         // Sheet the section was cut from
    pub header_row: Option<usize>,   // Index of the header row in the raw sheet
    pub columns: Option<Vec<String>>, // Unique, non-empty labels when a header was detected
    pub bounds: SectionBounds,
    pub rows: Vec<Row>,
}

impl ExtractedSection {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Column count of the output grid.
    pub fn width(&self) -> usize {
        match &self.columns {
            Some(cols) => cols.len(),
            None => self.rows.iter().map(Vec::len).max().unwrap_or(0),
        }
    }
}

/// Result of running the extractor over one sheet. "Not found" is always an
/// explicit variant, never an empty section.
#[derive(Debug, Clone, PartialEq)]
pub enum ExtractionOutcome {
    Found(ExtractedSection),
    HeaderNotFound,
    SectionNotFound { start: Option<usize> },
}

impl ExtractionOutcome {
    pub fn into_result(self) -> Result<ExtractedSection, ExtractError> {
        match self {
            ExtractionOutcome::Found(section) => Ok(section),
            ExtractionOutcome::HeaderNotFound => Err(ExtractError::HeaderNotFound),
            ExtractionOutcome::SectionNotFound { start: None } => Err(
                ExtractError::SectionNotFound("no row contains every start keyword".to_string()),
            ),
            ExtractionOutcome::SectionNotFound { start: Some(start) } => {
                Err(ExtractError::SectionNotFound(format!(
                    "start row {} has no end row after it",
                    start
                )))
            }
        }
    }
}

// --- Main Extractor Structure ---
#[derive(Debug, Clone, Default)]
pub struct SectionExtractor {
    config: ExtractorConfig,
}

impl SectionExtractor {
    pub fn new(config: ExtractorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    pub fn extract(&self, sheet: &Sheet) -> ExtractionOutcome {
        extract_section(sheet, &self.config)
    }
}

/// Locates and slices the configured section out of `sheet`.
///
/// Runs header detection first when `has_header_row` is set; the header row
/// and everything above it are dropped and only labelled columns survive.
/// The section starts at the first row containing every start keyword and
/// ends at the first later row containing any end keyword.
pub fn extract_section(sheet: &Sheet, config: &ExtractorConfig) -> ExtractionOutcome {
    tracing::debug!("Extracting section from sheet '{}' ({} rows)", sheet.name, sheet.len());

    // 1. Header detection (optional)
    let (header_row, columns, body) = if config.has_header_row {
        let Some(header_idx) = find_header_row(&sheet.rows, config) else {
            tracing::warn!("No header row found in sheet '{}'", sheet.name);
            return ExtractionOutcome::HeaderNotFound;
        };
        tracing::debug!("Header row for '{}' is row {}", sheet.name, header_idx);

        let (kept, labels) = header_columns(&sheet.rows[header_idx]);
        let body: Vec<Row> = sheet.rows[header_idx + 1..]
            .iter()
            .map(|row| project(row, &kept))
            .collect();
        (Some(header_idx), Some(labels), body)
    } else {
        (None, None, sheet.rows.clone())
    };

    // 2. Bounds detection
    let Some(start) = find_start_row(&body, config) else {
        tracing::warn!("No start row found in sheet '{}'", sheet.name);
        return ExtractionOutcome::SectionNotFound { start: None };
    };
    let Some(end) = find_end_row(&body, config, start) else {
        tracing::warn!("Start row {} found in sheet '{}' but no end row after it", start, sheet.name);
        return ExtractionOutcome::SectionNotFound { start: Some(start) };
    };
    let bounds = SectionBounds { start, end };
    tracing::debug!("Section bounds for '{}': {:?}", sheet.name, bounds);

    // 3. Slicing
    let stop = if config.end_inclusive { end + 1 } else { end };
    let rows: Vec<Row> = body[start..stop]
        .iter()
        .filter(|row| !row_is_blank(row))
        .filter(|row| match config.label_columns {
            Some(n) => !row_is_blank(row.get(n..).unwrap_or(&[])),
            None => true,
        })
        .cloned()
        .collect();

    tracing::info!("Extracted {} rows from sheet '{}'", rows.len(), sheet.name);
    ExtractionOutcome::Found(ExtractedSection {
        source_name: sheet.name.clone(),
        header_row,
        columns,
        bounds,
        rows,
    })
}

/// First row whose text contains any header keyword.
pub fn find_header_row(rows: &[Row], config: &ExtractorConfig) -> Option<usize> {
    rows.iter().position(|row| config.matches_header(&row_text(row)))
}

/// First row whose text contains every start keyword.
pub fn find_start_row(rows: &[Row], config: &ExtractorConfig) -> Option<usize> {
    rows.iter().position(|row| config.matches_start(&row_text(row)))
}

/// First row strictly after `start` whose text contains any end keyword.
pub fn find_end_row(rows: &[Row], config: &ExtractorConfig, start: usize) -> Option<usize> {
    rows.iter()
        .enumerate()
        .skip(start + 1)
        .find(|(_, row)| config.matches_end(&row_text(row)))
        .map(|(idx, _)| idx)
}

/// Picks the columns worth keeping from a header row and gives each a unique
/// label. Blank labels and the literal `nan` are dropped; repeats get a
/// `.1`, `.2`, ... suffix.
fn header_columns(header: &[Cell]) -> (Vec<usize>, Vec<String>) {
    let mut kept = Vec::new();
    let mut labels = Vec::new();
    let mut seen: HashMap<String, usize> = HashMap::new();

    for (idx, cell) in header.iter().enumerate() {
        let label = cell.text().trim().to_string();
        if label.is_empty() || label.eq_ignore_ascii_case("nan") {
            continue;
        }
        let count = seen.entry(label.clone()).or_insert(0);
        let unique = if *count == 0 { label.clone() } else { format!("{}.{}", label, count) };
        *count += 1;
        kept.push(idx);
        labels.push(unique);
    }
    (kept, labels)
}

fn project(row: &[Cell], kept: &[usize]) -> Row {
    kept.iter()
        .map(|&idx| row.get(idx).cloned().unwrap_or(Cell::Empty))
        .collect()
}
