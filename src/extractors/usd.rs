// src/extractors/usd.rs
//! Narrows an NSDL sector workbook down to the identifier columns plus the
//! USD-denominated block.

use crate::sheet::{Cell, Row, Sheet};

/// Rows searched for the "USD" marker.
const USD_SEARCH_ROWS: usize = 10;
/// Leading columns searched for the "Sector" label.
const SECTOR_SEARCH_COLS: usize = 4;
/// Rows treated as header rows in the USD-only output.
pub const USD_HEADER_ROWS: usize = 4;

#[derive(Debug, Clone, PartialEq)]
pub struct UsdLayout {
    pub usd_start_col: usize,
    pub sector_col: usize,
    /// Row the USD marker was found on, if any.
    pub header_row: Option<usize>,
}

impl UsdLayout {
    /// Columns copied to the output, in order: Sr. No., the sector column,
    /// then every column from the USD start. A sector column inside the USD
    /// block is copied twice.
    pub fn columns(&self, width: usize) -> Vec<usize> {
        let mut cols = Vec::new();
        if self.sector_col > 0 {
            cols.push(self.sector_col - 1);
        }
        cols.push(self.sector_col);
        cols.extend(self.usd_start_col..width);
        cols
    }
}

pub fn detect_layout(sheet: &Sheet) -> UsdLayout {
    let width = sheet.width();

    let marker = sheet
        .rows
        .iter()
        .take(USD_SEARCH_ROWS)
        .enumerate()
        .find_map(|(r, row)| {
            row.iter()
                .position(|cell| cell.text().to_uppercase().contains("USD"))
                .map(|c| (r, c))
        });

    let (header_row, usd_start_col) = match marker {
        Some((r, c)) => {
            tracing::info!("Found 'USD' header at row {}, column {}", r, c);
            (Some(r), c)
        }
        None => {
            let fallback = width / 2;
            tracing::warn!("No 'USD' header found, assuming USD starts at column {}", fallback);
            (None, fallback)
        }
    };

    // Header rows in these reports sit around row 4 when the marker is absent.
    let label_row = header_row.unwrap_or(3);
    let sector_col = (0..SECTOR_SEARCH_COLS)
        .find(|&c| sheet.cell(label_row, c).text().contains("Sector"))
        .unwrap_or(1);

    UsdLayout { usd_start_col, sector_col, header_row }
}

/// Copies every row, keeping the Sr. No./Sector columns and the USD block.
pub fn extract_usd_columns(sheet: &Sheet) -> (UsdLayout, Sheet) {
    let layout = detect_layout(sheet);
    let cols = layout.columns(sheet.width());
    let rows: Vec<Row> = (0..sheet.len())
        .map(|r| cols.iter().map(|&c| sheet.cell(r, c).clone()).collect::<Vec<Cell>>())
        .collect();
    (layout, Sheet::new("USD Data Only", rows))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nsdl_sheet() -> Sheet {
        Sheet::from_text_rows(
            "Sector_Investment_Data",
            &[
                &["Fortnightly Sector-wise FPI Investment", "", "", "", "", ""],
                &["", "", "AUC as on December 15, 2025", "", "", ""],
                &["", "", "IN INR Cr.", "", "IN USD Mn", ""],
                &["Sr. No.", "Sectors", "Equity", "Debt", "Equity", "Debt"],
                &["1", "Automobile", "100", "5", "12", "0.6"],
            ],
        )
    }

    #[test]
    fn usd_block_and_identifiers_are_kept() {
        let (layout, out) = extract_usd_columns(&nsdl_sheet());
        assert_eq!(layout.header_row, Some(2));
        assert_eq!(layout.usd_start_col, 4);
        assert_eq!(out.len(), 5);
        let last: Vec<String> = out.rows[4].iter().map(Cell::text).collect();
        assert_eq!(last, vec!["1", "Automobile", "12", "0.6"]);
    }

    #[test]
    fn missing_marker_falls_back_to_middle_column() {
        let sheet = Sheet::from_text_rows(
            "no-usd",
            &[
                &["a", "b", "c", "d"],
                &["", "", "", ""],
                &["", "", "", ""],
                &["Sr", "Sector", "INR", "Other"],
            ],
        );
        let layout = detect_layout(&sheet);
        assert_eq!(layout.header_row, None);
        assert_eq!(layout.usd_start_col, 2);
        assert_eq!(layout.sector_col, 1);
        assert_eq!(layout.columns(4), vec![0, 1, 2, 3]);
    }

    #[test]
    fn usd_block_is_copied_whole() {
        let layout = UsdLayout { usd_start_col: 1, sector_col: 1, header_row: Some(0) };
        assert_eq!(layout.columns(3), vec![0, 1, 1, 2]);
    }
}
