// src/workbook/html.rs
//! HTML `<table>` → [`Sheet`] conversion. Used for NSDL report pages and for
//! `.xls` downloads that are really HTML exports.

use crate::sheet::{row_is_blank, Cell, Row, Sheet};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};

// --- CSS Selectors (Lazy Static) ---
static TABLE_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("table").expect("Failed to compile TABLE_SELECTOR"));
static ROW_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("tr").expect("Failed to compile ROW_SELECTOR"));
static CELL_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("th, td").expect("Failed to compile CELL_SELECTOR"));

// Plain numbers with optional sign, thousands separators and decimals.
static NUMBER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[-+]?(\d{1,3}(,\d{2,3})+|\d+)?(\.\d+)?$").expect("Failed to compile NUMBER_RE")
});

const MAX_COLSPAN: usize = 64;

/// Parses every table in the document, dropping fully empty rows and tables
/// with no rows left. Sheets are named `Table_<n>` in document order.
pub fn parse_tables(html: &str) -> Vec<Sheet> {
    let document = Html::parse_document(html);
    document
        .select(&TABLE_SELECTOR)
        .enumerate()
        .filter_map(|(idx, table)| {
            let rows: Vec<Row> = table
                .select(&ROW_SELECTOR)
                .map(parse_row)
                .filter(|row| !row_is_blank(row))
                .collect();
            if rows.is_empty() {
                None
            } else {
                Some(Sheet::new(format!("Table_{}", idx + 1), rows))
            }
        })
        .collect()
}

/// Quick check used before falling back to HTML parsing of a binary download.
pub fn looks_like_html(bytes: &[u8]) -> bool {
    let head = String::from_utf8_lossy(&bytes[..bytes.len().min(1024)]).to_lowercase();
    head.contains("<html") || head.contains("<table") || head.contains("<!doctype html")
}

fn parse_row(row: ElementRef) -> Row {
    let mut cells = Vec::new();
    for cell in row.select(&CELL_SELECTOR) {
        let text = clean_text(cell);
        let span = cell
            .value()
            .attr("colspan")
            .and_then(|v| v.trim().parse::<usize>().ok())
            .unwrap_or(1)
            .clamp(1, MAX_COLSPAN);
        let value = typed_cell(&text);
        // Spanned header text is repeated across the columns it covers.
        for _ in 0..span {
            cells.push(value.clone());
        }
    }
    cells
}

fn clean_text(cell: ElementRef) -> String {
    cell.text()
        .collect::<Vec<_>>()
        .join(" ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn typed_cell(text: &str) -> Cell {
    if text.is_empty() {
        return Cell::Empty;
    }
    if NUMBER_RE.is_match(text) && text.chars().any(|c| c.is_ascii_digit()) {
        if let Some(n) = Cell::Text(text.to_string()).as_f64() {
            return Cell::Number(n);
        }
    }
    Cell::Text(text.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tables_become_typed_sheets() {
        let html = r#"
            <html><body>
            <table><tr><td>   </td></tr></table>
            <table>
              <tr><th>Sr. No.</th><th>Sectors</th><th colspan="2">IN USD Mn</th></tr>
              <tr><td>1</td><td>Automobile
                 and Auto Components</td><td>1,234.50</td><td>-12</td></tr>
              <tr><td></td><td></td><td></td><td></td></tr>
            </table>
            </body></html>
        "#;
        let sheets = parse_tables(html);
        assert_eq!(sheets.len(), 1);
        let sheet = &sheets[0];
        assert_eq!(sheet.name, "Table_2");
        assert_eq!(sheet.len(), 2);
        assert_eq!(sheet.rows[0][2], Cell::Text("IN USD Mn".into()));
        assert_eq!(sheet.rows[0][3], Cell::Text("IN USD Mn".into()));
        assert_eq!(sheet.rows[1][1], Cell::Text("Automobile and Auto Components".into()));
        assert_eq!(sheet.rows[1][2], Cell::Number(1234.5));
        assert_eq!(sheet.rows[1][3], Cell::Number(-12.0));
    }

    #[test]
    fn dates_and_codes_stay_text() {
        assert_eq!(typed_cell("15-12-2025"), Cell::Text("15-12-2025".into()));
        assert_eq!(typed_cell("Sr."), Cell::Text("Sr.".into()));
        assert_eq!(typed_cell("42"), Cell::Number(42.0));
    }

    #[test]
    fn html_sniffing() {
        assert!(looks_like_html(b"  <HTML><body><table>"));
        assert!(!looks_like_html(&[0xD0, 0xCF, 0x11, 0xE0]));
    }
}
