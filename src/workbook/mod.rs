// src/workbook/mod.rs
//! Spreadsheet boundary: reading `.xls`/`.xlsx` into [`Sheet`]s and writing
//! sections back out as `.xlsx`.

pub mod html;

use crate::extractors::section::ExtractedSection;
use crate::sheet::{Cell, Sheet};
use crate::utils::error::SheetError;
use calamine::{Data, Range, Reader, Xls, Xlsx};
use rust_xlsxwriter::{Color, Format, FormatAlign, Workbook, Worksheet, XlsxError};
use std::io::Cursor;
use std::path::Path;

const MAX_SHEET_NAME: usize = 31;
const MIN_COLUMN_WIDTH: f64 = 12.0;
const MAX_COLUMN_WIDTH: f64 = 50.0;
const HEADER_FILL: u32 = 0xB8CCE4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReaderKind {
    Xls,
    Xlsx,
}

/// Reads the first worksheet of a workbook.
///
/// The reader matching the file extension is tried first, then the other
/// binary reader, then HTML table parsing (some `.xls` downloads are HTML).
pub fn read_first_sheet(path: &Path) -> Result<Sheet, SheetError> {
    let bytes = std::fs::read(path)?;
    let is_xlsx = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("xlsx"));
    let order = if is_xlsx {
        [ReaderKind::Xlsx, ReaderKind::Xls]
    } else {
        [ReaderKind::Xls, ReaderKind::Xlsx]
    };

    let mut reasons = Vec::new();
    for kind in order {
        let attempt = match kind {
            ReaderKind::Xls => first_sheet::<Xls<Cursor<Vec<u8>>>>(&bytes),
            ReaderKind::Xlsx => first_sheet::<Xlsx<Cursor<Vec<u8>>>>(&bytes),
        };
        match attempt {
            Ok(Some(sheet)) => {
                tracing::debug!("Read {} with {:?} reader", path.display(), kind);
                return Ok(sheet);
            }
            Ok(None) => return Err(SheetError::NoWorksheet(path.to_path_buf())),
            Err(reason) => {
                tracing::debug!("{:?} reader failed on {}: {}", kind, path.display(), reason);
                reasons.push(format!("{:?}: {}", kind, reason));
            }
        }
    }

    if html::looks_like_html(&bytes) {
        if let Some(sheet) = html::parse_tables(&String::from_utf8_lossy(&bytes)).into_iter().next() {
            tracing::info!("Read {} as an HTML table export", path.display());
            return Ok(sheet);
        }
        reasons.push("HTML: no tables".to_string());
    }

    Err(SheetError::Unreadable {
        path: path.to_path_buf(),
        reason: reasons.join("; "),
    })
}

fn first_sheet<R>(bytes: &[u8]) -> Result<Option<Sheet>, String>
where
    R: Reader<Cursor<Vec<u8>>>,
    R::Error: std::fmt::Display,
{
    let mut workbook = R::new(Cursor::new(bytes.to_vec())).map_err(|e| e.to_string())?;
    let Some(name) = workbook.sheet_names().first().cloned() else {
        return Ok(None);
    };
    let range = workbook.worksheet_range(&name).map_err(|e| e.to_string())?;
    Ok(Some(range_to_sheet(&name, &range)))
}

/// Converts a calamine range, re-inserting the empty rows/columns calamine
/// trims before the first used cell so indices match the spreadsheet.
fn range_to_sheet(name: &str, range: &Range<Data>) -> Sheet {
    let (row_off, col_off) = range
        .start()
        .map(|(r, c)| (r as usize, c as usize))
        .unwrap_or((0, 0));

    let mut rows = vec![Vec::new(); row_off];
    for data_row in range.rows() {
        let mut row = vec![Cell::Empty; col_off];
        row.extend(data_row.iter().map(to_cell));
        rows.push(row);
    }
    Sheet::new(name, rows)
}

fn to_cell(data: &Data) -> Cell {
    match data {
        Data::Empty => Cell::Empty,
        Data::String(s) => Cell::Text(s.clone()),
        Data::Float(f) => Cell::Number(*f),
        Data::Int(i) => Cell::Number(*i as f64),
        Data::Bool(b) => Cell::Bool(*b),
        Data::DateTime(dt) => Cell::DateTime(dt.as_f64()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => Cell::Text(s.clone()),
        Data::Error(e) => Cell::Error(e.to_string()),
    }
}

// --- Writing ---

/// Writes an extracted section: one header line of column labels (when the
/// section has them) followed by the rows. No index column.
pub fn write_section(path: &Path, section: &ExtractedSection) -> Result<(), SheetError> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(sheet_name(&section.source_name))?;

    let bold = Format::new().set_bold();
    let date = Format::new().set_num_format("yyyy-mm-dd");
    let mut offset = 0u32;
    if let Some(columns) = &section.columns {
        for (c, label) in columns.iter().enumerate() {
            worksheet.write_string_with_format(0, c as u16, label, &bold)?;
        }
        offset = 1;
    }
    for (r, row) in section.rows.iter().enumerate() {
        for (c, cell) in row.iter().enumerate() {
            write_cell(worksheet, offset + r as u32, c as u16, cell, None, &date)?;
        }
    }

    save(&mut workbook, path)
}

/// Writes each sheet to its own worksheet, in order.
pub fn write_sheets(path: &Path, sheets: &[Sheet]) -> Result<(), SheetError> {
    let mut workbook = Workbook::new();
    let date = Format::new().set_num_format("yyyy-mm-dd");
    for sheet in sheets {
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(sheet_name(&sheet.name))?;
        for (r, row) in sheet.rows.iter().enumerate() {
            for (c, cell) in row.iter().enumerate() {
                write_cell(worksheet, r as u32, c as u16, cell, None, &date)?;
            }
        }
    }
    save(&mut workbook, path)
}

/// Writes a sheet whose first `header_rows` rows are styled as headers, with
/// column widths fitted to content.
pub fn write_with_header_rows(path: &Path, sheet: &Sheet, header_rows: usize) -> Result<(), SheetError> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(sheet_name(&sheet.name))?;

    let header = Format::new()
        .set_bold()
        .set_font_size(10)
        .set_background_color(Color::RGB(HEADER_FILL))
        .set_align(FormatAlign::Center)
        .set_align(FormatAlign::VerticalCenter)
        .set_text_wrap();
    let date = Format::new().set_num_format("yyyy-mm-dd");

    let width = sheet.width();
    for r in 0..sheet.len() {
        let fmt = (r < header_rows).then_some(&header);
        for c in 0..width {
            write_cell(worksheet, r as u32, c as u16, sheet.cell(r, c), fmt, &date)?;
        }
    }

    for c in 0..width {
        let longest = (0..sheet.len())
            .map(|r| sheet.cell(r, c).text().chars().count())
            .max()
            .unwrap_or(0);
        worksheet.set_column_width(c as u16, column_width(longest))?;
    }

    save(&mut workbook, path)
}

fn column_width(longest: usize) -> f64 {
    ((longest + 2) as f64).min(MAX_COLUMN_WIDTH).max(MIN_COLUMN_WIDTH)
}

fn write_cell(
    worksheet: &mut Worksheet,
    row: u32,
    col: u16,
    cell: &Cell,
    format: Option<&Format>,
    date: &Format,
) -> Result<(), XlsxError> {
    match (cell, format) {
        (Cell::Empty, Some(fmt)) => {
            worksheet.write_blank(row, col, fmt)?;
        }
        (Cell::Empty, None) => {}
        (Cell::Text(s) | Cell::Error(s), Some(fmt)) => {
            worksheet.write_string_with_format(row, col, s, fmt)?;
        }
        (Cell::Text(s) | Cell::Error(s), None) => {
            worksheet.write_string(row, col, s)?;
        }
        (Cell::Number(n), Some(fmt)) => {
            worksheet.write_number_with_format(row, col, *n, fmt)?;
        }
        (Cell::Number(n), None) => {
            worksheet.write_number(row, col, *n)?;
        }
        (Cell::Bool(b), Some(fmt)) => {
            worksheet.write_boolean_with_format(row, col, *b, fmt)?;
        }
        (Cell::Bool(b), None) => {
            worksheet.write_boolean(row, col, *b)?;
        }
        (Cell::DateTime(serial), fmt) => {
            worksheet.write_number_with_format(row, col, *serial, fmt.unwrap_or(date))?;
        }
    }
    Ok(())
}

fn save(workbook: &mut Workbook, path: &Path) -> Result<(), SheetError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    workbook.save(path)?;
    tracing::debug!("Saved workbook {}", path.display());
    Ok(())
}

/// Excel sheet names: at most 31 chars, none of `[]:*?/\`.
fn sheet_name(raw: &str) -> String {
    let cleaned: String = raw
        .chars()
        .map(|c| if "[]:*?/\\".contains(c) { '_' } else { c })
        .take(MAX_SHEET_NAME)
        .collect();
    let trimmed = cleaned.trim().trim_matches('\'').to_string();
    if trimmed.is_empty() {
        "Sheet1".to_string()
    } else {
        trimmed
    }
}
