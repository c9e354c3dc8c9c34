// src/sheet.rs
//! In-memory grid of cell values shared by every reader, extractor and writer.

/// A single cell. Typed values are kept so they survive into the written
/// output; `text()` gives the rendering used for keyword matching.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
    /// Excel serial date (days since 1899-12-30, fractional part is time of day).
    DateTime(f64),
    Error(String),
}

impl Cell {
    pub fn text(&self) -> String {
        match self {
            Cell::Empty => String::new(),
            Cell::Text(s) => s.clone(),
            Cell::Number(n) => format_number(*n),
            Cell::Bool(b) => b.to_string(),
            Cell::DateTime(serial) => format_number(*serial),
            Cell::Error(e) => e.clone(),
        }
    }

    /// True for `Empty` and for text that is blank after trimming.
    pub fn is_blank(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// Numeric view of the cell. Text is trimmed and thousands separators are
    /// dropped before parsing; anything else that is not a number yields `None`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Cell::Number(n) if n.is_finite() => Some(*n),
            Cell::Text(s) => {
                let cleaned: String = s.trim().chars().filter(|c| *c != ',').collect();
                if cleaned.is_empty() {
                    return None;
                }
                cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
            }
            _ => None,
        }
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        if value.is_empty() {
            Cell::Empty
        } else {
            Cell::Text(value.to_string())
        }
    }
}

fn format_number(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}

pub type Row = Vec<Cell>;

/// One worksheet (or one HTML table) as an ordered list of rows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sheet {
    pub name: String,
    pub rows: Vec<Row>,
}

impl Sheet {
    pub fn new(name: impl Into<String>, rows: Vec<Row>) -> Self {
        Self { name: name.into(), rows }
    }

    /// Builds a sheet from string literals; `""` becomes an empty cell.
    #[cfg(test)]
    pub fn from_text_rows(name: impl Into<String>, rows: &[&[&str]]) -> Self {
        let rows = rows
            .iter()
            .map(|row| row.iter().map(|v| Cell::from(*v)).collect())
            .collect();
        Self::new(name, rows)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Widest row in the sheet.
    pub fn width(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }

    pub fn cell(&self, row: usize, col: usize) -> &Cell {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .unwrap_or(&Cell::Empty)
    }
}

/// Lowercased, single-space-joined text of a row; the string every keyword
/// test runs against.
pub fn row_text(row: &[Cell]) -> String {
    row.iter()
        .map(Cell::text)
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

pub fn row_is_blank(row: &[Cell]) -> bool {
    row.iter().all(Cell::is_blank)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integral_numbers_render_without_fraction() {
        assert_eq!(Cell::Number(120.0).text(), "120");
        assert_eq!(Cell::Number(120.5).text(), "120.5");
    }

    #[test]
    fn row_text_is_lowercase_and_space_joined() {
        let row = vec![Cell::from("Growth/Equity"), Cell::Empty, Cell::from("Oriented")];
        assert_eq!(row_text(&row), "growth/equity  oriented");
    }

    #[test]
    fn as_f64_handles_separators_and_junk() {
        assert_eq!(Cell::from(" 1,234.5 ").as_f64(), Some(1234.5));
        assert_eq!(Cell::from("-").as_f64(), None);
        assert_eq!(Cell::Empty.as_f64(), None);
        assert_eq!(Cell::Number(-3.0).as_f64(), Some(-3.0));
    }

    #[test]
    fn whitespace_only_rows_are_blank() {
        assert!(row_is_blank(&[Cell::from("  "), Cell::Empty]));
        assert!(!row_is_blank(&[Cell::Empty, Cell::Number(0.0)]));
    }
}
