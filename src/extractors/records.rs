// src/extractors/records.rs

use crate::extractors::section::ExtractedSection;
use crate::sheet::Row;
use once_cell::sync::Lazy;
use regex::Regex;

// Sub-total markers in any spacing/hyphenation, plus the section title row.
static SKIP_LABEL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)sub[\s\-]*total|growth\s*/\s*equity")
        .expect("Failed to compile SKIP_LABEL_RE")
});

/// Which columns of an extracted row hold the category label and the value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordRule {
    pub label_column: usize,
    pub value_column: usize,
}

impl Default for RecordRule {
    fn default() -> Self {
        Self { label_column: 1, value_column: 6 }
    }
}

/// One `(category, value)` pair ready for upsert under a reporting period.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryValue {
    pub category: String,
    pub value: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Normalized {
    pub records: Vec<CategoryValue>,
    pub skipped: usize,
}

impl RecordRule {
    /// Turns one row into a record, or `None` for sub-totals, title rows,
    /// blank labels and values that are missing or not numbers.
    pub fn record_from_row(&self, row: &Row) -> Option<CategoryValue> {
        let category = row.get(self.label_column)?.text().trim().to_string();
        if category.is_empty() || SKIP_LABEL_RE.is_match(&category) {
            return None;
        }
        let value = row.get(self.value_column)?.as_f64()?;
        Some(CategoryValue { category, value })
    }

    pub fn normalize(&self, section: &ExtractedSection) -> Normalized {
        self.normalize_rows(&section.rows)
    }

    pub fn normalize_rows(&self, rows: &[Row]) -> Normalized {
        let mut out = Normalized::default();
        for row in rows {
            match self.record_from_row(row) {
                Some(record) => out.records.push(record),
                None => {
                    tracing::debug!("Skipping row: {:?}", row.get(self.label_column).map(|c| c.text()));
                    out.skipped += 1;
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sheet::{Cell, Sheet};

    fn rows() -> Vec<Row> {
        Sheet::from_text_rows(
            "section",
            &[
                &["II", "Growth/Equity Oriented Schemes", "", "", "", "", ""],
                &["1", "Large Cap Fund", "", "", "", "", "1,120.5"],
                &["2", "Mid Cap Fund", "", "", "", "", "n/a"],
                &["3", "Small Cap Fund", "", "", "", "", "-75"],
                &["", "Sub-Total - II", "", "", "", "", "1045.5"],
                &["", "SUBTOTAL", "", "", "", "", "1045.5"],
                &["4", "", "", "", "", "", "9"],
            ],
        )
        .rows
    }

    #[test]
    fn keeps_only_parseable_category_rows() {
        let normalized = RecordRule::default().normalize_rows(&rows());
        assert_eq!(
            normalized.records,
            vec![
                CategoryValue { category: "Large Cap Fund".into(), value: 1120.5 },
                CategoryValue { category: "Small Cap Fund".into(), value: -75.0 },
            ]
        );
        assert_eq!(normalized.skipped, 5);
    }

    #[test]
    fn short_rows_are_skipped() {
        let rule = RecordRule { label_column: 0, value_column: 3 };
        assert_eq!(rule.record_from_row(&vec![Cell::from("ELSS")]), None);
    }

    #[test]
    fn subtotal_filter_never_adds_rows() {
        let all = rows();
        let unfiltered = all
            .iter()
            .filter(|r| r.get(6).and_then(Cell::as_f64).is_some())
            .count();
        let filtered = RecordRule::default().normalize_rows(&all).records.len();
        assert!(filtered <= unfiltered);
    }
}
