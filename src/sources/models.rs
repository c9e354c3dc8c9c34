// src/sources/models.rs
use std::cmp::Ordering;
use std::fmt;

/// Calendar order of month abbreviations. Period labels sort lexically as
/// strings, so anything shown in calendar order goes through this table.
pub const MONTH_ABBREVIATIONS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

const MONTH_NAMES: [&str; 12] = [
    "January", "February", "March", "April", "May", "June", "July", "August", "September",
    "October", "November", "December",
];

/// One AMFI reporting month. Only built through [`ReportMonth::new`] and the
/// parsers, so `month` is always 1..=12.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ReportMonth {
    month: u32,
    year: i32,
}

impl ReportMonth {
    pub fn new(month: u32, year: i32) -> Option<Self> {
        (1..=12).contains(&month).then_some(Self { month, year })
    }

    pub fn abbreviation(&self) -> &'static str {
        MONTH_ABBREVIATIONS[(self.month - 1) as usize]
    }

    /// File name AMFI publishes the report under, e.g. `amnov2025repo.xls`.
    pub fn file_name(&self) -> String {
        format!("am{}{}repo.xls", self.abbreviation().to_lowercase(), self.year)
    }

    /// Reporting period label used as the store key, e.g. `Nov 2025`.
    pub fn label(&self) -> String {
        format!("{} {}", self.abbreviation(), self.year)
    }

    /// Parses `Nov 2025`, `nov 2025` or `November 2025`.
    pub fn parse_label(label: &str) -> Option<Self> {
        let mut parts = label.split_whitespace();
        let month_part = parts.next()?;
        let year: i32 = parts.next()?.parse().ok()?;
        if parts.next().is_some() {
            return None;
        }
        let month = month_index(month_part)?;
        Self::new(month, year)
    }

    /// Recovers the month from an AMFI file stem like `amnov2025repo`.
    pub fn from_file_stem(stem: &str) -> Option<Self> {
        let rest = stem.to_lowercase();
        let rest = rest.strip_prefix("am")?;
        let rest = rest.split("repo").next()?;
        if rest.len() < 7 || !rest.is_char_boundary(3) {
            return None;
        }
        let (mon, year) = rest.split_at(3);
        Self::new(month_index(mon)?, year.parse().ok()?)
    }

    /// Every month of `year`, January first.
    pub fn months_of(year: i32) -> impl Iterator<Item = ReportMonth> {
        (1..=12).map(move |month| ReportMonth { month, year })
    }
}

impl fmt::Display for ReportMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl PartialOrd for ReportMonth {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ReportMonth {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.year, self.month).cmp(&(other.year, other.month))
    }
}

/// Canonical `Mon YYYY` form of a period label, so `November 2025` and
/// `nov 2025` address the same stored rows. Labels that do not parse are
/// returned trimmed.
pub fn normalize_label(label: &str) -> String {
    match ReportMonth::parse_label(label) {
        Some(month) => month.label(),
        None => label.trim().to_string(),
    }
}

/// 1-based month number for an abbreviation or full name, any case.
pub fn month_index(name: &str) -> Option<u32> {
    let lower = name.trim().to_lowercase();
    MONTH_ABBREVIATIONS
        .iter()
        .zip(MONTH_NAMES.iter())
        .position(|(abbr, full)| lower == abbr.to_lowercase() || lower == full.to_lowercase())
        .map(|i| i as u32 + 1)
}

/// Sorts period labels into calendar order using the month table. Labels
/// that do not parse keep their relative order after the parsed ones.
pub fn sort_labels_calendar(labels: &mut [String]) {
    labels.sort_by_key(|label| match ReportMonth::parse_label(label) {
        Some(month) => (0, month.year, month.month),
        None => (1, 0, 0),
    });
}

/// Outcome of one report download attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadStatus {
    Downloaded { bytes: usize },
    AlreadyPresent,
    NotAvailable,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_name_and_label() {
        let nov = ReportMonth::new(11, 2025).unwrap();
        assert_eq!(nov.file_name(), "amnov2025repo.xls");
        assert_eq!(nov.label(), "Nov 2025");
    }

    #[test]
    fn labels_parse_short_and_long() {
        assert_eq!(ReportMonth::parse_label("November 2025"), ReportMonth::new(11, 2025));
        assert_eq!(ReportMonth::parse_label("sep 2024"), ReportMonth::new(9, 2024));
        assert_eq!(ReportMonth::parse_label("Sept 2024"), None);
        assert_eq!(ReportMonth::parse_label("Nov"), None);
    }

    #[test]
    fn file_stems_round_back_to_months() {
        assert_eq!(ReportMonth::from_file_stem("amnov2025repo"), ReportMonth::new(11, 2025));
        assert_eq!(ReportMonth::from_file_stem("AMJAN2024REPO"), ReportMonth::new(1, 2024));
        assert_eq!(ReportMonth::from_file_stem("report"), None);
    }

    #[test]
    fn labels_normalize_to_short_form() {
        assert_eq!(normalize_label("November 2025"), "Nov 2025");
        assert_eq!(normalize_label(" nov 2025 "), "Nov 2025");
        assert_eq!(normalize_label("Q3 2025"), "Q3 2025");
    }

    #[test]
    fn out_of_range_months_are_rejected() {
        assert_eq!(ReportMonth::new(0, 2025), None);
        assert_eq!(ReportMonth::new(13, 2025), None);
    }

    #[test]
    fn calendar_sort_differs_from_lexical() {
        let mut labels = vec!["Mar 2025".to_string(), "Feb 2025".to_string(), "Jan 2025".to_string()];
        let mut lexical = labels.clone();
        lexical.sort();
        assert_eq!(lexical, vec!["Feb 2025", "Jan 2025", "Mar 2025"]);
        sort_labels_calendar(&mut labels);
        assert_eq!(labels, vec!["Jan 2025", "Feb 2025", "Mar 2025"]);
    }
}
