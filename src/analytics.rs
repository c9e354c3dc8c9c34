// src/analytics.rs
//! Read-side aggregates over stored monthly category values.

use crate::sources::models::{normalize_label, sort_labels_calendar};
use crate::storage::FlowStore;
use crate::utils::error::StorageError;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

pub const SMALL_CAP_CATEGORY: &str = "Small Cap Fund";

/// Categories summed into the large/mid-cap bucket.
pub const LARGE_MIDCAP_BUCKET: [&str; 9] = [
    "Large Cap Fund",
    "Mid Cap Fund",
    "Large & Mid Cap Fund",
    "Flexi Cap Fund",
    "Focused Fund",
    "Value Fund/Contra Fund",
    "Dividend Yield Fund",
    "ELSS",
    "Sectoral/Thematic Funds",
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlySummary {
    pub month: String,
    pub small_cap: f64,
    pub large_midcap: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthComparison {
    pub month_a: String,
    pub month_b: String,
    pub small_cap_change: f64,
    pub large_midcap_change: f64,
}

/// Month × category matrix for one year.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct YearPivot {
    pub year: String,
    /// Plain string sort: "Feb 2025" comes before "Jan 2025".
    pub months: Vec<String>,
    /// Same months in calendar order.
    pub calendar_months: Vec<String>,
    pub categories: Vec<String>,
    pub matrix: BTreeMap<String, BTreeMap<String, Option<f64>>>,
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Small-cap and large/mid-cap totals for a month. A month with no rows
/// yields zeros. `month` may use the full month name; it is looked up in its
/// stored `Mon YYYY` form.
pub fn monthly_summary(store: &FlowStore, month: &str) -> Result<MonthlySummary, StorageError> {
    let month = normalize_label(month);
    let small_cap = store.sum_for_categories(&month, &[SMALL_CAP_CATEGORY])?.unwrap_or(0.0);
    let large_midcap = store.sum_for_categories(&month, &LARGE_MIDCAP_BUCKET)?.unwrap_or(0.0);
    Ok(MonthlySummary {
        month,
        small_cap: round2(small_cap),
        large_midcap: round2(large_midcap),
    })
}

/// Change from `month_a` to `month_b` (b − a) for both aggregates.
pub fn compare_months(store: &FlowStore, month_a: &str, month_b: &str) -> Result<MonthComparison, StorageError> {
    let a = monthly_summary(store, month_a)?;
    let b = monthly_summary(store, month_b)?;
    Ok(compare_summaries(&a, &b))
}

pub fn compare_summaries(a: &MonthlySummary, b: &MonthlySummary) -> MonthComparison {
    MonthComparison {
        month_a: a.month.clone(),
        month_b: b.month.clone(),
        small_cap_change: round2(b.small_cap - a.small_cap),
        large_midcap_change: round2(b.large_midcap - a.large_midcap),
    }
}

pub fn year_pivot(store: &FlowStore, year: &str) -> Result<YearPivot, StorageError> {
    let records = store.records_for_year(year)?;

    let mut months = BTreeSet::new();
    let mut categories = BTreeSet::new();
    let mut matrix: BTreeMap<String, BTreeMap<String, Option<f64>>> = BTreeMap::new();
    for record in records {
        months.insert(record.month.clone());
        categories.insert(record.scheme_category.clone());
        matrix
            .entry(record.month)
            .or_default()
            .insert(record.scheme_category, record.net_inflow);
    }

    let months: Vec<String> = months.into_iter().collect();
    let mut calendar_months = months.clone();
    sort_labels_calendar(&mut calendar_months);

    Ok(YearPivot {
        year: year.to_string(),
        months,
        calendar_months,
        categories: categories.into_iter().collect(),
        matrix,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_uses_fixed_categories() {
        let store = FlowStore::open_in_memory().unwrap();
        store.upsert("Nov 2025", "Small Cap Fund", Some(100.004)).unwrap();
        store.upsert("Nov 2025", "Large Cap Fund", Some(150.0)).unwrap();
        store.upsert("Nov 2025", "ELSS", Some(50.0)).unwrap();
        store.upsert("Nov 2025", "Multi Asset Allocation Fund", Some(999.0)).unwrap();

        let summary = monthly_summary(&store, "Nov 2025").unwrap();
        assert_eq!(summary.small_cap, 100.0);
        assert_eq!(summary.large_midcap, 200.0);
    }

    #[test]
    fn full_month_names_find_stored_rows() {
        let store = FlowStore::open_in_memory().unwrap();
        store.upsert("Nov 2025", "Small Cap Fund", Some(42.0)).unwrap();

        let summary = monthly_summary(&store, "November 2025").unwrap();
        assert_eq!(summary.month, "Nov 2025");
        assert_eq!(summary.small_cap, 42.0);

        let cmp = compare_months(&store, "october 2025", "November 2025").unwrap();
        assert_eq!(cmp.month_a, "Oct 2025");
        assert_eq!(cmp.small_cap_change, 42.0);
    }

    #[test]
    fn missing_month_is_zero() {
        let store = FlowStore::open_in_memory().unwrap();
        let summary = monthly_summary(&store, "Jan 1999").unwrap();
        assert_eq!(summary.small_cap, 0.0);
        assert_eq!(summary.large_midcap, 0.0);
    }

    #[test]
    fn comparison_is_b_minus_a() {
        let store = FlowStore::open_in_memory().unwrap();
        store.upsert("Jan 2025", "Small Cap Fund", Some(100.0)).unwrap();
        store.upsert("Jan 2025", "Large Cap Fund", Some(200.0)).unwrap();
        store.upsert("Feb 2025", "Small Cap Fund", Some(150.0)).unwrap();
        store.upsert("Feb 2025", "Large Cap Fund", Some(180.0)).unwrap();

        let cmp = compare_months(&store, "Jan 2025", "Feb 2025").unwrap();
        assert_eq!(cmp.small_cap_change, 50.0);
        assert_eq!(cmp.large_midcap_change, -20.0);
        assert_eq!(cmp.month_a, "Jan 2025");
    }

    #[test]
    fn year_pivot_months_sort_lexically() {
        let store = FlowStore::open_in_memory().unwrap();
        store.upsert("Jan 2025", "Large Cap Fund", Some(1.0)).unwrap();
        store.upsert("Feb 2025", "Large Cap Fund", Some(2.0)).unwrap();
        store.upsert("Feb 2025", "ELSS", None).unwrap();
        store.upsert("Dec 2024", "ELSS", Some(9.0)).unwrap();

        let pivot = year_pivot(&store, "2025").unwrap();
        assert_eq!(pivot.months, vec!["Feb 2025", "Jan 2025"]);
        assert_eq!(pivot.calendar_months, vec!["Jan 2025", "Feb 2025"]);
        assert_eq!(pivot.categories, vec!["ELSS", "Large Cap Fund"]);
        assert_eq!(pivot.matrix["Feb 2025"]["Large Cap Fund"], Some(2.0));
        assert_eq!(pivot.matrix["Feb 2025"]["ELSS"], None);
        assert!(!pivot.matrix["Jan 2025"].contains_key("ELSS"));
    }
}
