// src/storage/store.rs
// SQLite-backed store of per-month category values.

use crate::extractors::records::CategoryValue;
use crate::utils::error::StorageError;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use serde::Serialize;
use std::path::Path;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS amfi_monthly_data (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    month           TEXT NOT NULL,
    scheme_category TEXT NOT NULL,
    net_inflow      REAL,
    created_at      TEXT NOT NULL,
    UNIQUE (month, scheme_category)
);
CREATE INDEX IF NOT EXISTS idx_amfi_month ON amfi_monthly_data (month);
CREATE INDEX IF NOT EXISTS idx_amfi_category ON amfi_monthly_data (scheme_category);
";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlowRecord {
    pub month: String,
    pub scheme_category: String,
    pub net_inflow: Option<f64>,
    pub created_at: String,
}

pub struct FlowStore {
    conn: Connection,
}

impl FlowStore {
    pub fn open(path: &Path) -> Result<Self, StorageError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        Self::with_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self, StorageError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, StorageError> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }

    /// Inserts or overwrites the value for `(month, category)`. The original
    /// `created_at` is kept on conflict.
    pub fn upsert(&self, month: &str, category: &str, net_inflow: Option<f64>) -> Result<(), StorageError> {
        self.conn.execute(
            "INSERT INTO amfi_monthly_data (month, scheme_category, net_inflow, created_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT (month, scheme_category) DO UPDATE SET net_inflow = excluded.net_inflow",
            params![month, category, net_inflow, chrono::Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    /// Upserts a batch for one month in a single transaction.
    pub fn upsert_records(&mut self, month: &str, records: &[CategoryValue]) -> Result<usize, StorageError> {
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO amfi_monthly_data (month, scheme_category, net_inflow, created_at)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT (month, scheme_category) DO UPDATE SET net_inflow = excluded.net_inflow",
            )?;
            let now = chrono::Utc::now().to_rfc3339();
            for record in records {
                stmt.execute(params![month, record.category, record.value, now])?;
            }
        }
        tx.commit()?;
        tracing::debug!("Upserted {} records for {}", records.len(), month);
        Ok(records.len())
    }

    pub fn count(&self) -> Result<usize, StorageError> {
        let n: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM amfi_monthly_data", [], |row| row.get(0))?;
        Ok(n as usize)
    }

    pub fn month_exists(&self, month: &str) -> Result<bool, StorageError> {
        let found = self
            .conn
            .query_row(
                "SELECT 1 FROM amfi_monthly_data WHERE month = ?1 LIMIT 1",
                [month],
                |row| row.get::<_, i64>(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    /// Sum of `net_inflow` over the given categories for one month; `None`
    /// when no matching row has a value.
    pub fn sum_for_categories(&self, month: &str, categories: &[&str]) -> Result<Option<f64>, StorageError> {
        if categories.is_empty() {
            return Ok(None);
        }
        let placeholders = vec!["?"; categories.len()].join(", ");
        let sql = format!(
            "SELECT SUM(net_inflow) FROM amfi_monthly_data WHERE month = ? AND scheme_category IN ({})",
            placeholders
        );
        let values = std::iter::once(month).chain(categories.iter().copied());
        let total: Option<f64> = self
            .conn
            .query_row(&sql, params_from_iter(values), |row| row.get(0))?;
        Ok(total)
    }

    pub fn records_for_month(&self, month: &str) -> Result<Vec<FlowRecord>, StorageError> {
        self.query_records(
            "SELECT month, scheme_category, net_inflow, created_at FROM amfi_monthly_data
             WHERE month = ?1 ORDER BY scheme_category",
            month,
        )
    }

    /// Every record whose month label ends with `year` (e.g. `2025`).
    pub fn records_for_year(&self, year: &str) -> Result<Vec<FlowRecord>, StorageError> {
        self.query_records(
            "SELECT month, scheme_category, net_inflow, created_at FROM amfi_monthly_data
             WHERE length(month) >= length(?1) AND substr(month, -length(?1)) = ?1
             ORDER BY id",
            year,
        )
    }

    fn query_records(&self, sql: &str, arg: &str) -> Result<Vec<FlowRecord>, StorageError> {
        let mut stmt = self.conn.prepare(sql)?;
        let records = stmt
            .query_map([arg], |row| {
                Ok(FlowRecord {
                    month: row.get(0)?,
                    scheme_category: row.get(1)?,
                    net_inflow: row.get(2)?,
                    created_at: row.get(3)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(category: &str, value: f64) -> CategoryValue {
        CategoryValue { category: category.to_string(), value }
    }

    #[test]
    fn upsert_is_idempotent() {
        let mut store = FlowStore::open_in_memory().unwrap();
        let batch = vec![record("Large Cap Fund", 120.5), record("Mid Cap Fund", 80.0)];
        store.upsert_records("Nov 2025", &batch).unwrap();
        let first = store.records_for_month("Nov 2025").unwrap();

        store.upsert_records("Nov 2025", &batch).unwrap();
        let second = store.records_for_month("Nov 2025").unwrap();

        assert_eq!(store.count().unwrap(), 2);
        assert_eq!(first, second);
    }

    #[test]
    fn last_write_wins() {
        let store = FlowStore::open_in_memory().unwrap();
        store.upsert("Nov 2025", "ELSS", Some(1.0)).unwrap();
        store.upsert("Nov 2025", "ELSS", Some(2.5)).unwrap();
        let rows = store.records_for_month("Nov 2025").unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].net_inflow, Some(2.5));
    }

    #[test]
    fn sums_only_requested_categories() {
        let store = FlowStore::open_in_memory().unwrap();
        store.upsert("Jan 2025", "Large Cap Fund", Some(10.0)).unwrap();
        store.upsert("Jan 2025", "Mid Cap Fund", Some(5.0)).unwrap();
        store.upsert("Jan 2025", "Small Cap Fund", Some(7.0)).unwrap();
        store.upsert("Feb 2025", "Large Cap Fund", Some(100.0)).unwrap();

        let sum = store
            .sum_for_categories("Jan 2025", &["Large Cap Fund", "Mid Cap Fund"])
            .unwrap();
        assert_eq!(sum, Some(15.0));
        assert_eq!(store.sum_for_categories("Mar 2025", &["Large Cap Fund"]).unwrap(), None);
    }

    #[test]
    fn year_filter_matches_label_suffix() {
        let store = FlowStore::open_in_memory().unwrap();
        store.upsert("Jan 2025", "ELSS", Some(1.0)).unwrap();
        store.upsert("Dec 2024", "ELSS", Some(2.0)).unwrap();
        store.upsert("November 2025", "ELSS", None).unwrap();

        let months: Vec<String> = store
            .records_for_year("2025")
            .unwrap()
            .into_iter()
            .map(|r| r.month)
            .collect();
        assert_eq!(months, vec!["Jan 2025", "November 2025"]);
        assert!(store.month_exists("Dec 2024").unwrap());
        assert!(!store.month_exists("Dec 2023").unwrap());
    }

    #[test]
    fn file_store_persists_across_opens() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("db").join("fundflow.sqlite3");
        FlowStore::open(&path).unwrap().upsert("Nov 2025", "ELSS", Some(3.0)).unwrap();
        assert_eq!(FlowStore::open(&path).unwrap().count().unwrap(), 1);
    }
}
