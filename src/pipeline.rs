// src/pipeline.rs
//! Sequential batch runs: every file is processed to completion before the
//! next one starts, and no single failure stops the batch.

use crate::extractors::records::{Normalized, RecordRule};
use crate::extractors::section::{ExtractionOutcome, SectionExtractor};
use crate::extractors::usd::{extract_usd_columns, USD_HEADER_ROWS};
use crate::extractors::ExtractorConfig;
use crate::sheet::Sheet;
use crate::sources::amfi::{is_present, AmfiClient};
use crate::sources::models::{DownloadStatus, ReportMonth};
use crate::sources::nsdl;
use crate::storage::{spreadsheet_files, FlowStore, StorageManager};
use crate::utils::error::{AppError, SheetError};
use crate::workbook;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Per-run counters, logged once at the end.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub downloaded: usize,
    pub already_present: usize,
    pub not_available: usize,
    pub extracted: usize,
    pub skipped_existing: usize,
    pub missed: usize,
    pub failed: usize,
    pub records_stored: usize,
    pub rows_skipped: usize,
}

impl BatchSummary {
    pub fn log(&self, what: &str) {
        tracing::info!(
            "{} finished. Downloaded: {}, Already present: {}, Not available: {}, Extracted: {}, \
             Skipped (output exists): {}, Section missing: {}, Failed: {}, Records stored: {}, Rows skipped: {}",
            what,
            self.downloaded,
            self.already_present,
            self.not_available,
            self.extracted,
            self.skipped_existing,
            self.missed,
            self.failed,
            self.records_stored,
            self.rows_skipped,
        );
    }

    /// True when something was attempted and every attempt ended in an error.
    pub fn all_failed(&self) -> bool {
        let succeeded = self.downloaded
            + self.already_present
            + self.not_available
            + self.extracted
            + self.skipped_existing
            + self.missed;
        self.failed > 0 && succeeded == 0
    }
}

/// Reads one workbook and runs the extractor over its first sheet.
pub fn extract_file(path: &Path, extractor: &SectionExtractor) -> Result<ExtractionOutcome, SheetError> {
    let sheet = workbook::read_first_sheet(path)?;
    Ok(extractor.extract(&sheet))
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Downloads every requested month that is not already on disk.
pub async fn run_fetch(client: &AmfiClient, months: &[ReportMonth], storage: &StorageManager) -> BatchSummary {
    let mut summary = BatchSummary::default();
    let dir = storage.downloads_dir();
    for month in months {
        match client.download_month(month, &dir).await {
            Ok((path, DownloadStatus::Downloaded { bytes })) => {
                tracing::debug!("Saved {} ({} bytes)", path.display(), bytes);
                summary.downloaded += 1;
            }
            Ok((_, DownloadStatus::AlreadyPresent)) => summary.already_present += 1,
            Ok((_, DownloadStatus::NotAvailable)) => summary.not_available += 1,
            Err(e) => {
                tracing::error!("Error fetching {}: {}", month.file_name(), e);
                summary.failed += 1;
            }
        }
    }
    summary
}

/// Standalone extractor: every spreadsheet in `input_dir` → one extracted
/// workbook, skipping inputs whose output already exists.
pub fn run_extract(input_dir: &Path, storage: &StorageManager, extractor: &SectionExtractor) -> Result<BatchSummary, AppError> {
    let mut summary = BatchSummary::default();
    storage.ensure_dirs()?;

    for path in spreadsheet_files(input_dir)? {
        let stem = file_stem(&path);
        if is_present(&storage.extracted_path(&stem)) {
            tracing::debug!("{} already extracted", stem);
            summary.skipped_existing += 1;
            continue;
        }

        tracing::info!("Processing {}", path.display());
        match extract_file(&path, extractor) {
            Ok(ExtractionOutcome::Found(section)) => {
                if section.is_empty() {
                    tracing::warn!("{}: section located but every row was blank", stem);
                }
                tracing::info!("{}: {} rows x {} columns", stem, section.len(), section.width());
                match storage.save_section(&stem, &section) {
                    Ok(_) => summary.extracted += 1,
                    Err(e) => {
                        tracing::error!("Failed to save section for {}: {}", stem, e);
                        summary.failed += 1;
                        continue;
                    }
                }
                if let Err(e) = storage.save_section_metadata(&stem, &section) {
                    tracing::warn!("Failed to save section metadata for {}: {}", stem, e);
                }
            }
            Ok(outcome) => {
                tracing::warn!("{}: {}", path.display(), miss_reason(outcome));
                summary.missed += 1;
            }
            Err(e) => {
                tracing::error!("Failed to read {}: {}", path.display(), e);
                summary.failed += 1;
            }
        }
    }
    Ok(summary)
}

/// Full pipeline: download → extract → upsert, one month at a time.
pub async fn run_pipeline(
    client: &AmfiClient,
    months: &[ReportMonth],
    storage: &StorageManager,
    extractor: &SectionExtractor,
    rule: &RecordRule,
    store: &mut FlowStore,
) -> Result<BatchSummary, AppError> {
    let mut summary = BatchSummary::default();
    storage.ensure_dirs()?;
    let dir = storage.downloads_dir();

    for month in months {
        let path = match client.download_month(month, &dir).await {
            Ok((path, DownloadStatus::Downloaded { .. })) => {
                summary.downloaded += 1;
                path
            }
            Ok((path, DownloadStatus::AlreadyPresent)) => {
                summary.already_present += 1;
                path
            }
            Ok((_, DownloadStatus::NotAvailable)) => {
                summary.not_available += 1;
                continue;
            }
            Err(e) => {
                tracing::error!("Error fetching {}: {}", month.file_name(), e);
                summary.failed += 1;
                continue;
            }
        };

        let section = match extract_file(&path, extractor) {
            Ok(ExtractionOutcome::Found(section)) => section,
            Ok(outcome) => {
                tracing::warn!("{}: {}", month.label(), miss_reason(outcome));
                summary.missed += 1;
                continue;
            }
            Err(e) => {
                tracing::error!("Failed to read {}: {}", path.display(), e);
                summary.failed += 1;
                continue;
            }
        };
        summary.extracted += 1;

        let stem = file_stem(&path);
        if !is_present(&storage.extracted_path(&stem)) {
            if let Err(e) = storage.save_section(&stem, &section) {
                tracing::warn!("Failed to save section workbook for {}: {}", stem, e);
            }
        }

        let Normalized { records, skipped } = rule.normalize(&section);
        summary.rows_skipped += skipped;
        match store.upsert_records(&month.label(), &records) {
            Ok(n) => {
                tracing::info!("Stored {} records for {} ({} rows skipped)", n, month.label(), skipped);
                summary.records_stored += n;
            }
            Err(e) => {
                tracing::error!("Failed to store records for {}: {}", month.label(), e);
                summary.failed += 1;
            }
        }
    }
    Ok(summary)
}

/// Loads an already extracted workbook (first row is the header) under the
/// given reporting period label.
pub fn load_extracted(path: &Path, month: &str, rule: &RecordRule, store: &mut FlowStore) -> Result<Normalized, AppError> {
    let sheet = workbook::read_first_sheet(path)?;
    let Some((header, body)) = sheet.rows.split_first() else {
        return Err(AppError::Processing(format!("{} is empty", path.display())));
    };
    let labels: Vec<String> = header.iter().map(|c| c.text()).collect();
    tracing::info!("Columns: {:?}", labels);

    let normalized = rule.normalize_rows(body);
    store.upsert_records(month, &normalized.records)?;
    tracing::info!(
        "Loaded {} records for {} from {} ({} rows skipped)",
        normalized.records.len(),
        month,
        path.display(),
        normalized.skipped
    );
    Ok(normalized)
}

fn miss_reason(outcome: ExtractionOutcome) -> String {
    match outcome.into_result() {
        Ok(_) => "section found".to_string(),
        Err(e) => e.to_string(),
    }
}

// --- NSDL ---

/// Files written by one NSDL run.
#[derive(Debug, Clone, Default)]
pub struct NsdlOutput {
    pub html: PathBuf,
    pub workbook: PathBuf,
    pub usd_workbook: Option<PathBuf>,
}

/// Fetches an NSDL report page and writes its tables to a workbook. The
/// located sector block is added as an extra `Sectors` sheet.
pub async fn run_nsdl(url: &str, storage: &StorageManager, usd_only: bool, timeout: Duration) -> Result<NsdlOutput, AppError> {
    let body = nsdl::fetch_report_html(url, timeout).await?;
    let dir = storage.nsdl_dir();
    std::fs::create_dir_all(&dir)?;

    let stamp = chrono::Local::now().format("%Y%m%d_%H%M%S").to_string();
    let html_path = dir.join(format!("nsdl_page_{}.html", stamp));
    std::fs::write(&html_path, &body)?;
    tracing::info!("Saved HTML to {}", html_path.display());

    let mut tables = nsdl::report_tables(&body);
    if tables.is_empty() {
        return Err(AppError::Processing(format!("No tables found at {}", url)));
    }

    let sectors = SectionExtractor::new(ExtractorConfig::nsdl_sectors()).extract(&tables[0]);
    match sectors {
        ExtractionOutcome::Found(section) => {
            tracing::info!("Sector block: {} rows", section.len());
            tables.push(Sheet::new("Sectors", section.rows));
        }
        other => tracing::warn!("Sector block not located: {}", miss_reason(other)),
    }

    let workbook_path = dir.join(format!("NSDL_FII_Sector_Data_{}.xlsx", stamp));
    workbook::write_sheets(&workbook_path, &tables)?;
    tracing::info!("Saved {} table(s) to {}", tables.len(), workbook_path.display());

    let usd_workbook = if usd_only {
        Some(write_usd(&tables[0], &dir, &stamp)?)
    } else {
        None
    };

    Ok(NsdlOutput { html: html_path, workbook: workbook_path, usd_workbook })
}

/// Writes the USD-only workbook for an existing NSDL workbook.
pub fn run_usd(file: &Path, storage: &StorageManager) -> Result<PathBuf, AppError> {
    let sheet = workbook::read_first_sheet(file)?;
    if sheet.is_empty() {
        return Err(AppError::Processing(format!("{} has no rows", file.display())));
    }
    tracing::info!("Sheet '{}': {} rows x {} columns", sheet.name, sheet.len(), sheet.width());
    let dir = storage.nsdl_dir();
    std::fs::create_dir_all(&dir)?;
    let stamp = chrono::Local::now().format("%Y%m%d_%H%M%S").to_string();
    write_usd(&sheet, &dir, &stamp)
}

fn write_usd(sheet: &Sheet, dir: &Path, stamp: &str) -> Result<PathBuf, AppError> {
    let (layout, usd) = extract_usd_columns(sheet);
    tracing::info!(
        "Sector column: {}, USD starts from column: {} (marker row {:?})",
        layout.sector_col,
        layout.usd_start_col,
        layout.header_row
    );
    let path = dir.join(format!("AUC_USD_Only_{}.xlsx", stamp));
    workbook::write_with_header_rows(&path, &usd, USD_HEADER_ROWS)?;
    tracing::info!("USD data extracted to {} ({} rows)", path.display(), usd.len());
    Ok(path)
}
