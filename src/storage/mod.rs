// src/storage/mod.rs
pub mod store;

pub use store::{FlowRecord, FlowStore};

use crate::extractors::section::ExtractedSection;
use crate::utils::error::{SheetError, StorageError};
use crate::workbook;
use std::fs;
use std::path::{Path, PathBuf};

const DOWNLOAD_DIR: &str = "amfi_downloads";
const EXTRACTED_DIR: &str = "extracted_growth_equity";
const NSDL_DIR: &str = "nsdl";
const EXTRACTED_SUFFIX: &str = "_growth_equity";

/// On-disk layout for downloads and extracted workbooks under one base
/// directory.
pub struct StorageManager {
    base_dir: PathBuf,
}

impl StorageManager {
    /// Creates a new StorageManager with the specified base directory
    pub fn new<P: AsRef<Path>>(base_dir: P) -> Result<Self, StorageError> {
        let base_path = base_dir.as_ref().to_path_buf();

        // Create the base directory if it doesn't exist
        if !base_path.exists() {
            fs::create_dir_all(&base_path).map_err(StorageError::IoError)?;
        }

        Ok(Self { base_dir: base_path })
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn downloads_dir(&self) -> PathBuf {
        self.base_dir.join(DOWNLOAD_DIR)
    }

    pub fn extracted_dir(&self) -> PathBuf {
        self.base_dir.join(EXTRACTED_DIR)
    }

    pub fn nsdl_dir(&self) -> PathBuf {
        self.base_dir.join(NSDL_DIR)
    }

    pub fn ensure_dirs(&self) -> Result<(), StorageError> {
        for dir in [self.downloads_dir(), self.extracted_dir()] {
            fs::create_dir_all(&dir)?;
        }
        Ok(())
    }

    /// Where the extracted workbook for a source file stem lands, e.g.
    /// `amnov2025repo` → `extracted_growth_equity/amnov2025repo_growth_equity.xlsx`.
    pub fn extracted_path(&self, stem: &str) -> PathBuf {
        self.extracted_dir()
            .join(format!("{}{}.xlsx", stem, EXTRACTED_SUFFIX))
    }

    /// Saves the extracted section as a workbook.
    pub fn save_section(&self, stem: &str, section: &ExtractedSection) -> Result<PathBuf, SheetError> {
        let file_path = self.extracted_path(stem);
        workbook::write_section(&file_path, section)?;
        tracing::info!("Saved section to {}", file_path.display());
        Ok(file_path)
    }

    /// Saves metadata about the section in JSON format next to the workbook.
    pub fn save_section_metadata(&self, stem: &str, section: &ExtractedSection) -> Result<PathBuf, StorageError> {
        let target_dir = self.extracted_dir();
        fs::create_dir_all(&target_dir)?;

        let file_path = target_dir.join(format!("{}{}_meta.json", stem, EXTRACTED_SUFFIX));

        let metadata = serde_json::json!({
            "source": stem,
            "sheet": section.source_name,
            "header_row": section.header_row,
            "start_row": section.bounds.start,
            "end_row": section.bounds.end,
            "columns": section.columns,
            "row_count": section.len(),
            "extraction_timestamp": chrono::Utc::now().to_rfc3339(),
        });

        let metadata_str = serde_json::to_string_pretty(&metadata)
            .map_err(|e| StorageError::SerializationError(e.to_string()))?;
        fs::write(&file_path, metadata_str)?;

        tracing::debug!("Saved metadata to {}", file_path.display());
        Ok(file_path)
    }
}

/// Spreadsheet inputs in `dir`, sorted by name so batch runs are repeatable.
pub fn spreadsheet_files(dir: &Path) -> Result<Vec<PathBuf>, StorageError> {
    let mut files: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.is_file()
                && path
                    .extension()
                    .and_then(|e| e.to_str())
                    .is_some_and(|e| e.eq_ignore_ascii_case("xls") || e.eq_ignore_ascii_case("xlsx"))
        })
        .collect();
    files.sort();
    Ok(files)
}
