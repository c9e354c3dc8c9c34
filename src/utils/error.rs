// src/utils/error.rs
use std::path::PathBuf;
use thiserror::Error;

// Define specific error types for different parts of the application
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Network request failed: {0}")]
    Network(#[from] reqwest::Error), // Timeouts and connection errors land here

    #[error("HTTP error: {0}")]
    Http(reqwest::StatusCode), // e.g., 404 Not Found for a month not yet published

    #[error("Empty response body from {0}")]
    EmptyBody(String),

    #[error("Failed to save download: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum SheetError {
    #[error("Could not read workbook {path}: {reason}")]
    Unreadable { path: PathBuf, reason: String },

    #[error("Workbook {0} has no worksheets")]
    NoWorksheet(PathBuf),

    #[error("Failed to write workbook: {0}")]
    Write(#[from] rust_xlsxwriter::XlsxError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("Header row not found")]
    HeaderNotFound,

    #[error("Section not found: {0}")]
    SectionNotFound(String),

    #[error("Invalid keyword profile: {0}")]
    InvalidProfile(String),
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Store lock poisoned")]
    Poisoned,
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error), // Automatically convert IO errors

    #[error("Download failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("Spreadsheet error: {0}")]
    Sheet(#[from] SheetError),

    #[error("Extraction failed: {0}")]
    Extraction(#[from] ExtractError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Data processing failed: {0}")]
    Processing(String),
}
