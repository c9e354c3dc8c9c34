// src/extractors/config.rs

use crate::utils::error::ExtractError;
use serde::{Deserialize, Serialize};
use std::path::Path;

// --- Keyword presets ---
const AMFI_HEADER_KEYWORDS: &[&str] = &["scheme", "schemes", "net", "assets", "aum", "rs.", "₹"];
const AMFI_START_KEYWORDS: &[&str] = &["growth", "equity", "oriented"];
const SUBTOTAL_KEYWORDS: &[&str] = &["sub total", "subtotal", "sub-total"];

const NSDL_HEADER_KEYWORDS: &[&str] = &["sector", "sr."];
// The column-header row ("Sr. No. | Sectors | ...") opens the block; a bare
// "sector" also hits the report title.
const NSDL_START_KEYWORDS: &[&str] = &["sr.", "sector"];
const NSDL_END_KEYWORDS: &[&str] = &["grand total"];

/// Keyword configuration for one report family.
///
/// Header and end keywords match if ANY occurs in a row; start keywords match
/// only if ALL occur. Keywords are stored lowercase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractorConfig {
    #[serde(default)]
    pub header_keywords: Vec<String>,
    pub start_keywords: Vec<String>,
    pub end_keywords: Vec<String>,
    #[serde(default = "default_true")]
    pub has_header_row: bool,
    #[serde(default = "default_true")]
    pub end_inclusive: bool,
    /// When set, sliced rows whose cells past the first `n` are all blank
    /// (category title rows) are dropped as well.
    #[serde(default)]
    pub label_columns: Option<usize>,
}

fn default_true() -> bool {
    true
}

fn lowered(keywords: &[&str]) -> Vec<String> {
    keywords.iter().map(|k| k.to_lowercase()).collect()
}

impl ExtractorConfig {
    /// Growth/Equity Oriented Schemes block of the AMFI monthly report.
    pub fn amfi_growth_equity() -> Self {
        Self {
            header_keywords: lowered(AMFI_HEADER_KEYWORDS),
            start_keywords: lowered(AMFI_START_KEYWORDS),
            end_keywords: lowered(SUBTOTAL_KEYWORDS),
            has_header_row: true,
            end_inclusive: true,
            label_columns: None,
        }
    }

    /// Sector table of the NSDL fortnightly FPI report. The HTML tables carry
    /// their own multi-row header, so header detection is off.
    pub fn nsdl_sectors() -> Self {
        Self {
            header_keywords: lowered(NSDL_HEADER_KEYWORDS),
            start_keywords: lowered(NSDL_START_KEYWORDS),
            end_keywords: lowered(NSDL_END_KEYWORDS),
            has_header_row: false,
            end_inclusive: true,
            label_columns: None,
        }
    }

    pub fn with_end_inclusive(mut self, end_inclusive: bool) -> Self {
        self.end_inclusive = end_inclusive;
        self
    }

    pub fn with_label_columns(mut self, label_columns: Option<usize>) -> Self {
        self.label_columns = label_columns;
        self
    }

    /// Loads a profile from a JSON file and validates it.
    pub fn from_json_file(path: &Path) -> Result<Self, ExtractError> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            ExtractError::InvalidProfile(format!("{}: {}", path.display(), e))
        })?;
        Self::from_json_str(&raw)
    }

    pub fn from_json_str(raw: &str) -> Result<Self, ExtractError> {
        let parsed: ExtractorConfig = serde_json::from_str(raw)
            .map_err(|e| ExtractError::InvalidProfile(e.to_string()))?;
        parsed.normalized()
    }

    /// Lowercases and trims every keyword, drops blanks, and rejects profiles
    /// that could never match.
    pub fn normalized(self) -> Result<Self, ExtractError> {
        let clean = |list: Vec<String>| -> Vec<String> {
            list.into_iter()
                .map(|k| k.trim().to_lowercase())
                .filter(|k| !k.is_empty())
                .collect()
        };
        let config = Self {
            header_keywords: clean(self.header_keywords),
            start_keywords: clean(self.start_keywords),
            end_keywords: clean(self.end_keywords),
            ..self
        };

        if config.start_keywords.is_empty() {
            return Err(ExtractError::InvalidProfile("start_keywords is empty".to_string()));
        }
        if config.end_keywords.is_empty() {
            return Err(ExtractError::InvalidProfile("end_keywords is empty".to_string()));
        }
        if config.has_header_row && config.header_keywords.is_empty() {
            return Err(ExtractError::InvalidProfile(
                "header detection is on but header_keywords is empty".to_string(),
            ));
        }
        Ok(config)
    }

    pub fn matches_header(&self, text: &str) -> bool {
        self.header_keywords.iter().any(|k| text.contains(k.as_str()))
    }

    pub fn matches_start(&self, text: &str) -> bool {
        self.start_keywords.iter().all(|k| text.contains(k.as_str()))
    }

    pub fn matches_end(&self, text: &str) -> bool {
        self.end_keywords.iter().any(|k| text.contains(k.as_str()))
    }
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self::amfi_growth_equity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profile_json_is_normalized() {
        let raw = r#"{
            "header_keywords": ["  Scheme "],
            "start_keywords": ["Growth", "EQUITY"],
            "end_keywords": ["Sub Total", ""]
        }"#;
        let config = ExtractorConfig::from_json_str(raw).unwrap();
        assert_eq!(config.header_keywords, vec!["scheme"]);
        assert_eq!(config.start_keywords, vec!["growth", "equity"]);
        assert_eq!(config.end_keywords, vec!["sub total"]);
        assert!(config.has_header_row);
        assert!(config.end_inclusive);
    }

    #[test]
    fn profile_without_start_keywords_is_rejected() {
        let raw = r#"{"start_keywords": [], "end_keywords": ["total"], "has_header_row": false}"#;
        assert!(matches!(
            ExtractorConfig::from_json_str(raw),
            Err(ExtractError::InvalidProfile(_))
        ));
    }

    #[test]
    fn start_requires_every_keyword() {
        let config = ExtractorConfig::amfi_growth_equity();
        assert!(config.matches_start("ii growth/equity oriented schemes"));
        assert!(config.matches_start("oriented equity growth"));
        assert!(!config.matches_start("growth equity"));
    }
}
