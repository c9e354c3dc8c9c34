// src/extractors/mod.rs
pub mod config;
pub mod records;
pub mod section;
pub mod usd;

// Re-export key extraction types for convenience
pub use config::ExtractorConfig;
pub use records::RecordRule;
pub use section::SectionExtractor;
