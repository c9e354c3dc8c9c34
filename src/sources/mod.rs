// src/sources/mod.rs
pub mod amfi;
pub mod models;
pub mod nsdl;

pub use amfi::AmfiClient;
pub use models::ReportMonth;
