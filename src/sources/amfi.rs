// src/sources/amfi.rs
use crate::sources::models::{DownloadStatus, ReportMonth};
use crate::utils::error::FetchError;
use chrono::Datelike;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const AMFI_BASE_URL: &str = "https://portal.amfiindia.com/spages";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
/// Years fetched by default, counting the current one.
pub const DEFAULT_YEAR_SPAN: i32 = 5;

const AMFI_USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) fundflow/0.1";

/// Downloads AMFI monthly report workbooks.
pub struct AmfiClient {
    http: reqwest::Client,
    base_url: String,
}

impl AmfiClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, FetchError> {
        let http = reqwest::Client::builder()
            .user_agent(AMFI_USER_AGENT)
            .timeout(timeout)
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn url_for(&self, month: &ReportMonth) -> String {
        format!("{}/{}", self.base_url, month.file_name())
    }

    /// Fetches one month into `dir` unless a non-empty copy is already there.
    ///
    /// A non-200 status or an empty body means the month is not published
    /// (yet); only transport failures come back as errors.
    pub async fn download_month(
        &self,
        month: &ReportMonth,
        dir: &Path,
    ) -> Result<(PathBuf, DownloadStatus), FetchError> {
        let path = dir.join(month.file_name());
        if is_present(&path) {
            tracing::debug!("{} already downloaded", path.display());
            return Ok((path, DownloadStatus::AlreadyPresent));
        }

        let url = self.url_for(month);
        tracing::info!("Checking {}...", url);
        let response = self.http.get(&url).send().await?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            tracing::info!("Not available: {} (HTTP {})", month.file_name(), status);
            return Ok((path, DownloadStatus::NotAvailable));
        }

        let body = response.bytes().await?;
        if body.is_empty() {
            tracing::info!("Not available: {} (empty body)", month.file_name());
            return Ok((path, DownloadStatus::NotAvailable));
        }

        tokio::fs::create_dir_all(dir).await?;
        tokio::fs::write(&path, &body).await?;
        tracing::info!("Downloaded: {} ({} bytes)", month.file_name(), body.len());
        Ok((path, DownloadStatus::Downloaded { bytes: body.len() }))
    }
}

pub fn is_present(path: &Path) -> bool {
    std::fs::metadata(path).map(|m| m.is_file() && m.len() > 0).unwrap_or(false)
}

/// Inclusive year range, newest first. Missing bounds default to the current
/// year and the four years before it.
pub fn year_range(from_year: Option<i32>, to_year: Option<i32>) -> Vec<i32> {
    let current = chrono::Local::now().year();
    let to = to_year.unwrap_or(current);
    let from = from_year.unwrap_or(to - (DEFAULT_YEAR_SPAN - 1));
    (from.min(to)..=to.max(from)).rev().collect()
}

/// Months to attempt for the given years, newest year first and January
/// first within a year.
pub fn months_for_years(years: &[i32]) -> Vec<ReportMonth> {
    years.iter().flat_map(|y| ReportMonth::months_of(*y)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::StatusCode, routing::get, Router};

    async fn serve_fixture() -> String {
        let app = Router::new()
            .route("/amjan2025repo.xls", get(|| async { "workbook-bytes" }))
            .route("/amfeb2025repo.xls", get(|| async { "" }))
            .route(
                "/ammar2025repo.xls",
                get(|| async { (StatusCode::FORBIDDEN, "nope") }),
            );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn downloads_only_published_months() {
        let base = serve_fixture().await;
        let dir = tempfile::tempdir().unwrap();
        let client = AmfiClient::new(&base, Duration::from_secs(5)).unwrap();

        let jan = ReportMonth::new(1, 2025).unwrap();
        let (path, status) = client.download_month(&jan, dir.path()).await.unwrap();
        assert_eq!(status, DownloadStatus::Downloaded { bytes: 14 });
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "workbook-bytes");

        // Second attempt is served from disk.
        let (_, status) = client.download_month(&jan, dir.path()).await.unwrap();
        assert_eq!(status, DownloadStatus::AlreadyPresent);

        for month in [2, 3, 4] {
            let m = ReportMonth::new(month, 2025).unwrap();
            let (path, status) = client.download_month(&m, dir.path()).await.unwrap();
            assert_eq!(status, DownloadStatus::NotAvailable);
            assert!(!path.exists());
        }
    }

    #[test]
    fn connection_failure_is_an_error() {
        let client = AmfiClient::new("http://127.0.0.1:1", Duration::from_secs(2)).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let month = ReportMonth::new(1, 2025).unwrap();
        let result = tokio_test::block_on(client.download_month(&month, dir.path()));
        assert!(matches!(result, Err(FetchError::Network(_))));
    }

    #[test]
    fn explicit_year_range_is_newest_first() {
        assert_eq!(year_range(Some(2022), Some(2024)), vec![2024, 2023, 2022]);
        assert_eq!(year_range(None, Some(2025)), vec![2025, 2024, 2023, 2022, 2021]);
        assert_eq!(months_for_years(&[2025]).len(), 12);
    }

    #[test]
    fn url_joins_base_and_file_name() {
        let client = AmfiClient::new("https://example.test/spages/", Duration::from_secs(1)).unwrap();
        let month = ReportMonth::new(11, 2025).unwrap();
        assert_eq!(client.url_for(&month), "https://example.test/spages/amnov2025repo.xls");
    }
}
