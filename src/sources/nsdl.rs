// src/sources/nsdl.rs
use crate::sheet::Sheet;
use crate::utils::error::FetchError;
use crate::workbook::html;
use reqwest::header;
use std::time::Duration;

pub const NSDL_REPORT_BASE: &str =
    "https://www.fpi.nsdl.co.in/web/StaticReports/Fortnightly_Sector_wise_FII_Investment_Data";
pub const NSDL_DEFAULT_REPORT: &str = "FIIInvestSector_Dec152025.html";

// The NSDL static pages reject clients that do not look like a browser.
const NSDL_USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
const NSDL_REFERER: &str = "https://www.fpi.nsdl.co.in/";

/// Name of the first (main) table in the written workbook.
pub const MAIN_TABLE_SHEET: &str = "Sector_Investment_Data";

/// URL of the fortnightly report for a date stamp such as `Dec152025`.
pub fn report_url(stamp: &str) -> String {
    format!("{}/FIIInvestSector_{}.html", NSDL_REPORT_BASE, stamp)
}

pub fn default_report_url() -> String {
    format!("{}/{}", NSDL_REPORT_BASE, NSDL_DEFAULT_REPORT)
}

fn build_nsdl_client(timeout: Duration) -> Result<reqwest::Client, reqwest::Error> {
    let mut headers = header::HeaderMap::new();
    headers.insert(
        header::ACCEPT,
        header::HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"),
    );
    headers.insert(header::ACCEPT_LANGUAGE, header::HeaderValue::from_static("en-US,en;q=0.5"));
    headers.insert(header::REFERER, header::HeaderValue::from_static(NSDL_REFERER));

    reqwest::Client::builder()
        .user_agent(NSDL_USER_AGENT)
        .default_headers(headers)
        .timeout(timeout)
        .build()
}

/// Downloads a report page and returns its raw HTML.
pub async fn fetch_report_html(url: &str, timeout: Duration) -> Result<String, FetchError> {
    let client = build_nsdl_client(timeout)?;
    tracing::info!("Connecting to NSDL: {}", url);

    let response = client.get(url).send().await?;
    let status = response.status();
    if !status.is_success() {
        tracing::error!("HTTP error status: {} for URL: {}", status, url);
        return Err(FetchError::Http(status));
    }

    let body = response.text().await?;
    if body.trim().is_empty() {
        return Err(FetchError::EmptyBody(url.to_string()));
    }
    tracing::info!("Downloaded {} bytes from {}", body.len(), url);
    Ok(body)
}

/// Parses the report tables and names them for the output workbook: the
/// first becomes [`MAIN_TABLE_SHEET`], the rest `Table_<n>` by position.
pub fn report_tables(html_body: &str) -> Vec<Sheet> {
    html::parse_tables(html_body)
        .into_iter()
        .enumerate()
        .map(|(idx, mut sheet)| {
            sheet.name = if idx == 0 {
                MAIN_TABLE_SHEET.to_string()
            } else {
                format!("Table_{}", idx + 1)
            };
            tracing::info!("Table {}: {} rows x {} columns", idx + 1, sheet.len(), sheet.width());
            sheet
        })
        .collect()
}
