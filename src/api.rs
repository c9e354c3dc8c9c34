// src/api.rs
// =================== HTTP (AXUM) HANDLERS ===================

use crate::analytics::{self, MonthComparison, MonthlySummary, YearPivot};
use crate::storage::FlowStore;
use crate::utils::error::StorageError;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::{Arc, Mutex};
use thiserror::Error;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<Mutex<FlowStore>>,
}

impl AppState {
    pub fn new(store: FlowStore) -> Self {
        Self { store: Arc::new(Mutex::new(store)) }
    }
}

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Storage(e) => {
                tracing::error!("Query failed: {}", e);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

#[derive(Debug, Deserialize)]
pub struct MonthQuery {
    month: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CompareQuery {
    from: Option<String>,
    to: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct YearQuery {
    year: Option<String>,
}

/// Treats absent and blank parameters the same.
fn required(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn with_store<T>(
    state: &AppState,
    f: impl FnOnce(&FlowStore) -> Result<T, StorageError>,
) -> Result<T, ApiError> {
    let store = state.store.lock().map_err(|_| StorageError::Poisoned)?;
    Ok(f(&store)?)
}

/// GET /api/amfi/monthly-summary/?month=Nov 2025
pub async fn http_monthly_summary(
    State(state): State<AppState>,
    Query(q): Query<MonthQuery>,
) -> Result<Json<MonthlySummary>, ApiError> {
    let month = required(q.month)
        .ok_or_else(|| ApiError::BadRequest("month query param is required".to_string()))?;
    let summary = with_store(&state, |store| analytics::monthly_summary(store, &month))?;
    Ok(Json(summary))
}

/// GET /api/amfi/compare/?from=Oct 2025&to=Nov 2025
pub async fn http_compare(
    State(state): State<AppState>,
    Query(q): Query<CompareQuery>,
) -> Result<Json<MonthComparison>, ApiError> {
    let (Some(from), Some(to)) = (required(q.from), required(q.to)) else {
        return Err(ApiError::BadRequest("from and to query params are required".to_string()));
    };
    let comparison = with_store(&state, |store| analytics::compare_months(store, &from, &to))?;
    Ok(Json(comparison))
}

/// GET /api/amfi/year-summary/?year=2025
pub async fn http_year_summary(
    State(state): State<AppState>,
    Query(q): Query<YearQuery>,
) -> Result<Json<YearPivot>, ApiError> {
    let year = required(q.year)
        .ok_or_else(|| ApiError::BadRequest("year query param is required".to_string()))?;
    let pivot = with_store(&state, |store| analytics::year_pivot(store, &year))?;
    Ok(Json(pivot))
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/amfi/monthly-summary/", get(http_monthly_summary))
        .route("/api/amfi/monthly-summary", get(http_monthly_summary))
        .route("/api/amfi/compare/", get(http_compare))
        .route("/api/amfi/compare", get(http_compare))
        .route("/api/amfi/year-summary/", get(http_year_summary))
        .route("/api/amfi/year-summary", get(http_year_summary))
        .with_state(state)
}

pub async fn serve(addr: &str, store: FlowStore) -> Result<(), std::io::Error> {
    let app = router(AppState::new(store));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("HTTP listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use serde_json::Value;
    use tower::ServiceExt;

    fn seeded() -> AppState {
        let store = FlowStore::open_in_memory().unwrap();
        store.upsert("Jan 2025", "Small Cap Fund", Some(100.0)).unwrap();
        store.upsert("Jan 2025", "Large Cap Fund", Some(200.0)).unwrap();
        store.upsert("Feb 2025", "Small Cap Fund", Some(150.0)).unwrap();
        store.upsert("Feb 2025", "Large Cap Fund", Some(180.0)).unwrap();
        AppState::new(store)
    }

    async fn get_json(uri: &str) -> (StatusCode, Value) {
        let response = router(seeded())
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn monthly_summary_endpoint() {
        let (status, body) = get_json("/api/amfi/monthly-summary/?month=Feb%202025").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"month": "Feb 2025", "small_cap": 150.0, "large_midcap": 180.0}));
    }

    #[tokio::test]
    async fn full_month_names_are_accepted() {
        let (status, body) = get_json("/api/amfi/monthly-summary/?month=February%202025").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["month"], "Feb 2025");
        assert_eq!(body["small_cap"], 150.0);

        let (_, body) = get_json("/api/amfi/compare/?from=January%202025&to=february%202025").await;
        assert_eq!(body["small_cap_change"], 50.0);
    }

    #[tokio::test]
    async fn compare_endpoint() {
        let (status, body) = get_json("/api/amfi/compare/?from=Jan%202025&to=Feb%202025").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["small_cap_change"], 50.0);
        assert_eq!(body["large_midcap_change"], -20.0);
    }

    #[tokio::test]
    async fn year_endpoint() {
        let (status, body) = get_json("/api/amfi/year-summary/?year=2025").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["months"], json!(["Feb 2025", "Jan 2025"]));
        assert_eq!(body["matrix"]["Jan 2025"]["Large Cap Fund"], 200.0);
    }

    #[tokio::test]
    async fn missing_params_are_bad_requests() {
        for uri in [
            "/api/amfi/monthly-summary/",
            "/api/amfi/monthly-summary/?month=",
            "/api/amfi/compare/?from=Jan%202025",
            "/api/amfi/year-summary",
        ] {
            let (status, body) = get_json(uri).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{}", uri);
            assert!(body["error"].as_str().unwrap().contains("required"));
        }
    }
}
