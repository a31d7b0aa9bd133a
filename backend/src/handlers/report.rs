//! HTTP handlers for report endpoints
//!
//! CSV reports are returned as file downloads; the summary endpoint returns
//! dashboard metrics as JSON.

use axum::{
    extract::{Query, State},
    http::{header, HeaderMap, HeaderValue},
    response::IntoResponse,
    Json,
};
use chrono::Utc;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::report::{
    InventoryReportFilter, ReportService, StockLogReportFilter, SummaryMetrics,
};
use crate::AppState;

/// Build download headers for a CSV attachment
fn csv_headers(filename: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/csv; charset=utf-8"),
    );
    if let Ok(value) = HeaderValue::from_str(&format!("attachment; filename=\"{}\"", filename)) {
        headers.insert(header::CONTENT_DISPOSITION, value);
    }
    headers
}

/// Download the inventory report as CSV
pub async fn inventory_report_csv(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Query(filter): Query<InventoryReportFilter>,
) -> AppResult<impl IntoResponse> {
    let service = ReportService::new(state.db);
    let rows = service.inventory_rows(&filter).await?;
    let csv = ReportService::export_to_csv(&rows)?;

    let filename = format!("inventory_summary_{}.csv", Utc::now().date_naive());
    Ok((csv_headers(&filename), csv))
}

/// Download the low-stock report as CSV
pub async fn low_stock_report_csv(
    State(state): State<AppState>,
    _current_user: CurrentUser,
) -> AppResult<impl IntoResponse> {
    let service = ReportService::new(state.db);
    let rows = service.low_stock_rows().await?;
    let csv = ReportService::export_to_csv(&rows)?;

    let filename = format!("low_stock_report_{}.csv", Utc::now().date_naive());
    Ok((csv_headers(&filename), csv))
}

/// Download the stock-log report as CSV
pub async fn stock_logs_report_csv(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Query(filter): Query<StockLogReportFilter>,
) -> AppResult<impl IntoResponse> {
    let service = ReportService::new(state.db);
    let rows = service.stock_log_rows(&filter).await?;
    let csv = ReportService::export_to_csv(&rows)?;

    let filename = format!("stock_logs_{}.csv", Utc::now().date_naive());
    Ok((csv_headers(&filename), csv))
}

/// Dashboard summary metrics
pub async fn report_summary(
    State(state): State<AppState>,
    _current_user: CurrentUser,
) -> AppResult<Json<SummaryMetrics>> {
    let service = ReportService::new(state.db);
    let metrics = service.summary_metrics().await?;
    Ok(Json(metrics))
}
