//! HTTP handlers for AI report endpoints

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppResult;
use crate::external::{EmailSender, OllamaClient};
use crate::middleware::{require_admin, CurrentUser};
use crate::services::AiReportService;
use crate::AppState;
use shared::models::AiReport;

fn ai_service(state: &AppState) -> AiReportService {
    let ollama = OllamaClient::from_config(&state.config.ollama);
    AiReportService::new(state.db.clone(), ollama)
}

/// Generate a stock analysis report
pub async fn generate_stock_report(
    State(state): State<AppState>,
    _current_user: CurrentUser,
) -> AppResult<Json<AiReport>> {
    let service = ai_service(&state);
    let report = service.generate_stock_report(Utc::now()).await?;
    Ok(Json(report))
}

/// Query parameters for the sales report
#[derive(Debug, Deserialize)]
pub struct SalesReportQuery {
    pub days: Option<i64>,
}

/// Generate a sales report over the last N days (default 30)
pub async fn generate_sales_report(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Query(query): Query<SalesReportQuery>,
) -> AppResult<Json<AiReport>> {
    let service = ai_service(&state);
    let report = service
        .generate_sales_report(query.days.unwrap_or(30), Utc::now())
        .await?;
    Ok(Json(report))
}

/// Run the anomaly scan and store the findings
pub async fn generate_anomaly_report(
    State(state): State<AppState>,
    _current_user: CurrentUser,
) -> AppResult<Json<AiReport>> {
    let service = ai_service(&state);
    let report = service.generate_anomaly_report().await?;
    Ok(Json(report))
}

/// Query parameters for listing reports
#[derive(Debug, Deserialize)]
pub struct ListReportsQuery {
    pub limit: Option<i64>,
}

/// List stored AI reports
pub async fn list_ai_reports(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Query(query): Query<ListReportsQuery>,
) -> AppResult<Json<Vec<AiReport>>> {
    let service = ai_service(&state);
    let reports = service.list_reports(query.limit.unwrap_or(50)).await?;
    Ok(Json(reports))
}

/// Get a stored AI report by id
pub async fn get_ai_report(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(report_id): Path<Uuid>,
) -> AppResult<Json<AiReport>> {
    let service = ai_service(&state);
    let report = service.get_report(report_id).await?;
    Ok(Json(report))
}

/// Generate the daily sales report and email it to admins (admin trigger)
pub async fn trigger_daily_report(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<AiReport>> {
    require_admin(&current_user.0)?;

    let sender = EmailSender::new(&state.config.smtp, state.config.shop.name.clone())?;
    let service = ai_service(&state);
    let report = service.daily_sales_report(&sender, Utc::now()).await?;
    Ok(Json(report))
}
