//! HTTP handlers for sales endpoints

use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::sale::{ListSalesFilter, RecordSaleInput, SaleService};
use crate::AppState;
use shared::models::Sale;

/// Record a sale
pub async fn record_sale(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<RecordSaleInput>,
) -> AppResult<(StatusCode, Json<Sale>)> {
    let notifications = super::product::notification_service(&state);
    let service = SaleService::new(state.db);
    let sale = service
        .record_sale(Some(current_user.0.user_id), input, &notifications)
        .await?;
    Ok((StatusCode::CREATED, Json(sale)))
}

/// List sales with optional filters
pub async fn list_sales(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Query(filter): Query<ListSalesFilter>,
) -> AppResult<Json<Vec<Sale>>> {
    let service = SaleService::new(state.db);
    let sales = service.list_sales(&filter).await?;
    Ok(Json(sales))
}
