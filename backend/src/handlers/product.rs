//! HTTP handlers for product and stock management endpoints

use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use uuid::Uuid;

use crate::error::AppResult;
use crate::external::EmailSender;
use crate::middleware::CurrentUser;
use crate::services::product::{
    AdjustStockInput, BulkImportResult, CreateProductInput, ListProductsFilter, ProductService,
    StockLogFilter, UpdateProductInput,
};
use crate::services::NotificationService;
use crate::AppState;
use shared::models::{Product, StockLog};
use shared::types::PaginatedResponse;

/// List products with optional filters, paginated
pub async fn list_products(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Query(filter): Query<ListProductsFilter>,
) -> AppResult<Json<PaginatedResponse<Product>>> {
    let service = ProductService::new(state.db);
    let products = service.list_products(&filter).await?;
    Ok(Json(products))
}

/// Get a product by id
pub async fn get_product(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(product_id): Path<Uuid>,
) -> AppResult<Json<Product>> {
    let service = ProductService::new(state.db);
    let product = service.get_product(product_id).await?;
    Ok(Json(product))
}

/// Create a product
pub async fn create_product(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Json(input): Json<CreateProductInput>,
) -> AppResult<(StatusCode, Json<Product>)> {
    let service = ProductService::new(state.db);
    let product = service.create_product(input).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

/// Update a product
pub async fn update_product(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(product_id): Path<Uuid>,
    Json(input): Json<UpdateProductInput>,
) -> AppResult<Json<Product>> {
    let service = ProductService::new(state.db);
    let product = service
        .update_product(product_id, current_user.0.user_id, input)
        .await?;
    Ok(Json(product))
}

/// Delete a product
pub async fn delete_product(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(product_id): Path<Uuid>,
) -> AppResult<Json<()>> {
    let service = ProductService::new(state.db);
    service.delete_product(product_id).await?;
    Ok(Json(()))
}

/// Response for a stock adjustment: the product and its log entry
#[derive(Debug, Serialize)]
pub struct AdjustStockResponse {
    pub product: Product,
    pub log: StockLog,
}

/// Apply a signed stock adjustment to a product
pub async fn adjust_stock(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(product_id): Path<Uuid>,
    Json(input): Json<AdjustStockInput>,
) -> AppResult<Json<AdjustStockResponse>> {
    let notifications = notification_service(&state);
    let service = ProductService::new(state.db);
    let (product, log) = service
        .adjust_stock(product_id, Some(current_user.0.user_id), input, &notifications)
        .await?;
    Ok(Json(AdjustStockResponse { product, log }))
}

/// Bulk-import products from an uploaded CSV file (field name 'file')
pub async fn bulk_import_products(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    mut multipart: Multipart,
) -> AppResult<Json<BulkImportResult>> {
    let csv_bytes = super::user::read_file_field(&mut multipart).await?;

    let service = ProductService::new(state.db);
    let result = service.bulk_import(&csv_bytes).await?;
    Ok(Json(result))
}

/// List stock logs with optional filters
pub async fn list_stock_logs(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Query(filter): Query<StockLogFilter>,
) -> AppResult<Json<Vec<StockLog>>> {
    let service = ProductService::new(state.db);
    let logs = service.list_stock_logs(&filter).await?;
    Ok(Json(logs))
}

/// Build the notification service, with email fan-out when SMTP is usable
pub(crate) fn notification_service(state: &AppState) -> NotificationService {
    match EmailSender::new(&state.config.smtp, state.config.shop.name.clone()) {
        Ok(sender) => NotificationService::with_email_sender(state.db.clone(), sender),
        Err(e) => {
            tracing::warn!("Email sender unavailable, notifications stay in-app: {}", e);
            NotificationService::new(state.db.clone())
        }
    }
}
