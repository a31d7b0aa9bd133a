//! Route definitions for the Inventory Management Platform

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use crate::{handlers, middleware::auth_middleware, AppState};

/// Create API routes
pub fn api_routes() -> Router<AppState> {
    Router::new()
        // Health check (public)
        .route("/health", get(handlers::health_check))
        // Auth routes (public + maintenance)
        .nest("/auth", auth_routes())
        // Protected routes - user administration
        .nest("/users", user_routes())
        // Protected routes - products and stock
        .nest("/products", product_routes())
        .nest("/stock-logs", stock_log_routes())
        .nest("/sales", sale_routes())
        // Protected routes - notifications
        .nest("/notifications", notification_routes())
        // Protected routes - reports
        .nest("/reports", report_routes())
        // Protected routes - AI reports
        .nest("/ai", ai_routes())
}

/// Authentication routes (public, plus protected maintenance)
fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/request_code", post(handlers::request_code))
        .route("/verify_code", post(handlers::verify_code))
        .route("/google", post(handlers::google_auth))
        .route("/login", post(handlers::login))
        .route("/refresh", post(handlers::refresh))
        // Maintenance (protected)
        .nest("/codes", auth_maintenance_routes())
}

/// Login-code maintenance routes (protected)
fn auth_maintenance_routes() -> Router<AppState> {
    Router::new()
        .route("/cleanup", post(handlers::cleanup_codes))
        .route_layer(middleware::from_fn(auth_middleware))
}

/// User administration routes (protected)
fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_users).post(handlers::create_user))
        .route("/me", get(handlers::me))
        .route("/bulk_import", post(handlers::bulk_import_users))
        .route(
            "/:user_id",
            get(handlers::get_user)
                .put(handlers::update_user)
                .delete(handlers::delete_user),
        )
        .route("/:user_id/set_password", post(handlers::set_password))
        .route_layer(middleware::from_fn(auth_middleware))
}

/// Product management routes (protected)
fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_products).post(handlers::create_product))
        .route("/bulk_import", post(handlers::bulk_import_products))
        .route(
            "/:product_id",
            get(handlers::get_product)
                .put(handlers::update_product)
                .delete(handlers::delete_product),
        )
        .route("/:product_id/adjust_stock", post(handlers::adjust_stock))
        .route_layer(middleware::from_fn(auth_middleware))
}

/// Stock log routes (protected, read-only)
fn stock_log_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_stock_logs))
        .route_layer(middleware::from_fn(auth_middleware))
}

/// Sales routes (protected)
fn sale_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_sales).post(handlers::record_sale))
        .route_layer(middleware::from_fn(auth_middleware))
}

/// Notification routes (protected)
fn notification_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_notifications).post(handlers::create_notification),
        )
        .route("/unread-count", get(handlers::get_unread_count))
        .route("/mark-all-read", post(handlers::mark_all_as_read))
        .route("/:notification_id/read", post(handlers::mark_as_read))
        .route(
            "/:notification_id",
            axum::routing::delete(handlers::delete_notification),
        )
        .route_layer(middleware::from_fn(auth_middleware))
}

/// Report routes (protected)
fn report_routes() -> Router<AppState> {
    Router::new()
        .route("/inventory.csv", get(handlers::inventory_report_csv))
        .route("/low_stock.csv", get(handlers::low_stock_report_csv))
        .route("/stock_logs.csv", get(handlers::stock_logs_report_csv))
        .route("/summary", get(handlers::report_summary))
        .route_layer(middleware::from_fn(auth_middleware))
}

/// AI report routes (protected)
fn ai_routes() -> Router<AppState> {
    Router::new()
        .route("/reports", get(handlers::list_ai_reports))
        .route("/reports/stock", post(handlers::generate_stock_report))
        .route("/reports/sales", post(handlers::generate_sales_report))
        .route("/reports/anomaly", post(handlers::generate_anomaly_report))
        .route("/reports/daily", post(handlers::trigger_daily_report))
        .route("/reports/:report_id", get(handlers::get_ai_report))
        .route_layer(middleware::from_fn(auth_middleware))
}
