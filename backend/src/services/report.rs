//! Reporting service for inventory analytics and data export
//!
//! Assembles inventory, low-stock and stock-log rows, computes dashboard
//! metrics and serializes report data to CSV for download.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::AppResult;

/// Reporting service
#[derive(Clone)]
pub struct ReportService {
    db: PgPool,
}

/// Filters for the inventory report
#[derive(Debug, Default, Deserialize)]
pub struct InventoryReportFilter {
    pub category: Option<String>,
    pub supplier: Option<String>,
}

/// Filters for the stock-log report
#[derive(Debug, Default, Deserialize)]
pub struct StockLogReportFilter {
    pub from_date: Option<DateTime<Utc>>,
    pub to_date: Option<DateTime<Utc>>,
}

/// Inventory report row
#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct InventoryReportRow {
    pub id: Uuid,
    pub sku: Option<String>,
    pub name: String,
    pub category: Option<String>,
    pub quantity: i32,
    pub purchase_price: Decimal,
    pub selling_price: Option<Decimal>,
    pub total_value: Decimal,
    pub supplier: Option<String>,
    pub low_stock_threshold: i32,
}

/// Stock-log report row
#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct StockLogReportRow {
    pub id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub username: Option<String>,
    pub change_amount: i32,
    pub resulting_quantity: i32,
    pub reason: Option<String>,
    pub reference: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Dashboard metrics
#[derive(Debug, Serialize)]
pub struct SummaryMetrics {
    pub total_products: i64,
    pub total_stock_value: Decimal,
    pub low_stock_count: i64,
    pub stock_movements_last_7_days: i64,
    pub sales_last_30_days: i64,
    pub sales_total_last_30_days: Decimal,
}

impl ReportService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Inventory rows, optionally filtered by category/supplier
    pub async fn inventory_rows(
        &self,
        filter: &InventoryReportFilter,
    ) -> AppResult<Vec<InventoryReportRow>> {
        let rows = sqlx::query_as::<_, InventoryReportRow>(
            r#"
            SELECT id, sku, name, category, quantity, purchase_price, selling_price,
                   purchase_price * quantity AS total_value,
                   supplier, low_stock_threshold
            FROM products
            WHERE ($1::text IS NULL OR LOWER(COALESCE(category, '')) = LOWER($1))
              AND ($2::text IS NULL OR LOWER(COALESCE(supplier, '')) = LOWER($2))
            ORDER BY name ASC
            "#,
        )
        .bind(&filter.category)
        .bind(&filter.supplier)
        .fetch_all(&self.db)
        .await?;

        Ok(rows)
    }

    /// Rows for products at or below their low-stock threshold
    pub async fn low_stock_rows(&self) -> AppResult<Vec<InventoryReportRow>> {
        let rows = sqlx::query_as::<_, InventoryReportRow>(
            r#"
            SELECT id, sku, name, category, quantity, purchase_price, selling_price,
                   purchase_price * quantity AS total_value,
                   supplier, low_stock_threshold
            FROM products
            WHERE quantity <= low_stock_threshold
            ORDER BY quantity ASC
            "#,
        )
        .fetch_all(&self.db)
        .await?;

        Ok(rows)
    }

    /// Stock-log rows within an optional date range
    pub async fn stock_log_rows(
        &self,
        filter: &StockLogReportFilter,
    ) -> AppResult<Vec<StockLogReportRow>> {
        let rows = sqlx::query_as::<_, StockLogReportRow>(
            r#"
            SELECT sl.id, sl.product_id, p.name AS product_name, u.username,
                   sl.change_amount, sl.resulting_quantity, sl.reason, sl.reference,
                   sl.created_at
            FROM stock_logs sl
            JOIN products p ON p.id = sl.product_id
            LEFT JOIN users u ON u.id = sl.user_id
            WHERE ($1::timestamptz IS NULL OR sl.created_at >= $1)
              AND ($2::timestamptz IS NULL OR sl.created_at <= $2)
            ORDER BY sl.created_at DESC
            "#,
        )
        .bind(filter.from_date)
        .bind(filter.to_date)
        .fetch_all(&self.db)
        .await?;

        Ok(rows)
    }

    /// Dashboard metrics across products, stock movements and sales
    pub async fn summary_metrics(&self) -> AppResult<SummaryMetrics> {
        let (total_products, total_stock_value, low_stock_count): (i64, Option<Decimal>, i64) =
            sqlx::query_as(
                r#"
                SELECT COUNT(*),
                       SUM(purchase_price * quantity),
                       COUNT(*) FILTER (WHERE quantity <= low_stock_threshold)
                FROM products
                "#,
            )
            .fetch_one(&self.db)
            .await?;

        let stock_movements: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM stock_logs WHERE created_at >= NOW() - INTERVAL '7 days'",
        )
        .fetch_one(&self.db)
        .await?;

        let (sales_count, sales_total): (i64, Option<Decimal>) = sqlx::query_as(
            r#"
            SELECT COUNT(*), SUM(total_price)
            FROM sales
            WHERE created_at >= NOW() - INTERVAL '30 days'
            "#,
        )
        .fetch_one(&self.db)
        .await?;

        Ok(SummaryMetrics {
            total_products,
            total_stock_value: total_stock_value.unwrap_or(Decimal::ZERO),
            low_stock_count,
            stock_movements_last_7_days: stock_movements,
            sales_last_30_days: sales_count,
            sales_total_last_30_days: sales_total.unwrap_or(Decimal::ZERO),
        })
    }

    /// Export report data as CSV
    pub fn export_to_csv<T: Serialize>(data: &[T]) -> AppResult<String> {
        let mut wtr = csv::Writer::from_writer(vec![]);
        for record in data {
            wtr.serialize(record).map_err(|e| {
                crate::error::AppError::Internal(format!("CSV serialization error: {}", e))
            })?;
        }
        let csv_data = String::from_utf8(wtr.into_inner().map_err(|e| {
            crate::error::AppError::Internal(format!("CSV writer error: {}", e))
        })?)
        .map_err(|e| crate::error::AppError::Internal(format!("UTF-8 conversion error: {}", e)))?;
        Ok(csv_data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_csv_export_includes_header_and_rows() {
        let rows = vec![InventoryReportRow {
            id: Uuid::new_v4(),
            sku: Some("SKU-1".to_string()),
            name: "Beans".to_string(),
            category: Some("food".to_string()),
            quantity: 3,
            purchase_price: Decimal::from_str("2.50").unwrap(),
            selling_price: None,
            total_value: Decimal::from_str("7.50").unwrap(),
            supplier: None,
            low_stock_threshold: 5,
        }];

        let csv = ReportService::export_to_csv(&rows).unwrap();
        let mut lines = csv.lines();
        assert!(lines.next().unwrap().starts_with("id,sku,name"));
        assert!(csv.contains("Beans"));
        assert!(csv.contains("7.50"));
    }

    #[test]
    fn test_csv_export_empty_data() {
        let rows: Vec<InventoryReportRow> = vec![];
        let csv = ReportService::export_to_csv(&rows).unwrap();
        assert!(csv.is_empty());
    }
}
