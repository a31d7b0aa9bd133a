//! Sales recording service
//!
//! A sale decrements product stock through the same logged path as a manual
//! adjustment, so every unit that leaves the shelf is accounted for.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::services::notification::NotificationService;
use shared::models::{Product, Sale};

/// Sales service
#[derive(Clone)]
pub struct SaleService {
    db: PgPool,
}

/// Input for recording a sale
#[derive(Debug, Deserialize)]
pub struct RecordSaleInput {
    pub product_id: Uuid,
    pub quantity: i32,
    /// Defaults to the product's selling price when omitted
    pub unit_price: Option<Decimal>,
}

/// Filters for listing sales
#[derive(Debug, Default, Deserialize)]
pub struct ListSalesFilter {
    pub product_id: Option<Uuid>,
    pub from_date: Option<DateTime<Utc>>,
    pub to_date: Option<DateTime<Utc>>,
    pub limit: Option<i64>,
}

impl SaleService {
    /// Create a new SaleService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Record a sale, decrementing stock and logging the movement
    ///
    /// Rejects sales exceeding the quantity on hand. The product update,
    /// stock log and sale row commit together; the locking read keeps two
    /// concurrent sales from overselling the same units.
    pub async fn record_sale(
        &self,
        user_id: Option<Uuid>,
        input: RecordSaleInput,
        notifications: &NotificationService,
    ) -> AppResult<Sale> {
        if input.quantity <= 0 {
            return Err(AppError::Validation {
                field: "quantity".to_string(),
                message: "Quantity must be positive".to_string(),
            });
        }

        let mut tx = self.db.begin().await?;

        let product = sqlx::query_as::<_, Product>(
            r#"
            SELECT id, sku, name, category, description, purchase_price, selling_price,
                   quantity, supplier, barcode, low_stock_threshold, reorder_qty, image_url,
                   last_price_updated_by, created_at, updated_at
            FROM products
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(input.product_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Product".to_string()))?;

        if product.quantity < input.quantity {
            return Err(AppError::InsufficientStock(format!(
                "Only {} of '{}' in stock",
                product.quantity, product.name
            )));
        }

        let unit_price = match input.unit_price.or(product.selling_price) {
            Some(price) if price >= Decimal::ZERO => price,
            Some(_) => {
                return Err(AppError::Validation {
                    field: "unit_price".to_string(),
                    message: "Unit price cannot be negative".to_string(),
                })
            }
            None => {
                return Err(AppError::Validation {
                    field: "unit_price".to_string(),
                    message: "Product has no selling price; unit_price is required".to_string(),
                })
            }
        };
        let total_price = unit_price * Decimal::from(input.quantity);

        let resulting_quantity = product.quantity - input.quantity;

        sqlx::query("UPDATE products SET quantity = $1, updated_at = NOW() WHERE id = $2")
            .bind(resulting_quantity)
            .bind(product.id)
            .execute(&mut *tx)
            .await?;

        let sale = sqlx::query_as::<_, Sale>(
            r#"
            INSERT INTO sales (product_id, user_id, quantity, unit_price, total_price)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, product_id, user_id, quantity, unit_price, total_price, created_at
            "#,
        )
        .bind(product.id)
        .bind(user_id)
        .bind(input.quantity)
        .bind(unit_price)
        .bind(total_price)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO stock_logs (product_id, user_id, change_amount, reason, reference, resulting_quantity)
            VALUES ($1, $2, $3, 'sale', $4, $5)
            "#,
        )
        .bind(product.id)
        .bind(user_id)
        .bind(-input.quantity)
        .bind(sale.id.to_string())
        .bind(resulting_quantity)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        if resulting_quantity <= product.low_stock_threshold {
            let mut sold_out = product.clone();
            sold_out.quantity = resulting_quantity;
            if let Err(e) = notifications
                .notify_low_stock(&sold_out, Some(&sale.id.to_string()))
                .await
            {
                tracing::error!("Low-stock notification failed: {}", e);
            }
        }

        Ok(sale)
    }

    /// List sales with optional filters
    pub async fn list_sales(&self, filter: &ListSalesFilter) -> AppResult<Vec<Sale>> {
        let sales = sqlx::query_as::<_, Sale>(
            r#"
            SELECT id, product_id, user_id, quantity, unit_price, total_price, created_at
            FROM sales
            WHERE ($1::uuid IS NULL OR product_id = $1)
              AND ($2::timestamptz IS NULL OR created_at >= $2)
              AND ($3::timestamptz IS NULL OR created_at <= $3)
            ORDER BY created_at DESC
            LIMIT $4
            "#,
        )
        .bind(filter.product_id)
        .bind(filter.from_date)
        .bind(filter.to_date)
        .bind(filter.limit.unwrap_or(200))
        .fetch_all(&self.db)
        .await?;

        Ok(sales)
    }
}
