//! Product and stock management service
//!
//! Product CRUD, transactional stock adjustments with an append-only log,
//! low-stock detection and CSV bulk import.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::services::notification::NotificationService;
use shared::models::{Product, StockLog};
use shared::types::{PaginatedResponse, Pagination, PaginationMeta};
use shared::validation::{validate_price, validate_sku};

const PRODUCT_COLUMNS: &str = "id, sku, name, category, description, purchase_price, \
                               selling_price, quantity, supplier, barcode, low_stock_threshold, \
                               reorder_qty, image_url, last_price_updated_by, created_at, updated_at";

/// Product service
#[derive(Clone)]
pub struct ProductService {
    db: PgPool,
}

/// Filters for listing products
#[derive(Debug, Default, Deserialize)]
pub struct ListProductsFilter {
    pub category: Option<String>,
    pub supplier: Option<String>,
    /// Matches name, SKU, barcode and category
    pub search: Option<String>,
    pub low_stock_only: Option<bool>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

impl ListProductsFilter {
    fn pagination(&self) -> Pagination {
        Pagination {
            page: self.page.unwrap_or(1).max(1),
            per_page: self.per_page.unwrap_or(20).clamp(1, 100),
        }
    }
}

/// Input for creating a product
#[derive(Debug, Deserialize)]
pub struct CreateProductInput {
    pub sku: Option<String>,
    pub name: String,
    pub category: Option<String>,
    pub description: Option<String>,
    pub purchase_price: Decimal,
    pub selling_price: Option<Decimal>,
    #[serde(default)]
    pub quantity: i32,
    pub supplier: Option<String>,
    pub barcode: Option<String>,
    pub low_stock_threshold: Option<i32>,
    pub reorder_qty: Option<i32>,
    pub image_url: Option<String>,
}

/// Input for updating a product
#[derive(Debug, Deserialize)]
pub struct UpdateProductInput {
    pub sku: Option<String>,
    pub name: Option<String>,
    pub category: Option<String>,
    pub description: Option<String>,
    pub purchase_price: Option<Decimal>,
    pub selling_price: Option<Decimal>,
    pub supplier: Option<String>,
    pub barcode: Option<String>,
    pub low_stock_threshold: Option<i32>,
    pub reorder_qty: Option<i32>,
    pub image_url: Option<String>,
}

/// Input for a stock adjustment
#[derive(Debug, Deserialize)]
pub struct AdjustStockInput {
    /// Positive for additions, negative for removals
    pub change_amount: i32,
    pub reason: Option<String>,
    pub reference: Option<String>,
}

/// Filters for listing stock logs
#[derive(Debug, Default, Deserialize)]
pub struct StockLogFilter {
    pub product_id: Option<Uuid>,
    pub from_date: Option<DateTime<Utc>>,
    pub to_date: Option<DateTime<Utc>>,
    pub limit: Option<i64>,
}

/// Result of a CSV bulk import
#[derive(Debug, serde::Serialize)]
pub struct BulkImportResult {
    pub created_count: usize,
    pub created: Vec<Product>,
    pub failed: Vec<BulkImportError>,
}

/// A single failed bulk-import row
#[derive(Debug, serde::Serialize)]
pub struct BulkImportError {
    pub row: usize,
    pub error: String,
}

/// Expected CSV columns for bulk import
#[derive(Debug, Deserialize)]
struct ProductImportRow {
    name: String,
    #[serde(default)]
    sku: Option<String>,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    purchase_price: Option<Decimal>,
    #[serde(default)]
    selling_price: Option<Decimal>,
    #[serde(default)]
    quantity: Option<i32>,
    #[serde(default)]
    supplier: Option<String>,
}

impl ProductService {
    /// Create a new ProductService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// List products with optional filters, paginated
    pub async fn list_products(
        &self,
        filter: &ListProductsFilter,
    ) -> AppResult<PaginatedResponse<Product>> {
        let search = filter
            .search
            .as_ref()
            .map(|s| format!("%{}%", s.to_ascii_lowercase()));
        let pagination = filter.pagination();

        const FILTER_CLAUSE: &str = r#"
            WHERE ($1::text IS NULL OR LOWER(COALESCE(category, '')) = LOWER($1))
              AND ($2::text IS NULL OR LOWER(COALESCE(supplier, '')) = LOWER($2))
              AND ($3::text IS NULL
                   OR LOWER(name) LIKE $3
                   OR LOWER(COALESCE(sku, '')) LIKE $3
                   OR LOWER(COALESCE(barcode, '')) LIKE $3
                   OR LOWER(COALESCE(category, '')) LIKE $3)
              AND ($4::boolean IS NULL OR $4 = false OR quantity <= low_stock_threshold)
        "#;

        let count_query = format!("SELECT COUNT(*) FROM products {}", FILTER_CLAUSE);
        let total_items = sqlx::query_scalar::<_, i64>(&count_query)
            .bind(&filter.category)
            .bind(&filter.supplier)
            .bind(&search)
            .bind(filter.low_stock_only)
            .fetch_one(&self.db)
            .await? as u64;

        let query = format!(
            "SELECT {} FROM products {} ORDER BY updated_at DESC LIMIT $5 OFFSET $6",
            PRODUCT_COLUMNS, FILTER_CLAUSE
        );
        let products = sqlx::query_as::<_, Product>(&query)
            .bind(&filter.category)
            .bind(&filter.supplier)
            .bind(&search)
            .bind(filter.low_stock_only)
            .bind(pagination.limit())
            .bind(pagination.offset())
            .fetch_all(&self.db)
            .await?;

        let total_pages = total_items.div_ceil(pagination.per_page as u64) as u32;

        Ok(PaginatedResponse {
            data: products,
            pagination: PaginationMeta {
                page: pagination.page,
                per_page: pagination.per_page,
                total_items,
                total_pages,
            },
        })
    }

    /// Get a product by id
    pub async fn get_product(&self, product_id: Uuid) -> AppResult<Product> {
        let query = format!("SELECT {} FROM products WHERE id = $1", PRODUCT_COLUMNS);
        let product = sqlx::query_as::<_, Product>(&query)
            .bind(product_id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound("Product".to_string()))?;

        Ok(product)
    }

    /// Create a product
    pub async fn create_product(&self, input: CreateProductInput) -> AppResult<Product> {
        if input.name.trim().is_empty() {
            return Err(AppError::Validation {
                field: "name".to_string(),
                message: "Name is required".to_string(),
            });
        }

        validate_price(input.purchase_price).map_err(|msg| AppError::Validation {
            field: "purchase_price".to_string(),
            message: msg.to_string(),
        })?;
        if let Some(selling_price) = input.selling_price {
            validate_price(selling_price).map_err(|msg| AppError::Validation {
                field: "selling_price".to_string(),
                message: msg.to_string(),
            })?;
        }

        if let Some(sku) = input.sku.as_deref() {
            validate_sku(sku).map_err(|msg| AppError::Validation {
                field: "sku".to_string(),
                message: msg.to_string(),
            })?;

            let existing = sqlx::query_scalar::<_, i64>(
                "SELECT COUNT(*) FROM products WHERE sku = $1",
            )
            .bind(sku)
            .fetch_one(&self.db)
            .await?;

            if existing > 0 {
                return Err(AppError::DuplicateEntry("sku".to_string()));
            }
        }

        let query = format!(
            r#"
            INSERT INTO products (
                sku, name, category, description, purchase_price, selling_price,
                quantity, supplier, barcode, low_stock_threshold, reorder_qty, image_url
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING {}
            "#,
            PRODUCT_COLUMNS
        );

        let product = sqlx::query_as::<_, Product>(&query)
            .bind(&input.sku)
            .bind(input.name.trim())
            .bind(&input.category)
            .bind(&input.description)
            .bind(input.purchase_price)
            .bind(input.selling_price)
            .bind(input.quantity)
            .bind(&input.supplier)
            .bind(&input.barcode)
            .bind(input.low_stock_threshold.unwrap_or(5))
            .bind(input.reorder_qty.unwrap_or(10))
            .bind(&input.image_url)
            .fetch_one(&self.db)
            .await?;

        Ok(product)
    }

    /// Update a product
    ///
    /// A change to `selling_price` stamps `last_price_updated_by` with the
    /// acting user.
    pub async fn update_product(
        &self,
        product_id: Uuid,
        user_id: Uuid,
        input: UpdateProductInput,
    ) -> AppResult<Product> {
        let existing = self.get_product(product_id).await?;

        if let Some(price) = input.purchase_price {
            validate_price(price).map_err(|msg| AppError::Validation {
                field: "purchase_price".to_string(),
                message: msg.to_string(),
            })?;
        }
        if let Some(price) = input.selling_price {
            validate_price(price).map_err(|msg| AppError::Validation {
                field: "selling_price".to_string(),
                message: msg.to_string(),
            })?;
        }

        let price_changed = match input.selling_price {
            Some(new_price) => existing.selling_price != Some(new_price),
            None => false,
        };
        let price_updated_by = if price_changed { Some(user_id) } else { None };

        let query = format!(
            r#"
            UPDATE products SET
                sku = COALESCE($2, sku),
                name = COALESCE($3, name),
                category = COALESCE($4, category),
                description = COALESCE($5, description),
                purchase_price = COALESCE($6, purchase_price),
                selling_price = COALESCE($7, selling_price),
                supplier = COALESCE($8, supplier),
                barcode = COALESCE($9, barcode),
                low_stock_threshold = COALESCE($10, low_stock_threshold),
                reorder_qty = COALESCE($11, reorder_qty),
                image_url = COALESCE($12, image_url),
                last_price_updated_by = COALESCE($13, last_price_updated_by),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            PRODUCT_COLUMNS
        );

        let product = sqlx::query_as::<_, Product>(&query)
            .bind(product_id)
            .bind(&input.sku)
            .bind(&input.name)
            .bind(&input.category)
            .bind(&input.description)
            .bind(input.purchase_price)
            .bind(input.selling_price)
            .bind(&input.supplier)
            .bind(&input.barcode)
            .bind(input.low_stock_threshold)
            .bind(input.reorder_qty)
            .bind(&input.image_url)
            .bind(price_updated_by)
            .fetch_one(&self.db)
            .await?;

        Ok(product)
    }

    /// Delete a product
    pub async fn delete_product(&self, product_id: Uuid) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(product_id)
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Product".to_string()));
        }

        Ok(())
    }

    /// Apply a signed stock adjustment
    ///
    /// The quantity change and the log entry commit together; afterwards a
    /// low-stock check fans out notifications when the threshold is reached.
    pub async fn adjust_stock(
        &self,
        product_id: Uuid,
        user_id: Option<Uuid>,
        input: AdjustStockInput,
        notifications: &NotificationService,
    ) -> AppResult<(Product, StockLog)> {
        let mut tx = self.db.begin().await?;

        let update = format!(
            "UPDATE products SET quantity = quantity + $1, updated_at = NOW() \
             WHERE id = $2 RETURNING {}",
            PRODUCT_COLUMNS
        );
        let product = sqlx::query_as::<_, Product>(&update)
            .bind(input.change_amount)
            .bind(product_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::NotFound("Product".to_string()))?;

        let log = sqlx::query_as::<_, StockLog>(
            r#"
            INSERT INTO stock_logs (product_id, user_id, change_amount, reason, reference, resulting_quantity)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, product_id, user_id, change_amount, reason, reference,
                      resulting_quantity, created_at
            "#,
        )
        .bind(product_id)
        .bind(user_id)
        .bind(input.change_amount)
        .bind(&input.reason)
        .bind(&input.reference)
        .bind(product.quantity)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        if product.is_low_stock() {
            if let Err(e) = notifications
                .notify_low_stock(&product, input.reference.as_deref())
                .await
            {
                // The adjustment already committed; a failed alert must not
                // undo it
                tracing::error!("Low-stock notification failed: {}", e);
            }
        }

        Ok((product, log))
    }

    /// List stock logs with optional filters
    pub async fn list_stock_logs(&self, filter: &StockLogFilter) -> AppResult<Vec<StockLog>> {
        let logs = sqlx::query_as::<_, StockLog>(
            r#"
            SELECT id, product_id, user_id, change_amount, reason, reference,
                   resulting_quantity, created_at
            FROM stock_logs
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

        Ok(logs)
    }

    /// Products at or below their low-stock threshold, lowest quantity first
    pub async fn low_stock_products(&self) -> AppResult<Vec<Product>> {
        let query = format!(
            "SELECT {} FROM products WHERE quantity <= low_stock_threshold ORDER BY quantity ASC",
            PRODUCT_COLUMNS
        );
        let products = sqlx::query_as::<_, Product>(&query)
            .fetch_all(&self.db)
            .await?;

        Ok(products)
    }

    /// Bulk-import products from CSV bytes
    ///
    /// Expected columns: name, sku, category, purchase_price, selling_price,
    /// quantity, supplier. Rows fail independently.
    pub async fn bulk_import(&self, csv_bytes: &[u8]) -> AppResult<BulkImportResult> {
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(csv_bytes);

        let mut created = Vec::new();
        let mut failed = Vec::new();

        for (idx, row) in reader.deserialize::<ProductImportRow>().enumerate() {
            let row_number = idx + 1;
            let row = match row {
                Ok(row) => row,
                Err(e) => {
                    failed.push(BulkImportError {
                        row: row_number,
                        error: format!("Could not parse row: {}", e),
                    });
                    continue;
                }
            };

            let input = CreateProductInput {
                sku: row.sku.filter(|s| !s.is_empty()),
                name: row.name,
                category: row.category.filter(|c| !c.is_empty()),
                description: None,
                purchase_price: row.purchase_price.unwrap_or(Decimal::ZERO),
                selling_price: row.selling_price,
                quantity: row.quantity.unwrap_or(0),
                supplier: row.supplier.filter(|s| !s.is_empty()),
                barcode: None,
                low_stock_threshold: None,
                reorder_qty: None,
                image_url: None,
            };

            match self.create_product(input).await {
                Ok(product) => created.push(product),
                Err(e) => failed.push(BulkImportError {
                    row: row_number,
                    error: e.to_string(),
                }),
            }
        }

        Ok(BulkImportResult {
            created_count: created.len(),
            created,
            failed,
        })
    }
}
