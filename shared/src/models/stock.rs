//! Stock movement models

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An append-only log entry recording a stock adjustment
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct StockLog {
    pub id: Uuid,
    pub product_id: Uuid,
    pub user_id: Option<Uuid>,
    /// Positive for additions, negative for removals
    pub change_amount: i32,
    pub reason: Option<String>,
    pub reference: Option<String>,
    /// Product quantity after the adjustment was applied
    pub resulting_quantity: i32,
    pub created_at: DateTime<Utc>,
}

/// A recorded sale of a product
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Sale {
    pub id: Uuid,
    pub product_id: Uuid,
    pub user_id: Option<Uuid>,
    pub quantity: i32,
    pub unit_price: Decimal,
    /// Always quantity * unit_price, computed at insert time
    pub total_price: Decimal,
    pub created_at: DateTime<Utc>,
}
