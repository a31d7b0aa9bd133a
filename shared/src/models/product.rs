//! Product model

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A product tracked in inventory
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Product {
    pub id: Uuid,
    pub sku: Option<String>,
    pub name: String,
    pub category: Option<String>,
    pub description: Option<String>,
    pub purchase_price: Decimal,
    pub selling_price: Option<Decimal>,
    pub quantity: i32,
    pub supplier: Option<String>,
    pub barcode: Option<String>,
    /// Quantity at or below which the product counts as low stock
    pub low_stock_threshold: i32,
    /// Suggested reorder quantity when low stock is reached
    pub reorder_qty: i32,
    pub image_url: Option<String>,
    pub last_price_updated_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Total purchase value of the stock on hand
    pub fn total_value(&self) -> Decimal {
        Decimal::from(self.quantity) * self.purchase_price
    }

    /// Whether the current quantity is at or below the low-stock threshold
    pub fn is_low_stock(&self) -> bool {
        self.quantity <= self.low_stock_threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn sample_product(quantity: i32, threshold: i32) -> Product {
        Product {
            id: Uuid::new_v4(),
            sku: Some("SKU-1".to_string()),
            name: "Test".to_string(),
            category: None,
            description: None,
            purchase_price: Decimal::from_str("12.50").unwrap(),
            selling_price: None,
            quantity,
            supplier: None,
            barcode: None,
            low_stock_threshold: threshold,
            reorder_qty: 10,
            image_url: None,
            last_price_updated_by: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_total_value() {
        let p = sample_product(4, 5);
        assert_eq!(p.total_value(), Decimal::from_str("50.00").unwrap());
    }

    #[test]
    fn test_low_stock_boundary() {
        assert!(sample_product(5, 5).is_low_stock());
        assert!(sample_product(0, 5).is_low_stock());
        assert!(!sample_product(6, 5).is_low_stock());
    }
}
