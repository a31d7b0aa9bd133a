//! Inventory management tests
//!
//! Tests for stock accounting rules: adjustment arithmetic, the append-only
//! log invariant, low-stock detection and sale pricing.

use chrono::Utc;
use proptest::prelude::*;
use rust_decimal::Decimal;
use std::str::FromStr;
use uuid::Uuid;

use shared::models::Product;
use shared::validation::{validate_price, validate_sku};

// Helper to create Decimal from string
fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

fn product(quantity: i32, threshold: i32, purchase_price: &str) -> Product {
    Product {
        id: Uuid::new_v4(),
        sku: Some("SKU-1".to_string()),
        name: "Test product".to_string(),
        category: Some("general".to_string()),
        description: None,
        purchase_price: dec(purchase_price),
        selling_price: Some(dec(purchase_price) * dec("1.5")),
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

// ============================================================================
// Unit Tests
// ============================================================================

#[test]
fn test_total_value() {
    let p = product(4, 5, "12.50");
    assert_eq!(p.total_value(), dec("50.00"));
}

#[test]
fn test_total_value_empty_stock() {
    let p = product(0, 5, "12.50");
    assert_eq!(p.total_value(), Decimal::ZERO);
}

/// Low stock triggers at, not only below, the threshold
#[test]
fn test_low_stock_boundary() {
    assert!(product(5, 5, "1.00").is_low_stock());
    assert!(product(4, 5, "1.00").is_low_stock());
    assert!(!product(6, 5, "1.00").is_low_stock());
}

/// Negative stock still counts as low stock (and is an anomaly elsewhere)
#[test]
fn test_negative_stock_is_low() {
    assert!(product(-1, 5, "1.00").is_low_stock());
}

/// A stock log's resulting quantity equals the running balance
#[test]
fn test_stock_log_running_balance() {
    let adjustments = [50, -20, 30, -15, -45];
    let mut quantity = 0;
    let mut resulting = Vec::new();

    for change in adjustments {
        quantity += change;
        resulting.push(quantity);
    }

    assert_eq!(resulting, vec![50, 30, 60, 45, 0]);
    assert_eq!(quantity, adjustments.iter().sum::<i32>());
}

#[test]
fn test_sale_total_price() {
    let quantity = 3;
    let unit_price = dec("19.99");
    let total = unit_price * Decimal::from(quantity);
    assert_eq!(total, dec("59.97"));
}

/// A sale never exceeds the quantity on hand
#[test]
fn test_sale_overdraft_rule() {
    let on_hand = 4;
    let requested = 5;
    assert!(requested > on_hand, "overdraft must be rejected");

    let allowed = 4;
    assert!(allowed <= on_hand);
}

#[test]
fn test_sku_rules() {
    assert!(validate_sku("ABC-001").is_ok());
    assert!(validate_sku("abc_001").is_ok());
    assert!(validate_sku("").is_err());
    assert!(validate_sku("no spaces").is_err());
}

#[test]
fn test_price_rules() {
    assert!(validate_price(dec("0")).is_ok());
    assert!(validate_price(dec("10.99")).is_ok());
    assert!(validate_price(dec("-1")).is_err());
}

// ============================================================================
// Property-Based Tests
// ============================================================================

proptest! {
    /// Applying a sequence of adjustments gives a final quantity equal to
    /// the initial quantity plus the sum of changes
    #[test]
    fn test_adjustment_sequence_accounting(
        initial in 0i32..1000,
        changes in prop::collection::vec(-50i32..50, 0..20),
    ) {
        let mut quantity = initial;
        for change in &changes {
            quantity += change;
        }
        prop_assert_eq!(quantity, initial + changes.iter().sum::<i32>());
    }

    /// Total stock value scales linearly with quantity
    #[test]
    fn test_total_value_linearity(quantity in 0i32..10_000) {
        let p = product(quantity, 5, "2.50");
        prop_assert_eq!(p.total_value(), dec("2.50") * Decimal::from(quantity));
    }

    /// The low-stock predicate is exactly quantity <= threshold
    #[test]
    fn test_low_stock_predicate(quantity in -10i32..100, threshold in 0i32..50) {
        let p = product(quantity, threshold, "1.00");
        prop_assert_eq!(p.is_low_stock(), quantity <= threshold);
    }

    /// Sale totals are always quantity * unit_price
    #[test]
    fn test_sale_total_consistency(quantity in 1i32..100, cents in 1i64..100_000) {
        let unit_price = Decimal::new(cents, 2);
        let total = unit_price * Decimal::from(quantity);
        prop_assert_eq!(total, Decimal::from(quantity) * unit_price);
        prop_assert!(total >= unit_price);
    }
}
