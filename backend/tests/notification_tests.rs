//! Notification tests
//!
//! Tests for notification visibility scoping and low-stock payload shape.

use proptest::prelude::*;
use uuid::Uuid;

use shared::models::NotificationType;
use shared::types::UserRole;

/// Visibility rule: admins see everything; staff see their own plus
/// broadcasts (no target user).
fn is_visible(viewer: Uuid, role: UserRole, target: Option<Uuid>) -> bool {
    match role {
        UserRole::Admin => true,
        UserRole::Staff => target.map_or(true, |user_id| user_id == viewer),
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[test]
fn test_admin_sees_everything() {
    let admin = Uuid::new_v4();
    let other = Uuid::new_v4();

    assert!(is_visible(admin, UserRole::Admin, None));
    assert!(is_visible(admin, UserRole::Admin, Some(admin)));
    assert!(is_visible(admin, UserRole::Admin, Some(other)));
}

#[test]
fn test_staff_sees_own_and_broadcasts() {
    let staff = Uuid::new_v4();
    let other = Uuid::new_v4();

    assert!(is_visible(staff, UserRole::Staff, None));
    assert!(is_visible(staff, UserRole::Staff, Some(staff)));
    assert!(!is_visible(staff, UserRole::Staff, Some(other)));
}

#[test]
fn test_notification_type_wire_names() {
    assert_eq!(NotificationType::LowStock.as_str(), "low_stock");
    assert_eq!(NotificationType::StockChanged.as_str(), "stock_changed");
    assert_eq!(NotificationType::System.as_str(), "system");
}

/// The low-stock payload carries everything a client needs to render and
/// act on the alert
#[test]
fn test_low_stock_payload_shape() {
    let product_id = Uuid::new_v4();
    let payload = serde_json::json!({
        "product_id": product_id,
        "product_name": "Beans",
        "quantity": 2,
        "threshold": 5,
        "reorder_qty": 10,
        "reference": null,
    });

    assert_eq!(payload["product_name"], "Beans");
    assert_eq!(payload["quantity"], 2);
    assert_eq!(payload["threshold"], 5);
    assert!(payload["quantity"].as_i64().unwrap() <= payload["threshold"].as_i64().unwrap());
}

#[test]
fn test_notification_type_serde_round_trip() {
    let serialized = serde_json::to_string(&NotificationType::LowStock).unwrap();
    assert_eq!(serialized, "\"low_stock\"");

    let parsed: NotificationType = serde_json::from_str("\"ai_report_ready\"").unwrap();
    assert_eq!(parsed, NotificationType::AiReportReady);
}

// ============================================================================
// Property-Based Tests
// ============================================================================

proptest! {
    /// Broadcasts are visible to every viewer, whatever their role
    #[test]
    fn test_broadcasts_always_visible(is_admin in any::<bool>()) {
        let viewer = Uuid::new_v4();
        let role = if is_admin { UserRole::Admin } else { UserRole::Staff };
        prop_assert!(is_visible(viewer, role, None));
    }

    /// Staff never see another user's targeted notification
    #[test]
    fn test_staff_isolation(_seed in any::<u64>()) {
        let viewer = Uuid::new_v4();
        let other = Uuid::new_v4();
        prop_assert!(!is_visible(viewer, UserRole::Staff, Some(other)));
    }
}
