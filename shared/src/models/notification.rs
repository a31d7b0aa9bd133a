//! Notification model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Notification type enum
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "notification_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum NotificationType {
    LowStock,
    StockChanged,
    AiReportReady,
    System,
}

impl NotificationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationType::LowStock => "low_stock",
            NotificationType::StockChanged => "stock_changed",
            NotificationType::AiReportReady => "ai_report_ready",
            NotificationType::System => "system",
        }
    }
}

/// An in-app notification
///
/// `user_id == None` marks a broadcast visible to everyone in the shop.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub notification_type: NotificationType,
    pub title: String,
    pub message: String,
    /// Contextual data (product id, name, quantity, threshold, link)
    pub payload: serde_json::Value,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}
