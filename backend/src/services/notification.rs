//! Notification service for in-app notifications and email fan-out
//!
//! Notifications either target a single user or, with no user set, broadcast
//! to the whole shop. Low-stock alerts notify every admin individually plus
//! one broadcast so staff dashboards see them too.

use serde::Deserialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::external::EmailSender;
use shared::models::{Notification, NotificationType, Product};
use shared::types::UserRole;

/// Notification service
#[derive(Clone)]
pub struct NotificationService {
    db: PgPool,
    email_sender: Option<EmailSender>,
}

/// Input for creating a notification
#[derive(Debug, Deserialize)]
pub struct CreateNotificationInput {
    /// Target user; None broadcasts to everyone
    pub user_id: Option<Uuid>,
    pub notification_type: NotificationType,
    pub title: String,
    pub message: String,
    #[serde(default)]
    pub payload: serde_json::Value,
    /// Also email the target user (ignored for broadcasts)
    #[serde(default)]
    pub send_email: bool,
}

impl NotificationService {
    /// Create a new NotificationService instance
    pub fn new(db: PgPool) -> Self {
        Self {
            db,
            email_sender: None,
        }
    }

    /// Create with an email sender for optional fan-out
    pub fn with_email_sender(db: PgPool, email_sender: EmailSender) -> Self {
        Self {
            db,
            email_sender: Some(email_sender),
        }
    }

    /// Create a notification, optionally emailing the target user
    ///
    /// Email failures are logged and swallowed; the in-app notification is
    /// the source of truth.
    pub async fn create_notification(
        &self,
        input: CreateNotificationInput,
    ) -> AppResult<Notification> {
        let notification = sqlx::query_as::<_, Notification>(
            r#"
            INSERT INTO notifications (user_id, notification_type, title, message, payload)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, user_id, notification_type, title, message, payload, is_read, created_at
            "#,
        )
        .bind(input.user_id)
        .bind(input.notification_type)
        .bind(&input.title)
        .bind(&input.message)
        .bind(&input.payload)
        .fetch_one(&self.db)
        .await?;

        if input.send_email {
            if let (Some(sender), Some(user_id)) = (&self.email_sender, input.user_id) {
                let email = sqlx::query_scalar::<_, String>(
                    "SELECT email FROM users WHERE id = $1",
                )
                .bind(user_id)
                .fetch_optional(&self.db)
                .await?;

                if let Some(email) = email {
                    let body = format!("{}\n\nDetails:\n{}", input.message, input.payload);
                    if let Err(e) = sender.send(&email, &input.title, &body).await {
                        tracing::warn!("Notification email to {} failed: {}", email, e);
                    }
                }
            }
        }

        Ok(notification)
    }

    /// Create low-stock notifications for a product
    ///
    /// One notification per admin plus a shop-wide broadcast.
    pub async fn notify_low_stock(
        &self,
        product: &Product,
        reference: Option<&str>,
    ) -> AppResult<()> {
        let title = format!("Low stock: {}", product.name);
        let message = format!(
            "Product '{}' quantity is {} (threshold {}).",
            product.name, product.quantity, product.low_stock_threshold
        );
        let payload = serde_json::json!({
            "product_id": product.id,
            "product_name": product.name,
            "quantity": product.quantity,
            "threshold": product.low_stock_threshold,
            "reorder_qty": product.reorder_qty,
            "reference": reference,
        });

        let admin_ids = sqlx::query_scalar::<_, Uuid>(
            "SELECT id FROM users WHERE role = 'admin' AND is_active = true",
        )
        .fetch_all(&self.db)
        .await?;

        for admin_id in admin_ids {
            self.create_notification(CreateNotificationInput {
                user_id: Some(admin_id),
                notification_type: NotificationType::LowStock,
                title: title.clone(),
                message: message.clone(),
                payload: payload.clone(),
                send_email: false,
            })
            .await?;
        }

        // Broadcast for the shop-wide feed
        self.create_notification(CreateNotificationInput {
            user_id: None,
            notification_type: NotificationType::LowStock,
            title,
            message,
            payload,
            send_email: false,
        })
        .await?;

        Ok(())
    }

    /// List notifications visible to a user
    ///
    /// Admins see everything; staff see their own plus broadcasts.
    pub async fn list_notifications(
        &self,
        user_id: Uuid,
        role: UserRole,
        unread_only: bool,
        limit: i64,
    ) -> AppResult<Vec<Notification>> {
        let notifications = if role.is_admin() {
            sqlx::query_as::<_, Notification>(
                r#"
                SELECT id, user_id, notification_type, title, message, payload, is_read, created_at
                FROM notifications
                WHERE ($1 = false OR is_read = false)
                ORDER BY created_at DESC
                LIMIT $2
                "#,
            )
            .bind(unread_only)
            .bind(limit)
            .fetch_all(&self.db)
            .await?
        } else {
            sqlx::query_as::<_, Notification>(
                r#"
                SELECT id, user_id, notification_type, title, message, payload, is_read, created_at
                FROM notifications
                WHERE (user_id = $1 OR user_id IS NULL)
                  AND ($2 = false OR is_read = false)
                ORDER BY created_at DESC
                LIMIT $3
                "#,
            )
            .bind(user_id)
            .bind(unread_only)
            .bind(limit)
            .fetch_all(&self.db)
            .await?
        };

        Ok(notifications)
    }

    /// Count unread notifications visible to a user
    pub async fn unread_count(&self, user_id: Uuid, role: UserRole) -> AppResult<i64> {
        let count = if role.is_admin() {
            sqlx::query_scalar::<_, i64>(
                "SELECT COUNT(*) FROM notifications WHERE is_read = false",
            )
            .fetch_one(&self.db)
            .await?
        } else {
            sqlx::query_scalar::<_, i64>(
                "SELECT COUNT(*) FROM notifications \
                 WHERE (user_id = $1 OR user_id IS NULL) AND is_read = false",
            )
            .bind(user_id)
            .fetch_one(&self.db)
            .await?
        };

        Ok(count)
    }

    /// Mark a notification as read
    pub async fn mark_as_read(
        &self,
        user_id: Uuid,
        role: UserRole,
        notification_id: Uuid,
    ) -> AppResult<()> {
        let result = if role.is_admin() {
            sqlx::query("UPDATE notifications SET is_read = true WHERE id = $1")
                .bind(notification_id)
                .execute(&self.db)
                .await?
        } else {
            sqlx::query(
                "UPDATE notifications SET is_read = true \
                 WHERE id = $1 AND (user_id = $2 OR user_id IS NULL)",
            )
            .bind(notification_id)
            .bind(user_id)
            .execute(&self.db)
            .await?
        };

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Notification".to_string()));
        }

        Ok(())
    }

    /// Mark all visible notifications as read, returning how many changed
    pub async fn mark_all_as_read(&self, user_id: Uuid, role: UserRole) -> AppResult<u64> {
        let result = if role.is_admin() {
            sqlx::query("UPDATE notifications SET is_read = true WHERE is_read = false")
                .execute(&self.db)
                .await?
        } else {
            sqlx::query(
                "UPDATE notifications SET is_read = true \
                 WHERE (user_id = $1 OR user_id IS NULL) AND is_read = false",
            )
            .bind(user_id)
            .execute(&self.db)
            .await?
        };

        Ok(result.rows_affected())
    }

    /// Delete a notification (admin only, enforced at the route layer)
    pub async fn delete_notification(&self, notification_id: Uuid) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM notifications WHERE id = $1")
            .bind(notification_id)
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Notification".to_string()));
        }

        Ok(())
    }
}
