//! HTTP handlers for notification endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::{require_admin, CurrentUser};
use crate::services::notification::CreateNotificationInput;
use crate::AppState;
use shared::models::Notification;

/// Query parameters for listing notifications
#[derive(Debug, Deserialize)]
pub struct ListNotificationsQuery {
    pub unread_only: Option<bool>,
    pub limit: Option<i64>,
}

/// List notifications visible to the current user
pub async fn list_notifications(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(query): Query<ListNotificationsQuery>,
) -> AppResult<Json<Vec<Notification>>> {
    let service = super::product::notification_service(&state);
    let notifications = service
        .list_notifications(
            current_user.0.user_id,
            current_user.0.role,
            query.unread_only.unwrap_or(false),
            query.limit.unwrap_or(50),
        )
        .await?;
    Ok(Json(notifications))
}

/// Unread count response
#[derive(Debug, serde::Serialize)]
pub struct UnreadCountResponse {
    pub count: i64,
}

/// Get unread notification count
pub async fn get_unread_count(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<UnreadCountResponse>> {
    let service = super::product::notification_service(&state);
    let count = service
        .unread_count(current_user.0.user_id, current_user.0.role)
        .await?;
    Ok(Json(UnreadCountResponse { count }))
}

/// Create a notification (admin broadcast / targeted message)
pub async fn create_notification(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreateNotificationInput>,
) -> AppResult<(StatusCode, Json<Notification>)> {
    require_admin(&current_user.0)?;

    let service = super::product::notification_service(&state);
    let notification = service.create_notification(input).await?;
    Ok((StatusCode::CREATED, Json(notification)))
}

/// Mark a notification as read
pub async fn mark_as_read(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(notification_id): Path<Uuid>,
) -> AppResult<Json<()>> {
    let service = super::product::notification_service(&state);
    service
        .mark_as_read(current_user.0.user_id, current_user.0.role, notification_id)
        .await?;
    Ok(Json(()))
}

/// Mark all read response
#[derive(Debug, serde::Serialize)]
pub struct MarkAllReadResponse {
    pub marked_count: u64,
}

/// Mark all visible notifications as read
pub async fn mark_all_as_read(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<MarkAllReadResponse>> {
    let service = super::product::notification_service(&state);
    let marked_count = service
        .mark_all_as_read(current_user.0.user_id, current_user.0.role)
        .await?;
    Ok(Json(MarkAllReadResponse { marked_count }))
}

/// Delete a notification (admin only)
pub async fn delete_notification(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(notification_id): Path<Uuid>,
) -> AppResult<Json<()>> {
    require_admin(&current_user.0)?;

    let service = super::product::notification_service(&state);
    service.delete_notification(notification_id).await?;
    Ok(Json(()))
}
