//! HTTP handlers for user administration endpoints
//!
//! All endpoints except `GET /me` require the admin role.

use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::middleware::{require_admin, CurrentUser};
use crate::services::user::{
    BulkImportResult, CreateUserInput, ListUsersFilter, UpdateUserInput, UserService,
};
use crate::services::AuthService;
use crate::AppState;
use shared::models::User;

/// Get the current authenticated user
pub async fn me(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<User>> {
    let auth_service = AuthService::new(state.db.clone(), &state.config);
    let user = auth_service.get_user(current_user.0.user_id).await?;
    Ok(Json(user))
}

/// List users with optional filters
pub async fn list_users(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(filter): Query<ListUsersFilter>,
) -> AppResult<Json<Vec<User>>> {
    require_admin(&current_user.0)?;

    let service = UserService::new(state.db);
    let users = service.list_users(&filter).await?;
    Ok(Json(users))
}

/// Get a user by id
pub async fn get_user(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(user_id): Path<Uuid>,
) -> AppResult<Json<User>> {
    require_admin(&current_user.0)?;

    let service = UserService::new(state.db);
    let user = service.get_user(user_id).await?;
    Ok(Json(user))
}

/// Create a user
pub async fn create_user(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreateUserInput>,
) -> AppResult<(StatusCode, Json<User>)> {
    require_admin(&current_user.0)?;

    let service = UserService::new(state.db);
    let user = service.create_user(input).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// Update a user
pub async fn update_user(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(user_id): Path<Uuid>,
    Json(input): Json<UpdateUserInput>,
) -> AppResult<Json<User>> {
    require_admin(&current_user.0)?;

    let service = UserService::new(state.db);
    let user = service.update_user(user_id, input).await?;
    Ok(Json(user))
}

/// Delete a user
pub async fn delete_user(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(user_id): Path<Uuid>,
) -> AppResult<Json<()>> {
    require_admin(&current_user.0)?;

    let service = UserService::new(state.db);
    service.delete_user(user_id).await?;
    Ok(Json(()))
}

/// Body for setting a user's password
#[derive(Debug, Deserialize)]
pub struct SetPasswordRequest {
    pub password: String,
}

/// Set a user's password (admin action)
pub async fn set_password(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(user_id): Path<Uuid>,
    Json(body): Json<SetPasswordRequest>,
) -> AppResult<Json<serde_json::Value>> {
    require_admin(&current_user.0)?;

    let service = UserService::new(state.db);
    service.set_password(user_id, &body.password).await?;
    Ok(Json(serde_json::json!({ "status": "password_set" })))
}

/// Bulk-import users from an uploaded CSV file (field name 'file')
pub async fn bulk_import_users(
    State(state): State<AppState>,
    current_user: CurrentUser,
    mut multipart: Multipart,
) -> AppResult<Json<BulkImportResult>> {
    require_admin(&current_user.0)?;

    let csv_bytes = read_file_field(&mut multipart).await?;

    let service = UserService::new(state.db);
    let result = service.bulk_import(&csv_bytes).await?;
    Ok(Json(result))
}

/// Pull the 'file' field out of a multipart upload
pub(crate) async fn read_file_field(multipart: &mut Multipart) -> AppResult<Vec<u8>> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::ValidationError(format!("Invalid multipart body: {}", e)))?
    {
        if field.name() == Some("file") {
            let bytes = field
                .bytes()
                .await
                .map_err(|e| AppError::ValidationError(format!("Could not read file: {}", e)))?;
            return Ok(bytes.to_vec());
        }
    }

    Err(AppError::ValidationError(
        "No file uploaded (field name 'file')".to_string(),
    ))
}
