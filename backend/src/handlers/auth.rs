//! Authentication handlers

use axum::{extract::State, Json};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::error::AppResult;
use crate::external::{EmailSender, GoogleAuthClient};
use crate::middleware::{require_admin, CurrentUser};
use crate::services::auth::{AuthTokens, VerifiedLogin};
use crate::services::AuthService;
use crate::AppState;

#[derive(Deserialize)]
pub struct RequestCodeRequest {
    pub email: String,
}

#[derive(Serialize)]
pub struct RequestCodeResponse {
    pub detail: String,
    /// Echoed back in development only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

#[derive(Deserialize)]
pub struct VerifyCodeRequest {
    pub email: String,
    pub code: String,
}

#[derive(Deserialize)]
pub struct GoogleAuthRequest {
    pub id_token: String,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Serialize)]
pub struct CleanupCodesResponse {
    pub removed_count: u64,
}

/// Request a one-time login code by email
pub async fn request_code(
    State(state): State<AppState>,
    Json(body): Json<RequestCodeRequest>,
) -> AppResult<Json<RequestCodeResponse>> {
    let auth_service = AuthService::new(state.db.clone(), &state.config);
    let sender = EmailSender::new(&state.config.smtp, state.config.shop.name.clone())?;

    let record = auth_service
        .request_code(&body.email, &sender, Utc::now())
        .await?;

    // Development convenience: return the code in the response
    if state.config.is_development() {
        return Ok(Json(RequestCodeResponse {
            detail: "Code sent (DEV)".to_string(),
            code: Some(record.code),
        }));
    }

    Ok(Json(RequestCodeResponse {
        detail: "Code sent (check your email)".to_string(),
        code: None,
    }))
}

/// Verify a login code and mint a session
pub async fn verify_code(
    State(state): State<AppState>,
    Json(body): Json<VerifyCodeRequest>,
) -> AppResult<Json<VerifiedLogin>> {
    let auth_service = AuthService::new(state.db.clone(), &state.config);
    let login = auth_service
        .verify_code(&body.email, &body.code, Utc::now())
        .await?;

    Ok(Json(login))
}

/// Sign in with a Google ID token
pub async fn google_auth(
    State(state): State<AppState>,
    Json(body): Json<GoogleAuthRequest>,
) -> AppResult<Json<VerifiedLogin>> {
    let google = GoogleAuthClient::from_config(&state.config.google);
    let identity = google.verify_id_token(&body.id_token).await?;

    let auth_service = AuthService::new(state.db.clone(), &state.config);
    let login = auth_service.google_auth(&identity, Utc::now()).await?;

    Ok(Json(login))
}

/// Email + password login for admin-provisioned accounts
pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> AppResult<Json<VerifiedLogin>> {
    let auth_service = AuthService::new(state.db.clone(), &state.config);
    let login = auth_service.login(&body.email, &body.password).await?;

    Ok(Json(login))
}

/// Refresh token endpoint handler
pub async fn refresh(
    State(state): State<AppState>,
    Json(body): Json<RefreshRequest>,
) -> AppResult<Json<AuthTokens>> {
    let auth_service = AuthService::new(state.db.clone(), &state.config);
    let tokens = auth_service.refresh_token(&body.refresh_token).await?;

    Ok(Json(tokens))
}

/// Sweep used and stale login codes (admin maintenance trigger)
pub async fn cleanup_codes(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<CleanupCodesResponse>> {
    require_admin(&current_user.0)?;

    let auth_service = AuthService::new(state.db.clone(), &state.config);
    let removed_count = auth_service.cleanup_codes(Utc::now()).await?;

    Ok(Json(CleanupCodesResponse { removed_count }))
}
