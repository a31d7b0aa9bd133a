//! User administration service
//!
//! Admin-only CRUD over accounts plus CSV bulk import. There is no public
//! registration: accounts appear here or get auto-provisioned on first
//! successful sign-in.

use bcrypt::{hash, DEFAULT_COST};
use serde::Deserialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use shared::models::User;
use shared::types::UserRole;
use shared::validation::{normalize_email, username_from_email, validate_email, validate_password};

const USER_COLUMNS: &str = "id, email, username, first_name, last_name, role, phone, is_active, \
                            settings, last_login_at, created_at, updated_at";

/// User administration service
#[derive(Clone)]
pub struct UserService {
    db: PgPool,
}

/// Filters for listing users
#[derive(Debug, Default, Deserialize)]
pub struct ListUsersFilter {
    pub role: Option<UserRole>,
    pub is_active: Option<bool>,
    /// Matches against email, username, first and last name
    pub search: Option<String>,
}

/// Input for creating a user
#[derive(Debug, Deserialize)]
pub struct CreateUserInput {
    pub email: String,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub role: Option<UserRole>,
    pub phone: Option<String>,
    pub password: Option<String>,
}

/// Input for updating a user
#[derive(Debug, Deserialize)]
pub struct UpdateUserInput {
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub role: Option<UserRole>,
    pub phone: Option<String>,
    pub is_active: Option<bool>,
    pub settings: Option<serde_json::Value>,
}

/// Result of a CSV bulk import
#[derive(Debug, serde::Serialize)]
pub struct BulkImportResult {
    pub created_count: usize,
    pub created: Vec<User>,
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
struct UserImportRow {
    email: String,
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    first_name: Option<String>,
    #[serde(default)]
    last_name: Option<String>,
    #[serde(default)]
    role: Option<String>,
    #[serde(default)]
    password: Option<String>,
}

impl UserService {
    /// Create a new UserService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// List users with optional filters
    pub async fn list_users(&self, filter: &ListUsersFilter) -> AppResult<Vec<User>> {
        let search = filter
            .search
            .as_ref()
            .map(|s| format!("%{}%", s.to_ascii_lowercase()));

        let query = format!(
            r#"
            SELECT {}
            FROM users
            WHERE ($1::user_role IS NULL OR role = $1)
              AND ($2::boolean IS NULL OR is_active = $2)
              AND ($3::text IS NULL
                   OR LOWER(email) LIKE $3
                   OR LOWER(COALESCE(username, '')) LIKE $3
                   OR LOWER(COALESCE(first_name, '')) LIKE $3
                   OR LOWER(COALESCE(last_name, '')) LIKE $3)
            ORDER BY created_at DESC
            "#,
            USER_COLUMNS
        );

        let users = sqlx::query_as::<_, User>(&query)
            .bind(filter.role)
            .bind(filter.is_active)
            .bind(search)
            .fetch_all(&self.db)
            .await?;

        Ok(users)
    }

    /// Get a user by id
    pub async fn get_user(&self, user_id: Uuid) -> AppResult<User> {
        let query = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);
        let user = sqlx::query_as::<_, User>(&query)
            .bind(user_id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound("User".to_string()))?;

        Ok(user)
    }

    /// Create a user (admin provisioning)
    pub async fn create_user(&self, input: CreateUserInput) -> AppResult<User> {
        let email = normalize_email(&input.email);
        validate_email(&email).map_err(|msg| AppError::Validation {
            field: "email".to_string(),
            message: msg.to_string(),
        })?;

        let existing = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM users WHERE LOWER(email) = $1",
        )
        .bind(&email)
        .fetch_one(&self.db)
        .await?;

        if existing > 0 {
            return Err(AppError::DuplicateEntry("email".to_string()));
        }

        let password_hash = match &input.password {
            Some(password) if !password.is_empty() => {
                validate_password(password).map_err(|msg| AppError::Validation {
                    field: "password".to_string(),
                    message: msg.to_string(),
                })?;
                Some(
                    hash(password, DEFAULT_COST)
                        .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))?,
                )
            }
            _ => None,
        };

        let username = input
            .username
            .filter(|u| !u.is_empty())
            .unwrap_or_else(|| username_from_email(&email));

        let query = format!(
            r#"
            INSERT INTO users (email, username, first_name, last_name, role, phone, password_hash)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {}
            "#,
            USER_COLUMNS
        );

        let user = sqlx::query_as::<_, User>(&query)
            .bind(&email)
            .bind(&username)
            .bind(&input.first_name)
            .bind(&input.last_name)
            .bind(input.role.unwrap_or_default())
            .bind(&input.phone)
            .bind(&password_hash)
            .fetch_one(&self.db)
            .await?;

        Ok(user)
    }

    /// Update a user
    pub async fn update_user(&self, user_id: Uuid, input: UpdateUserInput) -> AppResult<User> {
        // Existence check keeps the error message precise
        self.get_user(user_id).await?;

        let query = format!(
            r#"
            UPDATE users SET
                username = COALESCE($2, username),
                first_name = COALESCE($3, first_name),
                last_name = COALESCE($4, last_name),
                role = COALESCE($5, role),
                phone = COALESCE($6, phone),
                is_active = COALESCE($7, is_active),
                settings = COALESCE($8, settings),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            USER_COLUMNS
        );

        let user = sqlx::query_as::<_, User>(&query)
            .bind(user_id)
            .bind(&input.username)
            .bind(&input.first_name)
            .bind(&input.last_name)
            .bind(input.role)
            .bind(&input.phone)
            .bind(input.is_active)
            .bind(&input.settings)
            .fetch_one(&self.db)
            .await?;

        Ok(user)
    }

    /// Delete a user
    pub async fn delete_user(&self, user_id: Uuid) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(user_id)
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("User".to_string()));
        }

        Ok(())
    }

    /// Set a user's password (admin action)
    pub async fn set_password(&self, user_id: Uuid, password: &str) -> AppResult<()> {
        validate_password(password).map_err(|msg| AppError::Validation {
            field: "password".to_string(),
            message: msg.to_string(),
        })?;

        let password_hash = hash(password, DEFAULT_COST)
            .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))?;

        let result = sqlx::query("UPDATE users SET password_hash = $1, updated_at = NOW() WHERE id = $2")
            .bind(&password_hash)
            .bind(user_id)
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("User".to_string()));
        }

        Ok(())
    }

    /// Bulk-import users from CSV bytes
    ///
    /// Expected columns: email, username, first_name, last_name, role,
    /// password (all except email optional). Rows fail independently.
    pub async fn bulk_import(&self, csv_bytes: &[u8]) -> AppResult<BulkImportResult> {
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(csv_bytes);

        let mut created = Vec::new();
        let mut failed = Vec::new();

        for (idx, row) in reader.deserialize::<UserImportRow>().enumerate() {
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

            let role = match row.role.as_deref() {
                None | Some("") => UserRole::Staff,
                Some(value) => match value.parse() {
                    Ok(role) => role,
                    Err(e) => {
                        failed.push(BulkImportError {
                            row: row_number,
                            error: e,
                        });
                        continue;
                    }
                },
            };

            let input = CreateUserInput {
                email: row.email,
                username: row.username,
                first_name: row.first_name,
                last_name: row.last_name,
                role: Some(role),
                phone: None,
                password: row.password,
            };

            match self.create_user(input).await {
                Ok(user) => created.push(user),
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
