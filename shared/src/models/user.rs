//! User account model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::UserRole;

/// A user account on the platform
///
/// Accounts are keyed by email (unique, case-insensitive). A password is
/// optional: most users sign in with a one-time login code or Google, and
/// only admin-provisioned accounts carry a password hash (kept out of this
/// struct, it never leaves the backend).
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub role: UserRole,
    pub phone: Option<String>,
    pub is_active: bool,
    /// Free-form per-user settings (notification preferences etc.)
    pub settings: serde_json::Value,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Display identifier: username when set, otherwise the email local part
    pub fn display_name(&self) -> String {
        match &self.username {
            Some(name) if !name.is_empty() => name.clone(),
            _ => crate::validation::username_from_email(&self.email),
        }
    }
}
