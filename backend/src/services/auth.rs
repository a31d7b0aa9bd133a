//! Authentication service: one-time login codes, Google sign-in, password
//! login and token management
//!
//! The login-code lifecycle is the stateful part. A code is issued for an
//! email, delivered out-of-band, then verified at most once. Failed
//! verifications count against the newest code for that email — even when
//! the submitted code matches nothing, the newest code takes the strike.
//! That is a deliberate brute-force deterrent: guessing wrong always costs
//! the attacker an attempt against the victim's latest code. After
//! `max_attempts` strikes the code locks for a cooldown window and is
//! rejected regardless of correctness until a fresh code is issued.

use bcrypt::verify;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{encode, EncodingKey, Header};
use rand::Rng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::config::{Config, LoginCodeConfig};
use crate::error::{AppError, AppResult};
use crate::external::{EmailSender, GoogleIdentity};
use shared::models::User;
use shared::types::UserRole;
use shared::validation::{normalize_email, username_from_email};

/// Columns selected whenever a `shared::models::User` is loaded.
/// The password hash deliberately never leaves this module.
const USER_COLUMNS: &str = "id, email, username, first_name, last_name, role, phone, is_active, \
                            settings, last_login_at, created_at, updated_at";

/// Authentication service
#[derive(Clone)]
pub struct AuthService {
    db: PgPool,
    jwt_secret: String,
    access_token_expiry: i64,
    refresh_token_expiry: i64,
    login_code: LoginCodeConfig,
    default_new_user_role: UserRole,
}

/// A persisted one-time login code
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct LoginCode {
    pub id: Uuid,
    pub email: String,
    pub user_id: Option<Uuid>,
    pub code: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub used: bool,
    pub attempts: i32,
    pub max_attempts: i32,
    pub locked_until: Option<DateTime<Utc>>,
}

impl LoginCode {
    /// A code is usable iff it is unused, unexpired (strictly before
    /// `expires_at`) and not inside a lockout window.
    pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
        if self.used {
            return false;
        }
        if now >= self.expires_at {
            return false;
        }
        if let Some(locked_until) = self.locked_until {
            if now < locked_until {
                return false;
            }
        }
        true
    }

    /// Whether the code is currently inside a lockout window
    pub fn is_locked(&self, now: DateTime<Utc>) -> bool {
        matches!(self.locked_until, Some(locked_until) if now < locked_until)
    }
}

/// Outcome of applying one failed attempt to a code's counters
///
/// Pure so the lockout policy is testable without a clock or database.
pub fn apply_failed_attempt(
    attempts: i32,
    max_attempts: i32,
    now: DateTime<Utc>,
    lock_minutes: i64,
) -> (i32, Option<DateTime<Utc>>) {
    let next = attempts + 1;
    let locked_until = if next >= max_attempts {
        Some(now + Duration::minutes(lock_minutes))
    } else {
        None
    };
    (next, locked_until)
}

/// Generate a fixed-length numeric login code from a CSPRNG
pub fn generate_code(length: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..length)
        .map(|_| char::from(b'0' + rng.gen_range(0..10u8)))
        .collect()
}

/// JWT claims structure
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub email: String,
    pub role: String,
    pub exp: i64,
    pub iat: i64,
}

/// Authentication tokens
#[derive(Debug, Serialize)]
pub struct AuthTokens {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

/// Result of a successful code or Google verification
#[derive(Debug, Serialize)]
pub struct VerifiedLogin {
    pub user: User,
    pub tokens: AuthTokens,
}

impl AuthService {
    /// Create a new AuthService instance
    pub fn new(db: PgPool, config: &Config) -> Self {
        let default_new_user_role = config
            .shop
            .default_new_user_role
            .parse()
            .unwrap_or(UserRole::Staff);

        Self {
            db,
            jwt_secret: config.jwt.secret.clone(),
            access_token_expiry: config.jwt.access_token_expiry,
            refresh_token_expiry: config.jwt.refresh_token_expiry,
            login_code: config.login_code.clone(),
            default_new_user_role,
        }
    }

    // ========================================================================
    // Login code issuance
    // ========================================================================

    /// Issue a login code for an email and persist it
    ///
    /// The email does not have to belong to an existing account; when it
    /// does, the record links to it. Colliding codes across emails are
    /// acceptable and not checked.
    pub async fn issue_code(&self, email: &str, now: DateTime<Utc>) -> AppResult<LoginCode> {
        let email = normalize_email(email);
        shared::validation::validate_email(&email)
            .map_err(|msg| AppError::Validation {
                field: "email".to_string(),
                message: msg.to_string(),
            })?;

        // Link to an existing account without creating one
        let user_id = sqlx::query_scalar::<_, Uuid>(
            "SELECT id FROM users WHERE LOWER(email) = $1",
        )
        .bind(&email)
        .fetch_optional(&self.db)
        .await?;

        let code = generate_code(self.login_code.code_length);
        let expires_at = now + Duration::minutes(self.login_code.expire_minutes);

        let record = sqlx::query_as::<_, LoginCode>(
            r#"
            INSERT INTO login_codes (email, user_id, code, created_at, expires_at, max_attempts)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, email, user_id, code, created_at, expires_at, used, attempts,
                      max_attempts, locked_until
            "#,
        )
        .bind(&email)
        .bind(user_id)
        .bind(&code)
        .bind(now)
        .bind(expires_at)
        .bind(self.login_code.max_attempts)
        .fetch_one(&self.db)
        .await?;

        Ok(record)
    }

    /// Issue a code and hand it to the delivery channel
    ///
    /// The record is persisted before delivery is attempted; when delivery
    /// fails the record is deleted again so unusable codes do not pile up.
    pub async fn request_code(
        &self,
        email: &str,
        sender: &EmailSender,
        now: DateTime<Utc>,
    ) -> AppResult<LoginCode> {
        let record = self.issue_code(email, now).await?;

        if let Err(send_err) = sender
            .send_login_code(&record.email, &record.code, self.login_code.expire_minutes)
            .await
        {
            if let Err(delete_err) = sqlx::query("DELETE FROM login_codes WHERE id = $1")
                .bind(record.id)
                .execute(&self.db)
                .await
            {
                tracing::error!(
                    "Failed to delete login code after delivery error: {}",
                    delete_err
                );
            }
            tracing::warn!("Login code delivery failed for {}: {}", record.email, send_err);
            return Err(send_err);
        }

        Ok(record)
    }

    // ========================================================================
    // Login code verification
    // ========================================================================

    /// Verify an email + code pair
    ///
    /// On success the code is consumed, an account is resolved or
    /// provisioned, and a token pair is minted. `now` is passed explicitly;
    /// expiry is evaluated here, never by a timer.
    pub async fn verify_code(
        &self,
        email: &str,
        submitted_code: &str,
        now: DateTime<Utc>,
    ) -> AppResult<VerifiedLogin> {
        let email = normalize_email(email);
        let submitted_code = submitted_code.trim();

        // Newest record matching email + code exactly
        let record = sqlx::query_as::<_, LoginCode>(
            r#"
            SELECT id, email, user_id, code, created_at, expires_at, used, attempts,
                   max_attempts, locked_until
            FROM login_codes
            WHERE LOWER(email) = $1 AND code = $2
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(&email)
        .bind(submitted_code)
        .fetch_optional(&self.db)
        .await?;

        let record = match record {
            Some(record) => record,
            None => {
                // Wrong code: the newest code for this email takes the strike
                self.penalize_latest_code(&email, now).await?;
                return Err(AppError::CodeNoMatch);
            }
        };

        // An already-locked record is rejected without a further strike, so
        // hammering it cannot extend the lockout indefinitely
        if record.is_locked(now) {
            return Err(AppError::CodeLocked);
        }

        if !record.is_valid(now) {
            return Err(AppError::CodeExpiredOrUsed);
        }

        // Accept path: consume the code and provision the account in one
        // transaction. The locking read makes a concurrent verify of the
        // same record observe used = true and fail.
        let mut tx = self.db.begin().await?;

        let locked = sqlx::query_as::<_, LoginCode>(
            r#"
            SELECT id, email, user_id, code, created_at, expires_at, used, attempts,
                   max_attempts, locked_until
            FROM login_codes
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(record.id)
        .fetch_one(&mut *tx)
        .await?;

        if locked.is_locked(now) {
            return Err(AppError::CodeLocked);
        }
        if !locked.is_valid(now) {
            return Err(AppError::CodeExpiredOrUsed);
        }

        sqlx::query("UPDATE login_codes SET used = true WHERE id = $1")
            .bind(locked.id)
            .execute(&mut *tx)
            .await?;

        let user =
            Self::find_or_create_user(&mut *tx, &email, self.default_new_user_role).await?;

        if !user.is_active {
            return Err(AppError::Unauthorized("Account is disabled".to_string()));
        }

        if locked.user_id.is_none() {
            sqlx::query("UPDATE login_codes SET user_id = $1 WHERE id = $2")
                .bind(user.id)
                .bind(locked.id)
                .execute(&mut *tx)
                .await?;
        }

        sqlx::query("UPDATE users SET last_login_at = $1 WHERE id = $2")
            .bind(now)
            .bind(user.id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        let tokens = self.generate_tokens(&user)?;
        self.store_refresh_token(user.id, &tokens.refresh_token).await?;

        Ok(VerifiedLogin { user, tokens })
    }

    /// Apply a failed-attempt strike to the newest code for an email
    ///
    /// Read-modify-write under a row lock so racing failures cannot
    /// under-count.
    async fn penalize_latest_code(&self, email: &str, now: DateTime<Utc>) -> AppResult<()> {
        let mut tx = self.db.begin().await?;

        let latest = sqlx::query_as::<_, LoginCode>(
            r#"
            SELECT id, email, user_id, code, created_at, expires_at, used, attempts,
                   max_attempts, locked_until
            FROM login_codes
            WHERE LOWER(email) = $1
            ORDER BY created_at DESC
            LIMIT 1
            FOR UPDATE
            "#,
        )
        .bind(email)
        .fetch_optional(&mut *tx)
        .await?;

        if let Some(latest) = latest {
            let (attempts, locked_until) = apply_failed_attempt(
                latest.attempts,
                latest.max_attempts,
                now,
                self.login_code.lock_minutes,
            );

            sqlx::query(
                "UPDATE login_codes SET attempts = $1, locked_until = COALESCE($2, locked_until) \
                 WHERE id = $3",
            )
            .bind(attempts)
            .bind(locked_until)
            .bind(latest.id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// Delete used codes and codes past the retention window
    ///
    /// Idempotent; safe to run on any cadence.
    pub async fn cleanup_codes(&self, now: DateTime<Utc>) -> AppResult<u64> {
        let older_than = now - Duration::days(self.login_code.cleanup_days);

        let result = sqlx::query("DELETE FROM login_codes WHERE used = true OR created_at < $1")
            .bind(older_than)
            .execute(&self.db)
            .await?;

        Ok(result.rows_affected())
    }

    // ========================================================================
    // Google sign-in
    // ========================================================================

    /// Sign in with a verified Google identity
    ///
    /// Provisions an account exactly like code verification does.
    pub async fn google_auth(
        &self,
        identity: &GoogleIdentity,
        now: DateTime<Utc>,
    ) -> AppResult<VerifiedLogin> {
        let email = normalize_email(&identity.email);

        let mut tx = self.db.begin().await?;
        let user =
            Self::find_or_create_user(&mut *tx, &email, self.default_new_user_role).await?;

        if !user.is_active {
            return Err(AppError::Unauthorized("Account is disabled".to_string()));
        }

        sqlx::query("UPDATE users SET last_login_at = $1 WHERE id = $2")
            .bind(now)
            .bind(user.id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        let tokens = self.generate_tokens(&user)?;
        self.store_refresh_token(user.id, &tokens.refresh_token).await?;

        Ok(VerifiedLogin { user, tokens })
    }

    // ========================================================================
    // Password login
    // ========================================================================

    /// Authenticate a user with email and an admin-set password
    pub async fn login(&self, email: &str, password: &str) -> AppResult<VerifiedLogin> {
        let email = normalize_email(email);

        let row = sqlx::query_as::<_, (Uuid, Option<String>, bool)>(
            "SELECT id, password_hash, is_active FROM users WHERE LOWER(email) = $1",
        )
        .bind(&email)
        .fetch_optional(&self.db)
        .await?
        .ok_or(AppError::InvalidCredentials)?;

        let (user_id, password_hash, is_active) = row;

        if !is_active {
            return Err(AppError::Unauthorized("Account is disabled".to_string()));
        }

        // Accounts without a password only sign in via code or Google
        let password_hash = password_hash.ok_or(AppError::InvalidCredentials)?;

        let valid = verify(password, &password_hash)
            .map_err(|e| AppError::Internal(format!("Password verification failed: {}", e)))?;

        if !valid {
            return Err(AppError::InvalidCredentials);
        }

        sqlx::query("UPDATE users SET last_login_at = NOW() WHERE id = $1")
            .bind(user_id)
            .execute(&self.db)
            .await?;

        let user = self.get_user(user_id).await?;
        let tokens = self.generate_tokens(&user)?;
        self.store_refresh_token(user.id, &tokens.refresh_token).await?;

        Ok(VerifiedLogin { user, tokens })
    }

    // ========================================================================
    // Tokens
    // ========================================================================

    /// Refresh access token using refresh token
    pub async fn refresh_token(&self, refresh_token: &str) -> AppResult<AuthTokens> {
        let token_hash = Self::hash_token(refresh_token);

        let user_id = sqlx::query_scalar::<_, Uuid>(
            r#"
            SELECT rt.user_id
            FROM refresh_tokens rt
            JOIN users u ON u.id = rt.user_id
            WHERE rt.token_hash = $1
              AND rt.expires_at > NOW()
              AND rt.revoked_at IS NULL
              AND u.is_active = true
            "#,
        )
        .bind(&token_hash)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| {
            AppError::Unauthorized("Invalid or expired refresh token".to_string())
        })?;

        // Revoke old refresh token
        sqlx::query("UPDATE refresh_tokens SET revoked_at = NOW() WHERE token_hash = $1")
            .bind(&token_hash)
            .execute(&self.db)
            .await?;

        let user = self.get_user(user_id).await?;
        let tokens = self.generate_tokens(&user)?;
        self.store_refresh_token(user.id, &tokens.refresh_token).await?;

        Ok(tokens)
    }

    /// Generate access and refresh tokens for a user
    fn generate_tokens(&self, user: &User) -> AppResult<AuthTokens> {
        let now = Utc::now();
        let access_exp = now + Duration::seconds(self.access_token_expiry);

        let access_claims = Claims {
            sub: user.id.to_string(),
            email: user.email.clone(),
            role: user.role.as_str().to_string(),
            exp: access_exp.timestamp(),
            iat: now.timestamp(),
        };

        let access_token = encode(
            &Header::default(),
            &access_claims,
            &EncodingKey::from_secret(self.jwt_secret.as_bytes()),
        )
        .map_err(|e| AppError::Internal(format!("Token generation failed: {}", e)))?;

        // Refresh token (opaque random token, stored hashed)
        let refresh_token = Uuid::new_v4().to_string();

        Ok(AuthTokens {
            access_token,
            refresh_token,
            token_type: "Bearer".to_string(),
            expires_in: self.access_token_expiry,
        })
    }

    /// Store refresh token in database
    async fn store_refresh_token(&self, user_id: Uuid, token: &str) -> AppResult<()> {
        let token_hash = Self::hash_token(token);
        let expires_at = Utc::now() + Duration::seconds(self.refresh_token_expiry);

        sqlx::query(
            "INSERT INTO refresh_tokens (user_id, token_hash, expires_at) VALUES ($1, $2, $3)",
        )
        .bind(user_id)
        .bind(&token_hash)
        .bind(expires_at)
        .execute(&self.db)
        .await?;

        Ok(())
    }

    /// Hash a token for storage
    fn hash_token(token: &str) -> String {
        let digest = Sha256::digest(token.as_bytes());
        format!("{:x}", digest)
    }

    // ========================================================================
    // Accounts
    // ========================================================================

    /// Resolve an account by case-insensitive email, provisioning one with
    /// the default role and an email-derived username when absent
    async fn find_or_create_user(
        conn: &mut PgConnection,
        email: &str,
        default_role: UserRole,
    ) -> AppResult<User> {
        let query = format!("SELECT {} FROM users WHERE LOWER(email) = $1", USER_COLUMNS);
        let existing = sqlx::query_as::<_, User>(&query)
            .bind(email)
            .fetch_optional(&mut *conn)
            .await?;

        if let Some(user) = existing {
            return Ok(user);
        }

        let username = username_from_email(email);
        let insert = format!(
            "INSERT INTO users (email, username, role) VALUES ($1, $2, $3) RETURNING {}",
            USER_COLUMNS
        );
        let user = sqlx::query_as::<_, User>(&insert)
            .bind(email)
            .bind(&username)
            .bind(default_role)
            .fetch_one(&mut *conn)
            .await?;

        Ok(user)
    }

    /// Load a user by id
    pub async fn get_user(&self, user_id: Uuid) -> AppResult<User> {
        let query = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);
        let user = sqlx::query_as::<_, User>(&query)
            .bind(user_id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound("User".to_string()))?;

        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_code(now: DateTime<Utc>) -> LoginCode {
        LoginCode {
            id: Uuid::new_v4(),
            email: "user@example.com".to_string(),
            user_id: None,
            code: "123456".to_string(),
            created_at: now,
            expires_at: now + Duration::minutes(15),
            used: false,
            attempts: 0,
            max_attempts: 5,
            locked_until: None,
        }
    }

    #[test]
    fn test_generated_code_shape() {
        for length in [4usize, 6, 8] {
            let code = generate_code(length);
            assert_eq!(code.len(), length);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[test]
    fn test_fresh_code_is_valid() {
        let now = Utc::now();
        let code = sample_code(now);
        assert!(code.is_valid(now));
        assert!(!code.is_locked(now));
    }

    #[test]
    fn test_used_code_is_invalid() {
        let now = Utc::now();
        let mut code = sample_code(now);
        code.used = true;
        assert!(!code.is_valid(now));
    }

    #[test]
    fn test_expiry_boundary_is_strict() {
        let now = Utc::now();
        let code = sample_code(now);
        // One tick before expiry: valid. At expiry: invalid.
        assert!(code.is_valid(code.expires_at - Duration::seconds(1)));
        assert!(!code.is_valid(code.expires_at));
        assert!(!code.is_valid(code.expires_at + Duration::seconds(1)));
    }

    #[test]
    fn test_lockout_window() {
        let now = Utc::now();
        let mut code = sample_code(now);
        code.locked_until = Some(now + Duration::minutes(15));

        assert!(code.is_locked(now));
        assert!(!code.is_valid(now));

        // Exactly at the end of the window the code is usable again
        let after = now + Duration::minutes(15);
        assert!(!code.is_locked(after));
        assert!(code.is_valid(after));
    }

    #[test]
    fn test_attempts_below_threshold_do_not_lock() {
        let now = Utc::now();
        let (attempts, locked_until) = apply_failed_attempt(3, 5, now, 15);
        assert_eq!(attempts, 4);
        assert!(locked_until.is_none());
    }

    #[test]
    fn test_attempt_at_threshold_locks() {
        let now = Utc::now();
        let (attempts, locked_until) = apply_failed_attempt(4, 5, now, 15);
        assert_eq!(attempts, 5);
        assert_eq!(locked_until, Some(now + Duration::minutes(15)));
    }

    #[test]
    fn test_attempt_beyond_threshold_still_reports_lock() {
        let now = Utc::now();
        let (attempts, locked_until) = apply_failed_attempt(7, 5, now, 15);
        assert_eq!(attempts, 8);
        assert!(locked_until.is_some());
    }
}
