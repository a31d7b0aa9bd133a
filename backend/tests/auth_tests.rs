//! Authentication tests
//!
//! Property-based and unit tests for the one-time login code rules:
//! email normalization, code shape, attempt counting and lockout, and the
//! strict expiry boundary.

use chrono::{DateTime, Duration, Utc};
use proptest::prelude::*;

use shared::validation::{normalize_email, username_from_email, validate_email, validate_login_code};

// ============================================================================
// Property Test Strategies
// ============================================================================

/// Generate valid email addresses
fn email_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z]{3,10}@[a-z]{3,8}\\.(com|org|net)"
}

/// Generate six-digit numeric codes
fn code_strategy() -> impl Strategy<Value = String> {
    "[0-9]{6}"
}

// ============================================================================
// A minimal mirror of the login-code state used to exercise the policy
// ============================================================================

#[derive(Debug, Clone)]
struct CodeState {
    expires_at: DateTime<Utc>,
    used: bool,
    attempts: i32,
    max_attempts: i32,
    locked_until: Option<DateTime<Utc>>,
}

impl CodeState {
    fn fresh(now: DateTime<Utc>, ttl_minutes: i64, max_attempts: i32) -> Self {
        Self {
            expires_at: now + Duration::minutes(ttl_minutes),
            used: false,
            attempts: 0,
            max_attempts,
            locked_until: None,
        }
    }

    fn is_valid(&self, now: DateTime<Utc>) -> bool {
        !self.used
            && now < self.expires_at
            && self.locked_until.map_or(true, |until| now >= until)
    }

    /// One failed verification against this record
    fn register_attempt(&mut self, now: DateTime<Utc>, lock_minutes: i64) {
        self.attempts += 1;
        if self.attempts >= self.max_attempts {
            self.locked_until = Some(now + Duration::minutes(lock_minutes));
        }
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================

proptest! {
    /// Generated emails pass validation and normalize idempotently
    #[test]
    fn test_email_normalization_idempotent(email in email_strategy()) {
        prop_assert!(validate_email(&email).is_ok());

        let once = normalize_email(&email);
        let twice = normalize_email(&once);
        prop_assert_eq!(&once, &twice);

        // Case differences disappear after normalization
        prop_assert_eq!(normalize_email(&email.to_uppercase()), once);
    }

    /// Six-digit codes validate against the configured length and nothing else
    #[test]
    fn test_code_shape(code in code_strategy()) {
        prop_assert!(validate_login_code(&code, 6).is_ok());
        prop_assert!(validate_login_code(&code, 8).is_err());
    }

    /// The username is always the local part of the email
    #[test]
    fn test_username_derivation(email in email_strategy()) {
        let username = username_from_email(&email);
        prop_assert!(!username.is_empty());
        prop_assert!(!username.contains('@'));
        prop_assert!(email.starts_with(&username));
    }

    /// Attempts only ever increase, and the lock engages exactly at the
    /// configured ceiling
    #[test]
    fn test_lockout_engages_at_max_attempts(
        max_attempts in 1i32..10,
        failures in 1usize..20,
    ) {
        let now = Utc::now();
        let mut state = CodeState::fresh(now, 15, max_attempts);
        let mut previous_attempts = 0;

        for i in 0..failures {
            state.register_attempt(now, 15);
            prop_assert!(state.attempts > previous_attempts);
            previous_attempts = state.attempts;

            let should_be_locked = (i as i32 + 1) >= max_attempts;
            prop_assert_eq!(state.locked_until.is_some(), should_be_locked);
        }
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

/// A verification at exactly `expires_at` is expired (strict `<`)
#[test]
fn test_expiry_boundary_is_strict() {
    let now = Utc::now();
    let state = CodeState::fresh(now, 15, 5);

    assert!(state.is_valid(now));
    assert!(state.is_valid(state.expires_at - Duration::milliseconds(1)));
    assert!(!state.is_valid(state.expires_at));
}

/// A used code is never valid again, regardless of time
#[test]
fn test_used_code_stays_consumed() {
    let now = Utc::now();
    let mut state = CodeState::fresh(now, 15, 5);
    state.used = true;

    assert!(!state.is_valid(now));
    assert!(!state.is_valid(now + Duration::minutes(5)));
}

/// Five wrong attempts lock the code; the correct code is rejected inside
/// the lockout window and accepted after it ends
#[test]
fn test_lockout_scenario() {
    let now = Utc::now();
    let mut state = CodeState::fresh(now, 60, 5);

    for _ in 0..5 {
        state.register_attempt(now, 15);
    }

    // Locked: even the correct code would be rejected
    assert!(!state.is_valid(now));
    assert!(!state.is_valid(now + Duration::minutes(14)));

    // Lock expires before the code does, so it becomes usable again
    assert!(state.is_valid(now + Duration::minutes(15)));
}

/// Attempts below the ceiling never set a lock
#[test]
fn test_attempts_below_ceiling_do_not_lock() {
    let now = Utc::now();
    let mut state = CodeState::fresh(now, 15, 5);

    for _ in 0..4 {
        state.register_attempt(now, 15);
    }

    assert_eq!(state.attempts, 4);
    assert!(state.locked_until.is_none());
    assert!(state.is_valid(now));
}

/// Normalized emails compare equal however the user typed them
#[test]
fn test_case_insensitive_matching() {
    assert_eq!(
        normalize_email("Shop.Owner@Example.COM"),
        normalize_email("shop.owner@example.com")
    );
    assert_eq!(normalize_email("  padded@example.com  "), "padded@example.com");
}
