//! Validation utilities for the Inventory Management Platform

use rust_decimal::Decimal;

// ============================================================================
// General Validations
// ============================================================================

/// Validate email format (basic check)
pub fn validate_email(email: &str) -> Result<(), &'static str> {
    if email.contains('@') && email.contains('.') && email.len() >= 5 {
        Ok(())
    } else {
        Err("Invalid email format")
    }
}

/// Normalize an email for case-insensitive matching and storage
pub fn normalize_email(email: &str) -> String {
    email.trim().to_ascii_lowercase()
}

/// Derive a username from the local part of an email address
pub fn username_from_email(email: &str) -> String {
    email
        .split('@')
        .next()
        .unwrap_or(email)
        .trim()
        .to_string()
}

/// Validate password strength
pub fn validate_password(password: &str) -> Result<(), &'static str> {
    if password.len() < 8 {
        return Err("Password must be at least 8 characters");
    }
    Ok(())
}

// ============================================================================
// Inventory Validations
// ============================================================================

/// Validate SKU format (1-64 chars, alphanumeric plus dash/underscore)
pub fn validate_sku(sku: &str) -> Result<(), &'static str> {
    if sku.is_empty() || sku.len() > 64 {
        return Err("SKU must be 1-64 characters");
    }
    if !sku
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err("SKU must be alphanumeric, dash or underscore only");
    }
    Ok(())
}

/// Validate that a price is non-negative
pub fn validate_price(price: Decimal) -> Result<(), &'static str> {
    if price < Decimal::ZERO {
        return Err("Price cannot be negative");
    }
    Ok(())
}

/// Validate a login code: fixed length, digits only
pub fn validate_login_code(code: &str, expected_length: usize) -> Result<(), &'static str> {
    if code.len() != expected_length {
        return Err("Code has the wrong length");
    }
    if !code.chars().all(|c| c.is_ascii_digit()) {
        return Err("Code must be numeric");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_email_validation() {
        assert!(validate_email("user@example.com").is_ok());
        assert!(validate_email("a@b.co").is_ok());
        assert!(validate_email("no-at-sign").is_err());
        assert!(validate_email("@.").is_err());
    }

    #[test]
    fn test_email_normalization() {
        assert_eq!(normalize_email("  User@Example.COM "), "user@example.com");
    }

    #[test]
    fn test_username_from_email() {
        assert_eq!(username_from_email("jane.doe@example.com"), "jane.doe");
        assert_eq!(username_from_email("weird"), "weird");
    }

    #[test]
    fn test_sku_validation() {
        assert!(validate_sku("SKU-001").is_ok());
        assert!(validate_sku("abc_123").is_ok());
        assert!(validate_sku("").is_err());
        assert!(validate_sku("has space").is_err());
    }

    #[test]
    fn test_price_validation() {
        assert!(validate_price(Decimal::from_str("0.00").unwrap()).is_ok());
        assert!(validate_price(Decimal::from_str("19.99").unwrap()).is_ok());
        assert!(validate_price(Decimal::from_str("-0.01").unwrap()).is_err());
    }

    #[test]
    fn test_login_code_validation() {
        assert!(validate_login_code("123456", 6).is_ok());
        assert!(validate_login_code("12345", 6).is_err());
        assert!(validate_login_code("12345a", 6).is_err());
    }
}
