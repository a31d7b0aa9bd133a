//! Configuration management for the Inventory Management Platform
//!
//! Supports hierarchical configuration loading:
//! 1. Default values in code
//! 2. Configuration files (development.toml, production.toml)
//! 3. Environment variable overrides with INV_ prefix

use config::{ConfigError, Environment, File};
use serde::Deserialize;

/// Main application configuration
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Current environment (development, production)
    pub environment: String,

    /// Server configuration
    pub server: ServerConfig,

    /// Database configuration
    pub database: DatabaseConfig,

    /// JWT authentication configuration
    pub jwt: JwtConfig,

    /// One-time login code configuration
    pub login_code: LoginCodeConfig,

    /// Shop identity used in emails and reports
    pub shop: ShopConfig,

    /// Outbound SMTP configuration
    pub smtp: SmtpConfig,

    /// Google sign-in configuration
    pub google: GoogleConfig,

    /// Ollama LLM endpoint configuration
    pub ollama: OllamaConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    /// Server port
    pub port: u16,

    /// Server host
    pub host: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,

    /// Maximum number of connections in the pool
    pub max_connections: u32,

    /// Minimum number of connections in the pool
    pub min_connections: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct JwtConfig {
    /// Secret key for signing JWT tokens
    pub secret: String,

    /// Access token expiration in seconds
    pub access_token_expiry: i64,

    /// Refresh token expiration in seconds
    pub refresh_token_expiry: i64,
}

/// Knobs for the one-time login code lifecycle
///
/// `max_attempts` is copied into each issued record, so later configuration
/// changes never affect codes already in flight.
#[derive(Debug, Deserialize, Clone)]
pub struct LoginCodeConfig {
    /// Number of digits in a generated code
    pub code_length: usize,

    /// Minutes until a freshly issued code expires
    pub expire_minutes: i64,

    /// Failed verifications before a code locks
    pub max_attempts: i32,

    /// Minutes a locked code stays locked
    pub lock_minutes: i64,

    /// Days after which used/stale codes are swept
    pub cleanup_days: i64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ShopConfig {
    /// Shop name shown in email subjects and report headers
    pub name: String,

    /// Role given to accounts provisioned on first sign-in
    pub default_new_user_role: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SmtpConfig {
    /// SMTP relay host
    pub host: String,

    /// SMTP username
    pub username: String,

    /// SMTP password
    pub password: String,

    /// From address for outbound mail
    pub from_address: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct GoogleConfig {
    /// OAuth client ID the ID token audience must match
    pub client_id: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct OllamaConfig {
    /// Base URL of the Ollama server
    pub base_url: String,

    /// Model name to generate with
    pub model: String,
}

impl Config {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let environment = std::env::var("INV_ENVIRONMENT").unwrap_or_else(|_| "development".into());

        let config = config::Config::builder()
            // Start with default values
            .set_default("environment", environment.clone())?
            .set_default("server.port", 3000)?
            .set_default("server.host", "0.0.0.0")?
            .set_default("database.max_connections", 10)?
            .set_default("database.min_connections", 2)?
            .set_default("jwt.access_token_expiry", 3600)?
            .set_default("jwt.refresh_token_expiry", 604800)?
            .set_default("login_code.code_length", 6)?
            .set_default("login_code.expire_minutes", 15)?
            .set_default("login_code.max_attempts", 5)?
            .set_default("login_code.lock_minutes", 15)?
            .set_default("login_code.cleanup_days", 30)?
            .set_default("shop.name", "Inventory")?
            .set_default("shop.default_new_user_role", "staff")?
            .set_default("smtp.host", "localhost")?
            .set_default("smtp.username", "")?
            .set_default("smtp.password", "")?
            .set_default("smtp.from_address", "noreply@localhost")?
            .set_default("google.client_id", "")?
            .set_default("ollama.base_url", "http://127.0.0.1:11434")?
            .set_default("ollama.model", "llama3")?
            // Load environment-specific config file
            .add_source(File::with_name(&format!("config/{}", environment)).required(false))
            // Override with environment variables (INV_ prefix)
            .add_source(
                Environment::with_prefix("INV")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Whether the server is running in development mode
    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            host: "0.0.0.0".to_string(),
        }
    }
}

impl Default for LoginCodeConfig {
    fn default() -> Self {
        Self {
            code_length: 6,
            expire_minutes: 15,
            max_attempts: 5,
            lock_minutes: 15,
            cleanup_days: 30,
        }
    }
}
