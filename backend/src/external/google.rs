//! Google Sign-In Client
//!
//! Verifies Google ID tokens against the tokeninfo endpoint. The identity
//! provider does the cryptographic work; we only check the audience and that
//! the email is verified.

use reqwest::Client;
use serde::Deserialize;

use crate::config::GoogleConfig;
use crate::error::{AppError, AppResult};

const TOKENINFO_URL: &str = "https://oauth2.googleapis.com/tokeninfo";

/// Client for verifying Google ID tokens
#[derive(Clone)]
pub struct GoogleAuthClient {
    client_id: String,
    http_client: Client,
}

/// Verified identity extracted from a Google ID token
#[derive(Debug, Clone)]
pub struct GoogleIdentity {
    pub email: String,
}

/// Response from the tokeninfo endpoint
///
/// Google returns booleans as strings in this payload.
#[derive(Debug, Deserialize)]
struct TokenInfoResponse {
    #[serde(default)]
    aud: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    email_verified: Option<String>,
}

impl GoogleAuthClient {
    /// Create a new Google auth client
    pub fn new(client_id: String) -> Self {
        let http_client = Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client_id,
            http_client,
        }
    }

    /// Create a client from application configuration
    pub fn from_config(config: &GoogleConfig) -> Self {
        Self::new(config.client_id.clone())
    }

    /// Verify an ID token and return the identity it asserts
    pub async fn verify_id_token(&self, id_token: &str) -> AppResult<GoogleIdentity> {
        let response = self
            .http_client
            .get(TOKENINFO_URL)
            .query(&[("id_token", id_token)])
            .send()
            .await
            .map_err(|e| AppError::GoogleTokenInvalid(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(AppError::GoogleTokenInvalid(
                "Token rejected by Google".to_string(),
            ));
        }

        let info: TokenInfoResponse = response
            .json()
            .await
            .map_err(|e| AppError::GoogleTokenInvalid(format!("Failed to parse response: {}", e)))?;

        if !self.client_id.is_empty() && info.aud != self.client_id {
            return Err(AppError::GoogleTokenInvalid(
                "Token audience mismatch".to_string(),
            ));
        }

        let email = match info.email {
            Some(email) if !email.is_empty() => email,
            _ => {
                return Err(AppError::GoogleTokenInvalid(
                    "Token carries no email".to_string(),
                ))
            }
        };

        if info.email_verified.as_deref() != Some("true") {
            return Err(AppError::GoogleTokenInvalid(
                "Google account email not verified".to_string(),
            ));
        }

        Ok(GoogleIdentity { email })
    }
}
