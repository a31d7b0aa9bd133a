//! Ollama LLM Client
//!
//! Client for a locally hosted Ollama server used to turn sales and stock
//! data into AI-written reports.

use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::OllamaConfig;
use crate::error::{AppError, AppResult};

/// Client for the Ollama generate API
#[derive(Clone)]
pub struct OllamaClient {
    base_url: String,
    model: String,
    http_client: Client,
}

/// Request body for /api/generate
#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

/// Response body from /api/generate
#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
}

impl OllamaClient {
    /// Create a new Ollama client
    pub fn new(base_url: String, model: String) -> Self {
        let http_client = Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            base_url,
            model,
            http_client,
        }
    }

    /// Create a client from application configuration
    pub fn from_config(config: &OllamaConfig) -> Self {
        Self::new(config.base_url.clone(), config.model.clone())
    }

    /// Send a prompt to Ollama and return the raw model output
    pub async fn generate(&self, prompt: &str) -> AppResult<String> {
        let url = format!("{}/api/generate", self.base_url.trim_end_matches('/'));

        let request = GenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
        };

        let response = self
            .http_client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::AiServiceError(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::AiServiceError(format!(
                "API returned {}: {}",
                status, body
            )));
        }

        let result: GenerateResponse = response
            .json()
            .await
            .map_err(|e| AppError::AiServiceError(format!("Failed to parse response: {}", e)))?;

        Ok(result.response)
    }
}

/// Extract valid JSON from model output even when wrapped in markdown fences
pub fn extract_json(text: &str) -> AppResult<serde_json::Value> {
    let mut cleaned = text.trim();

    // Models frequently wrap JSON in ```json ... ``` blocks
    if let Some(rest) = cleaned.strip_prefix("```json") {
        cleaned = rest;
    } else if let Some(rest) = cleaned.strip_prefix("```") {
        cleaned = rest;
    }
    if let Some(rest) = cleaned.strip_suffix("```") {
        cleaned = rest;
    }

    serde_json::from_str(cleaned.trim())
        .map_err(|_| AppError::AiServiceError("AI response is not valid JSON".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_plain_json() {
        let value = extract_json(r#"{"summary": "ok", "items": [1, 2]}"#).unwrap();
        assert_eq!(value["summary"], "ok");
        assert_eq!(value["items"][1], 2);
    }

    #[test]
    fn test_extract_fenced_json() {
        let text = "```json\n{\"risk\": \"low\"}\n```";
        let value = extract_json(text).unwrap();
        assert_eq!(value["risk"], "low");
    }

    #[test]
    fn test_extract_bare_fenced_json() {
        let text = "```\n{\"a\": 1}\n```";
        let value = extract_json(text).unwrap();
        assert_eq!(value["a"], 1);
    }

    #[test]
    fn test_extract_invalid_json() {
        assert!(extract_json("I am afraid I cannot produce JSON").is_err());
    }
}
