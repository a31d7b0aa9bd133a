//! AI-generated report model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Kinds of AI reports the platform can generate
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "ai_report_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AiReportType {
    Sales,
    Stock,
    Anomaly,
}

impl AiReportType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AiReportType::Sales => "sales",
            AiReportType::Stock => "stock",
            AiReportType::Anomaly => "anomaly",
        }
    }
}

/// A stored AI report: the raw model output plus the parsed JSON payload
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct AiReport {
    pub id: Uuid,
    pub report_type: AiReportType,
    /// Raw model output, never null
    pub raw: String,
    /// Parsed JSON payload, `{}` when the output was not valid JSON
    pub data: serde_json::Value,
    pub created_at: DateTime<Utc>,
}
