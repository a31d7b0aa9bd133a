//! AI reporting service
//!
//! Summarizes sales and stock data into prompts for a locally hosted LLM,
//! stores the model's JSON reports, and runs a rule-based anomaly scan.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::external::ollama::{extract_json, OllamaClient};
use crate::external::EmailSender;
use shared::models::{AiReport, AiReportType};

/// AI reporting service
#[derive(Clone)]
pub struct AiReportService {
    db: PgPool,
    ollama: OllamaClient,
}

/// Per-product activity used to classify stock movers
#[derive(Debug, sqlx::FromRow)]
struct ProductActivityRow {
    name: String,
    quantity: i32,
    low_stock_threshold: i32,
    log_count: i64,
}

/// Per-product sales volume for the sales prompt
#[derive(Debug, sqlx::FromRow)]
struct SalesVolumeRow {
    name: String,
    units_sold: i64,
    revenue: Decimal,
}

/// Stock classified for the analysis prompt
#[derive(Debug, Default)]
pub struct StockAnalysis {
    pub low_stock: Vec<String>,
    pub best_sellers: Vec<String>,
    pub dead_stock: Vec<String>,
}

/// Stock-log count above which a product counts as a best seller
const BEST_SELLER_LOG_COUNT: i64 = 20;

/// Build the stock-analysis prompt handed to the model
pub fn build_stock_prompt(date: chrono::NaiveDate, analysis: &StockAnalysis) -> String {
    format!(
        "You are a professional inventory AI analyst.\n\
         \n\
         DATE: {}\n\
         \n\
         LOW STOCK ITEMS:\n{}\n\
         \n\
         BEST SELLING PRODUCTS:\n{}\n\
         \n\
         DEAD STOCK PRODUCTS:\n{}\n\
         \n\
         TASK:\n\
         1. Generate a professional business intelligence report.\n\
         2. Give risk warnings.\n\
         3. Provide reorder recommendations.\n\
         4. Suggest actions for dead stock.\n\
         Respond with a single JSON object.",
        date,
        join_or_none(&analysis.low_stock),
        join_or_none(&analysis.best_sellers),
        join_or_none(&analysis.dead_stock),
    )
}

/// Build the sales-summary prompt handed to the model
pub fn build_sales_prompt(date: chrono::NaiveDate, days: i64, lines: &[String]) -> String {
    format!(
        "You are a professional retail sales analyst.\n\
         \n\
         DATE: {}\n\
         PERIOD: last {} days\n\
         \n\
         SALES BY PRODUCT:\n{}\n\
         \n\
         TASK:\n\
         1. Summarize sales performance.\n\
         2. Call out unusually strong or weak products.\n\
         3. Recommend pricing or restocking actions.\n\
         Respond with a single JSON object.",
        date,
        days,
        join_or_none(lines),
    )
}

fn join_or_none(items: &[String]) -> String {
    if items.is_empty() {
        "None".to_string()
    } else {
        items.join(", ")
    }
}

impl AiReportService {
    /// Create a new AiReportService instance
    pub fn new(db: PgPool, ollama: OllamaClient) -> Self {
        Self { db, ollama }
    }

    // ========================================================================
    // Data gathering
    // ========================================================================

    /// Classify products into low-stock, best-seller and dead-stock buckets
    pub async fn analyze_stock(&self) -> AppResult<StockAnalysis> {
        let rows = sqlx::query_as::<_, ProductActivityRow>(
            r#"
            SELECT p.name, p.quantity, p.low_stock_threshold, COUNT(sl.id) AS log_count
            FROM products p
            LEFT JOIN stock_logs sl ON sl.product_id = p.id
            GROUP BY p.id, p.name, p.quantity, p.low_stock_threshold
            ORDER BY p.name
            "#,
        )
        .fetch_all(&self.db)
        .await?;

        let mut analysis = StockAnalysis::default();
        for row in rows {
            if row.quantity <= row.low_stock_threshold {
                analysis
                    .low_stock
                    .push(format!("{} (qty={})", row.name, row.quantity));
            }
            if row.log_count > BEST_SELLER_LOG_COUNT {
                analysis.best_sellers.push(row.name.clone());
            }
            if row.log_count == 0 {
                analysis.dead_stock.push(row.name);
            }
        }

        Ok(analysis)
    }

    /// Per-product sales lines for the last `days` days
    async fn sales_lines(&self, days: i64) -> AppResult<Vec<String>> {
        let rows = sqlx::query_as::<_, SalesVolumeRow>(
            r#"
            SELECT p.name,
                   COALESCE(SUM(s.quantity), 0) AS units_sold,
                   COALESCE(SUM(s.total_price), 0) AS revenue
            FROM sales s
            JOIN products p ON p.id = s.product_id
            WHERE s.created_at >= NOW() - ($1 * INTERVAL '1 day')
            GROUP BY p.name
            ORDER BY units_sold DESC
            "#,
        )
        .bind(days)
        .fetch_all(&self.db)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| format!("{}: {} units, revenue {}", r.name, r.units_sold, r.revenue))
            .collect())
    }

    // ========================================================================
    // Report generation
    // ========================================================================

    /// Generate and persist a stock analysis report
    pub async fn generate_stock_report(&self, now: DateTime<Utc>) -> AppResult<AiReport> {
        let analysis = self.analyze_stock().await?;
        let prompt = build_stock_prompt(now.date_naive(), &analysis);
        let raw = self.ollama.generate(&prompt).await?;
        self.store_report(AiReportType::Stock, raw).await
    }

    /// Generate and persist a sales report over the last `days` days
    pub async fn generate_sales_report(
        &self,
        days: i64,
        now: DateTime<Utc>,
    ) -> AppResult<AiReport> {
        let lines = self.sales_lines(days).await?;
        let prompt = build_sales_prompt(now.date_naive(), days, &lines);
        let raw = self.ollama.generate(&prompt).await?;
        self.store_report(AiReportType::Sales, raw).await
    }

    /// Persist a report, parsing the model output as JSON when possible
    async fn store_report(&self, report_type: AiReportType, raw: String) -> AppResult<AiReport> {
        let data = extract_json(&raw).unwrap_or_else(|_| serde_json::json!({}));

        let report = sqlx::query_as::<_, AiReport>(
            r#"
            INSERT INTO ai_reports (report_type, raw, data)
            VALUES ($1, $2, $3)
            RETURNING id, report_type, raw, data, created_at
            "#,
        )
        .bind(report_type)
        .bind(&raw)
        .bind(&data)
        .fetch_one(&self.db)
        .await?;

        Ok(report)
    }

    /// List stored reports, newest first
    pub async fn list_reports(&self, limit: i64) -> AppResult<Vec<AiReport>> {
        let reports = sqlx::query_as::<_, AiReport>(
            r#"
            SELECT id, report_type, raw, data, created_at
            FROM ai_reports
            ORDER BY created_at DESC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.db)
        .await?;

        Ok(reports)
    }

    /// Get a stored report by id
    pub async fn get_report(&self, report_id: Uuid) -> AppResult<AiReport> {
        let report = sqlx::query_as::<_, AiReport>(
            "SELECT id, report_type, raw, data, created_at FROM ai_reports WHERE id = $1",
        )
        .bind(report_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("AI report".to_string()))?;

        Ok(report)
    }

    // ========================================================================
    // Anomaly scan
    // ========================================================================

    /// Rule-based anomaly scan over stock levels and the last day of sales
    pub async fn detect_anomalies(&self) -> AppResult<Vec<String>> {
        let mut anomalies = Vec::new();

        let negative = sqlx::query_scalar::<_, String>(
            "SELECT name FROM products WHERE quantity < 0 ORDER BY name",
        )
        .fetch_all(&self.db)
        .await?;
        for name in negative {
            anomalies.push(format!("NEGATIVE STOCK: {}", name));
        }

        // Sales in the last day far above the low-stock threshold suggest
        // mis-entry or fraud
        let fast_movers = sqlx::query_scalar::<_, String>(
            r#"
            SELECT p.name
            FROM products p
            JOIN sales s ON s.product_id = p.id
            WHERE s.created_at >= NOW() - INTERVAL '1 day'
            GROUP BY p.id, p.name, p.low_stock_threshold
            HAVING SUM(s.quantity) > p.low_stock_threshold * 5
            ORDER BY p.name
            "#,
        )
        .fetch_all(&self.db)
        .await?;
        for name in fast_movers {
            anomalies.push(format!("POSSIBLE FRAUD: {} sold unusually fast", name));
        }

        Ok(anomalies)
    }

    /// Run the anomaly scan and persist the findings as a report
    pub async fn generate_anomaly_report(&self) -> AppResult<AiReport> {
        let anomalies = self.detect_anomalies().await?;
        let raw = anomalies.join("\n");

        let report = sqlx::query_as::<_, AiReport>(
            r#"
            INSERT INTO ai_reports (report_type, raw, data)
            VALUES ($1, $2, $3)
            RETURNING id, report_type, raw, data, created_at
            "#,
        )
        .bind(AiReportType::Anomaly)
        .bind(&raw)
        .bind(serde_json::json!({ "anomalies": anomalies }))
        .fetch_one(&self.db)
        .await?;

        Ok(report)
    }

    // ========================================================================
    // Scheduled delivery
    // ========================================================================

    /// Generate the daily sales report and email it to every admin
    ///
    /// Exposed as a trigger endpoint; any external scheduler can drive it.
    pub async fn daily_sales_report(
        &self,
        sender: &EmailSender,
        now: DateTime<Utc>,
    ) -> AppResult<AiReport> {
        let report = self.generate_sales_report(30, now).await?;

        let recipients = sqlx::query_scalar::<_, String>(
            "SELECT email FROM users WHERE role = 'admin' AND is_active = true",
        )
        .fetch_all(&self.db)
        .await?;

        let subject = format!("Daily AI Report - {}", now.date_naive());
        let body = format!(
            "Latest AI sales report:\n\n{}",
            serde_json::to_string_pretty(&report.data).unwrap_or_else(|_| report.raw.clone())
        );

        for email in recipients {
            if let Err(e) = sender.send(&email, &subject, &body).await {
                tracing::warn!("Daily AI report email to {} failed: {}", email, e);
            }
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_stock_prompt_lists_sections() {
        let analysis = StockAnalysis {
            low_stock: vec!["Beans (qty=2)".to_string()],
            best_sellers: vec!["Milk".to_string()],
            dead_stock: vec![],
        };
        let prompt = build_stock_prompt(NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(), &analysis);

        assert!(prompt.contains("DATE: 2025-06-01"));
        assert!(prompt.contains("Beans (qty=2)"));
        assert!(prompt.contains("Milk"));
        // Empty sections degrade to an explicit None
        assert!(prompt.contains("DEAD STOCK PRODUCTS:\nNone"));
        assert!(prompt.contains("single JSON object"));
    }

    #[test]
    fn test_sales_prompt_mentions_period() {
        let lines = vec!["Beans: 10 units, revenue 25.00".to_string()];
        let prompt = build_sales_prompt(NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(), 30, &lines);

        assert!(prompt.contains("last 30 days"));
        assert!(prompt.contains("Beans: 10 units"));
    }
}
