//! Outbound email delivery
//!
//! Thin SMTP wrapper used as the delivery channel for login codes,
//! notification fan-out and emailed reports.

use lettre::{
    message::header::ContentType,
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};

use crate::config::SmtpConfig;
use crate::error::{AppError, AppResult};

/// SMTP email sender
#[derive(Clone)]
pub struct EmailSender {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from_address: String,
    shop_name: String,
}

impl EmailSender {
    /// Create a sender from SMTP configuration
    ///
    /// Without a username the transport connects unauthenticated on port 25,
    /// which matches local development relays.
    pub fn new(config: &SmtpConfig, shop_name: String) -> AppResult<Self> {
        let mailer = if config.username.is_empty() {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.host).build()
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)
                .map_err(|e| AppError::Configuration(format!("Invalid SMTP relay: {}", e)))?
                .credentials(Credentials::new(
                    config.username.clone(),
                    config.password.clone(),
                ))
                .build()
        };

        Ok(Self {
            mailer,
            from_address: config.from_address.clone(),
            shop_name,
        })
    }

    /// Send a plain-text email
    pub async fn send(&self, to: &str, subject: &str, body: &str) -> AppResult<()> {
        let message = Message::builder()
            .from(
                self.from_address
                    .parse()
                    .map_err(|e| AppError::Configuration(format!("Invalid from address: {}", e)))?,
            )
            .to(to
                .parse()
                .map_err(|e| AppError::DeliveryFailed(format!("Invalid recipient: {}", e)))?)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string())
            .map_err(|e| AppError::DeliveryFailed(format!("Could not build message: {}", e)))?;

        self.mailer
            .send(message)
            .await
            .map_err(|e| AppError::DeliveryFailed(e.to_string()))?;

        Ok(())
    }

    /// Send a login code to the user
    pub async fn send_login_code(&self, to: &str, code: &str, minutes_valid: i64) -> AppResult<()> {
        let subject = format!("{} — Your login code", self.shop_name);
        let body = format!(
            "Your login code is: {}\n\n\
             This code is valid for {} minutes.\n\
             If you did not request this code, ignore this email.\n\n\
             — The Team",
            code, minutes_valid
        );
        self.send(to, &subject, &body).await
    }
}
