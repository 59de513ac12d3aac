//! Outbound mail — trait seam over the Resend API.
//!
//! DESIGN
//! ======
//! Routes depend on the `Mailer` trait object held in `AppState`, so tests
//! can substitute a mock and local development can run without credentials
//! (codes are logged instead).

use async_trait::async_trait;
use resend_rs::Resend;
use resend_rs::types::CreateEmailBaseOptions;

#[derive(Debug, thiserror::Error)]
pub enum MailerError {
    #[error("mailer not configured: {0}")]
    NotConfigured(&'static str),
    #[error("email delivery failed: {0}")]
    Delivery(String),
}

#[async_trait]
pub trait Mailer: Send + Sync {
    /// Send one HTML email.
    async fn send(&self, to: &str, subject: &str, html: &str) -> Result<(), MailerError>;
}

// =============================================================================
// RESEND
// =============================================================================

pub struct ResendMailer {
    client: Resend,
    from: String,
}

impl ResendMailer {
    /// Build a mailer from `RESEND_API_KEY` and `RESEND_FROM`.
    ///
    /// # Errors
    ///
    /// Returns an error naming the missing variable.
    pub fn from_env() -> Result<Self, MailerError> {
        let api_key = std::env::var("RESEND_API_KEY").map_err(|_| MailerError::NotConfigured("RESEND_API_KEY"))?;
        let from = std::env::var("RESEND_FROM").map_err(|_| MailerError::NotConfigured("RESEND_FROM"))?;
        Ok(Self { client: Resend::new(&api_key), from })
    }
}

#[async_trait]
impl Mailer for ResendMailer {
    async fn send(&self, to: &str, subject: &str, html: &str) -> Result<(), MailerError> {
        let email = CreateEmailBaseOptions::new(&self.from, [to], subject).with_html(html);
        self.client
            .emails
            .send(email)
            .await
            .map_err(|e| MailerError::Delivery(e.to_string()))?;
        Ok(())
    }
}
