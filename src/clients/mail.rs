//! Transactional email through the Resend REST API.

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, info, instrument};

#[derive(Debug, Error)]
pub enum MailError {
    #[error("RESEND_API_KEY not configured")]
    NotConfigured,

    #[error("Email request failed: {0}")]
    Request(String),

    #[error("{0}")]
    Api(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutgoingEmail {
    pub from: String,
    pub to: Vec<String>,
    pub subject: String,
    pub html: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    /// Whether credentials are present; callers report a configuration
    /// error before doing any work when this is false.
    fn is_configured(&self) -> bool;

    async fn send(&self, email: &OutgoingEmail) -> Result<(), MailError>;
}

#[derive(Debug, Clone)]
pub struct ResendClient {
    client: Client,
    api_base: String,
    api_key: Option<SecretString>,
}

#[derive(Deserialize)]
struct ResendError {
    message: Option<String>,
}

impl ResendClient {
    pub fn new(api_base: impl Into<String>, api_key: Option<SecretString>) -> Self {
        Self {
            client: Client::new(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
            api_key,
        }
    }
}

#[async_trait]
impl Mailer for ResendClient {
    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    #[instrument(skip(self, email), fields(subject = %email.subject))]
    async fn send(&self, email: &OutgoingEmail) -> Result<(), MailError> {
        let api_key = self.api_key.as_ref().ok_or(MailError::NotConfigured)?;

        let response = self
            .client
            .post(format!("{}/emails", self.api_base))
            .bearer_auth(api_key.expose_secret())
            .json(email)
            .send()
            .await
            .map_err(|e| MailError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .json::<ResendError>()
                .await
                .ok()
                .and_then(|body| body.message)
                .unwrap_or_else(|| "Failed to send email".to_string());
            error!(%status, %message, "email API rejected the message");
            return Err(MailError::Api(message));
        }

        info!(recipients = email.to.len(), "email sent");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_serializes_to_api_shape() {
        let email = OutgoingEmail {
            from: "Shop <noreply@example.fr>".into(),
            to: vec!["camille@example.fr".into()],
            subject: "Bonjour".into(),
            html: "<p>Salut</p>".into(),
        };
        let json = serde_json::to_value(&email).unwrap();
        assert_eq!(json["to"][0], "camille@example.fr");
        assert_eq!(json["subject"], "Bonjour");
        assert_eq!(json["html"], "<p>Salut</p>");
    }

    #[tokio::test]
    async fn unconfigured_client_refuses_to_send() {
        let client = ResendClient::new("http://127.0.0.1:9", None);
        assert!(!client.is_configured());
        let email = OutgoingEmail {
            from: "a@b.fr".into(),
            to: vec!["c@d.fr".into()],
            subject: "s".into(),
            html: String::new(),
        };
        let err = client.send(&email).await.unwrap_err();
        assert!(matches!(err, MailError::NotConfigured));
    }
}
