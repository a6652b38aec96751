//! Send-email hook of the auth provider: verifies the signed payload and
//! delivers the matching transactional email.

use axum::{
    Json,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use secrecy::ExposeSecret;
use thiserror::Error;

use crate::{
    clients::{OutgoingEmail, mail::MailError},
    domain::auth_email::{AuthEmailPayload, EmailAction, action_url, render_html},
    state::AppState,
    webhook::{WebhookError, WebhookVerifier},
};

/// The hook caller expects its own error body rather than the API envelope.
#[derive(Debug, Error)]
pub enum AuthEmailError {
    #[error("Webhook secret not configured")]
    SecretMissing,

    #[error("Resend API key not configured")]
    ApiKeyMissing,

    #[error(transparent)]
    Webhook(#[from] WebhookError),

    #[error("Invalid payload: {0}")]
    Payload(String),

    #[error(transparent)]
    Mail(#[from] MailError),

    #[error("Template error: {0}")]
    Template(#[from] askama::Error),
}

impl AuthEmailError {
    pub fn status(&self) -> StatusCode {
        match self {
            AuthEmailError::SecretMissing | AuthEmailError::ApiKeyMissing => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            _ => StatusCode::UNAUTHORIZED,
        }
    }
}

impl IntoResponse for AuthEmailError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = self.to_string();
        tracing::error!(error = %message, %status, "auth email hook failed");

        let body = if status == StatusCode::INTERNAL_SERVER_ERROR {
            serde_json::json!({ "error": { "message": message } })
        } else {
            serde_json::json!({ "error": { "http_code": 500, "message": message } })
        };
        (status, Json(body)).into_response()
    }
}

pub async fn handle_hook(
    state: &AppState,
    headers: &HeaderMap,
    body: &[u8],
) -> Result<(), AuthEmailError> {
    let secret = state
        .config
        .send_email_hook_secret
        .as_ref()
        .map(|secret| secret.expose_secret())
        .ok_or(AuthEmailError::SecretMissing)?;
    if !state.mailer.is_configured() {
        return Err(AuthEmailError::ApiKeyMissing);
    }

    tracing::info!("received auth email webhook");
    let verifier = WebhookVerifier::from_secret(secret)?;
    verifier.verify(headers, body, chrono::Utc::now().timestamp())?;

    let payload: AuthEmailPayload =
        serde_json::from_slice(body).map_err(|e| AuthEmailError::Payload(e.to_string()))?;
    let action_type = payload.email_data.email_action_type.as_str();
    let action = EmailAction::parse(action_type);

    let link = action_url(&state.config.auth_base_url, &payload.email_data);
    let html = render_html(&action.content(), &link, &payload.user.email)?;

    tracing::info!(action = action_type, "sending auth email");
    state
        .mailer
        .send(&OutgoingEmail {
            from: state.config.email_from.clone(),
            to: vec![payload.user.email],
            subject: action.subject(),
            html,
        })
        .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configuration_errors_are_server_errors() {
        assert_eq!(
            AuthEmailError::SecretMissing.status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            AuthEmailError::ApiKeyMissing.status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn verification_and_delivery_errors_are_unauthorized() {
        let err = AuthEmailError::from(WebhookError::SignatureMismatch);
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(err.to_string(), "No matching signature found");

        let err = AuthEmailError::from(MailError::Api("domain not verified".into()));
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(err.to_string(), "domain not verified");
    }
}
