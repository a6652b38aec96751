//! Standard Webhooks signature verification.
//!
//! The signed content is `{webhook-id}.{webhook-timestamp}.{body}`, signed
//! with HMAC-SHA256 using the base64-decoded secret. The `webhook-signature`
//! header may carry several space-separated `v1,<base64>` entries.

use axum::http::HeaderMap;
use base64::{Engine, engine::general_purpose::STANDARD};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

pub const HEADER_ID: &str = "webhook-id";
pub const HEADER_TIMESTAMP: &str = "webhook-timestamp";
pub const HEADER_SIGNATURE: &str = "webhook-signature";

/// Accepted clock skew between sender and receiver, in seconds.
pub const TOLERANCE_SECS: i64 = 5 * 60;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum WebhookError {
    #[error("Invalid webhook secret")]
    InvalidSecret,

    #[error("Missing required headers")]
    MissingHeaders,

    #[error("Invalid timestamp header")]
    InvalidTimestamp,

    #[error("Message timestamp too old")]
    TimestampTooOld,

    #[error("Message timestamp too new")]
    TimestampTooNew,

    #[error("No matching signature found")]
    SignatureMismatch,
}

#[derive(Clone)]
pub struct WebhookVerifier {
    mac: HmacSha256,
}

impl std::fmt::Debug for WebhookVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookVerifier").finish_non_exhaustive()
    }
}

impl WebhookVerifier {
    /// Accepts `v1,whsec_<base64>`, `whsec_<base64>` or bare base64.
    pub fn from_secret(secret: &str) -> Result<Self, WebhookError> {
        let secret = secret.trim();
        let secret = secret.strip_prefix("v1,").unwrap_or(secret);
        let secret = secret.strip_prefix("whsec_").unwrap_or(secret);
        let key = STANDARD
            .decode(secret)
            .map_err(|_| WebhookError::InvalidSecret)?;
        if key.is_empty() {
            return Err(WebhookError::InvalidSecret);
        }
        let mac = HmacSha256::new_from_slice(&key).map_err(|_| WebhookError::InvalidSecret)?;
        Ok(Self { mac })
    }

    fn mac(&self, id: &str, timestamp: &str, body: &[u8]) -> HmacSha256 {
        let mut mac = self.mac.clone();
        mac.update(id.as_bytes());
        mac.update(b".");
        mac.update(timestamp.as_bytes());
        mac.update(b".");
        mac.update(body);
        mac
    }

    /// `v1,<base64>` signature for the given message.
    pub fn sign(&self, id: &str, timestamp: i64, body: &[u8]) -> String {
        let tag = self.mac(id, &timestamp.to_string(), body).finalize();
        format!("v1,{}", STANDARD.encode(tag.into_bytes()))
    }

    pub fn verify(&self, headers: &HeaderMap, body: &[u8], now: i64) -> Result<(), WebhookError> {
        let header = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|v| !v.is_empty())
        };

        let (Some(id), Some(timestamp), Some(signatures)) = (
            header(HEADER_ID),
            header(HEADER_TIMESTAMP),
            header(HEADER_SIGNATURE),
        ) else {
            return Err(WebhookError::MissingHeaders);
        };

        let sent_at: i64 = timestamp
            .parse()
            .map_err(|_| WebhookError::InvalidTimestamp)?;
        if now.abs_diff(sent_at) > TOLERANCE_SECS.unsigned_abs() {
            return Err(if sent_at < now {
                WebhookError::TimestampTooOld
            } else {
                WebhookError::TimestampTooNew
            });
        }

        let matched = signatures
            .split_whitespace()
            .filter_map(|entry| entry.strip_prefix("v1,"))
            .filter_map(|encoded| STANDARD.decode(encoded).ok())
            .any(|candidate| {
                self.mac(id, timestamp, body)
                    .verify_slice(&candidate)
                    .is_ok()
            });

        if matched {
            Ok(())
        } else {
            Err(WebhookError::SignatureMismatch)
        }
    }
}
