use std::env;

use secrecy::SecretString;

pub const DEFAULT_STRIPE_API_BASE: &str = "https://api.stripe.com";
pub const DEFAULT_RESEND_API_BASE: &str = "https://api.resend.com";
pub const DEFAULT_EMAIL_FROM: &str = "Happy Hair Lab <onboarding@resend.dev>";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: SecretString,
    pub host: String,
    pub port: u16,
    pub jwt_secret: SecretString,
    /// Fallback origin for payment redirect URLs when the request has no `Origin`.
    pub public_site_url: String,
    pub cors_allowed_origin: Option<String>,
    pub stripe_secret_key: Option<SecretString>,
    pub stripe_api_base: String,
    pub resend_api_key: Option<SecretString>,
    pub resend_api_base: String,
    pub email_from: String,
    pub send_email_hook_secret: Option<SecretString>,
    /// Base URL of the auth verification endpoint used in emailed links.
    pub auth_base_url: String,
    pub storage_dir: String,
    pub storage_public_url: String,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = SecretString::from(env::var("DATABASE_URL")?);
        let jwt_secret = SecretString::from(env::var("JWT_SECRET")?);
        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .ok()
            .and_then(|p| p.parse::<u16>().ok())
            .unwrap_or(3000);
        let public_site_url = env::var("PUBLIC_SITE_URL")
            .unwrap_or_else(|_| format!("http://localhost:{port}"));
        let storage_public_url = env::var("STORAGE_PUBLIC_URL")
            .unwrap_or_else(|_| public_site_url.clone());

        Ok(Self {
            database_url,
            host,
            port,
            jwt_secret,
            cors_allowed_origin: optional("CORS_ALLOWED_ORIGIN"),
            stripe_secret_key: optional("STRIPE_SECRET_KEY").map(SecretString::from),
            stripe_api_base: env::var("STRIPE_API_BASE")
                .unwrap_or_else(|_| DEFAULT_STRIPE_API_BASE.to_string()),
            resend_api_key: optional("RESEND_API_KEY").map(SecretString::from),
            resend_api_base: env::var("RESEND_API_BASE")
                .unwrap_or_else(|_| DEFAULT_RESEND_API_BASE.to_string()),
            email_from: env::var("EMAIL_FROM").unwrap_or_else(|_| DEFAULT_EMAIL_FROM.to_string()),
            send_email_hook_secret: optional("SEND_EMAIL_HOOK_SECRET").map(SecretString::from),
            auth_base_url: env::var("AUTH_BASE_URL").unwrap_or_else(|_| public_site_url.clone()),
            storage_dir: env::var("STORAGE_DIR").unwrap_or_else(|_| "storage".to_string()),
            storage_public_url,
            public_site_url,
        })
    }
}

fn optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}
