//! Hosted checkout on the payment provider (Stripe REST API).
//!
//! Requests are form-encoded and authenticated with the secret key as a bearer
//! token. Amounts are sent in cents, currency is always EUR.

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, error, instrument};
use uuid::Uuid;

pub const CURRENCY: &str = "eur";
pub const SHIPPING_LINE_NAME: &str = "Frais de livraison";
pub const ALLOWED_SHIPPING_COUNTRY: &str = "FR";

#[derive(Debug, Error)]
pub enum PaymentError {
    #[error("Stripe configuration missing")]
    NotConfigured,

    #[error("Invalid payment session")]
    InvalidSession,

    #[error("Payment request failed: {0}")]
    Request(String),

    #[error("Payment provider error: {0}")]
    Api(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutLineItem {
    pub name: String,
    pub unit_amount: i64,
    pub quantity: i32,
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutSessionRequest {
    pub order_id: Uuid,
    pub customer_email: String,
    pub line_items: Vec<CheckoutLineItem>,
    pub shipping_cost: i64,
    pub discount: i64,
    pub promo_code: Option<String>,
    pub success_url: String,
    pub cancel_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionStatus {
    pub id: String,
    pub paid: bool,
    pub order_id: Option<String>,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_checkout_session(
        &self,
        request: &CheckoutSessionRequest,
    ) -> Result<CheckoutSession, PaymentError>;

    async fn retrieve_session(&self, session_id: &str) -> Result<SessionStatus, PaymentError>;
}

#[derive(Debug, Clone)]
pub struct StripeClient {
    client: Client,
    api_base: String,
    secret_key: Option<SecretString>,
}

/// Checkout session ids look like `cs_test_a1B2...`; anything else never
/// reaches the provider URL.
pub fn is_session_id(id: &str) -> bool {
    id.strip_prefix("cs_").is_some_and(|rest| {
        !rest.is_empty() && rest.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
    })
}

#[derive(Deserialize)]
struct StripeErrorBody {
    error: StripeErrorDetail,
}

#[derive(Deserialize)]
struct StripeErrorDetail {
    message: Option<String>,
}

#[derive(Deserialize)]
struct Coupon {
    id: String,
}

#[derive(Deserialize)]
struct SessionBody {
    id: String,
    payment_status: Option<String>,
    #[serde(default)]
    metadata: std::collections::HashMap<String, String>,
}

impl StripeClient {
    pub fn new(api_base: impl Into<String>, secret_key: Option<SecretString>) -> Self {
        Self {
            client: Client::new(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
            secret_key,
        }
    }

    fn secret(&self) -> Result<&str, PaymentError> {
        self.secret_key
            .as_ref()
            .map(|key| key.expose_secret())
            .ok_or(PaymentError::NotConfigured)
    }

    async fn post_form<T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        form: &[(String, String)],
    ) -> Result<T, PaymentError> {
        let response = self
            .client
            .post(format!("{}{path}", self.api_base))
            .bearer_auth(self.secret()?)
            .form(form)
            .send()
            .await
            .map_err(|e| PaymentError::Request(e.to_string()))?;
        parse_response(response).await
    }

    #[instrument(skip(self, promo_code))]
    async fn create_coupon(&self, amount_off: i64, promo_code: &str) -> Result<String, PaymentError> {
        let form = vec![
            ("amount_off".to_string(), amount_off.to_string()),
            ("currency".to_string(), CURRENCY.to_string()),
            ("name".to_string(), promo_code.to_string()),
            ("duration".to_string(), "once".to_string()),
        ];
        let coupon: Coupon = self.post_form("/v1/coupons", &form).await?;
        Ok(coupon.id)
    }
}

async fn parse_response<T: for<'de> Deserialize<'de>>(
    response: reqwest::Response,
) -> Result<T, PaymentError> {
    let status = response.status();
    if !status.is_success() {
        let message = match response.json::<StripeErrorBody>().await {
            Ok(body) => body.error.message.unwrap_or_else(|| status.to_string()),
            Err(_) => status.to_string(),
        };
        error!(%status, %message, "payment provider returned an error");
        return Err(PaymentError::Api(message));
    }
    response
        .json()
        .await
        .map_err(|e| PaymentError::Request(e.to_string()))
}

/// Form fields for `POST /v1/checkout/sessions`.
pub fn session_form(
    request: &CheckoutSessionRequest,
    coupon_id: Option<&str>,
) -> Vec<(String, String)> {
    let mut form: Vec<(String, String)> = vec![
        ("mode".into(), "payment".into()),
        ("payment_method_types[0]".into(), "card".into()),
        ("success_url".into(), request.success_url.clone()),
        ("cancel_url".into(), request.cancel_url.clone()),
        ("customer_email".into(), request.customer_email.clone()),
        ("metadata[orderId]".into(), request.order_id.to_string()),
        (
            "metadata[promoCode]".into(),
            request.promo_code.clone().unwrap_or_default(),
        ),
        (
            "shipping_address_collection[allowed_countries][0]".into(),
            ALLOWED_SHIPPING_COUNTRY.into(),
        ),
    ];

    let mut lines: Vec<CheckoutLineItem> = request.line_items.clone();
    if request.shipping_cost > 0 {
        lines.push(CheckoutLineItem {
            name: SHIPPING_LINE_NAME.to_string(),
            unit_amount: request.shipping_cost,
            quantity: 1,
            image_url: None,
        });
    }

    for (i, line) in lines.iter().enumerate() {
        let prefix = format!("line_items[{i}]");
        form.push((format!("{prefix}[price_data][currency]"), CURRENCY.into()));
        form.push((
            format!("{prefix}[price_data][product_data][name]"),
            line.name.clone(),
        ));
        if let Some(image) = &line.image_url {
            form.push((
                format!("{prefix}[price_data][product_data][images][0]"),
                image.clone(),
            ));
        }
        form.push((
            format!("{prefix}[price_data][unit_amount]"),
            line.unit_amount.to_string(),
        ));
        form.push((format!("{prefix}[quantity]"), line.quantity.to_string()));
    }

    if let Some(coupon) = coupon_id {
        form.push(("discounts[0][coupon]".into(), coupon.to_string()));
    }

    form
}

#[async_trait]
impl PaymentGateway for StripeClient {
    #[instrument(skip(self, request), fields(order_id = %request.order_id))]
    async fn create_checkout_session(
        &self,
        request: &CheckoutSessionRequest,
    ) -> Result<CheckoutSession, PaymentError> {
        self.secret()?;

        let coupon_id = match request.promo_code.as_deref() {
            Some(code) if request.discount > 0 => Some(self.create_coupon(request.discount, code).await?),
            _ => None,
        };

        let form = session_form(request, coupon_id.as_deref());
        let session: CheckoutSession = self.post_form("/v1/checkout/sessions", &form).await?;
        debug!(session_id = %session.id, "checkout session created");
        Ok(session)
    }

    #[instrument(skip(self))]
    async fn retrieve_session(&self, session_id: &str) -> Result<SessionStatus, PaymentError> {
        if !is_session_id(session_id) {
            return Err(PaymentError::InvalidSession);
        }
        let response = self
            .client
            .get(format!("{}/v1/checkout/sessions/{session_id}", self.api_base))
            .bearer_auth(self.secret()?)
            .send()
            .await
            .map_err(|e| PaymentError::Request(e.to_string()))?;
        let body: SessionBody = parse_response(response).await?;

        Ok(SessionStatus {
            id: body.id,
            paid: body.payment_status.as_deref() == Some("paid"),
            order_id: body.metadata.get("orderId").cloned(),
        })
    }
}
