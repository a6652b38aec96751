use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    domain::{address::Address, cart::CartLine, pricing::CheckoutTotals, promotion::AppliedPromotion},
    models::{Order, OrderItem},
};

/// A line as sent by a guest cart; prices are looked up server-side.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CheckoutItem {
    pub product_id: Uuid,
    #[serde(default)]
    pub variant_id: Option<Uuid>,
    pub quantity: i32,
}

/// Prices `items` when given, else the caller's persisted cart.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct QuoteRequest {
    #[serde(default)]
    pub promo_code: Option<String>,
    #[serde(default)]
    pub items: Option<Vec<CheckoutItem>>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct QuoteResponse {
    pub items: Vec<CartLine>,
    pub totals: CheckoutTotals,
    pub promotion: Option<AppliedPromotion>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CheckoutRequest {
    pub address: Address,
    #[serde(default)]
    pub promo_code: Option<String>,
    #[serde(default)]
    pub items: Option<Vec<CheckoutItem>>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CheckoutResponse {
    pub order: Order,
    pub items: Vec<OrderItem>,
    pub session_id: String,
    pub url: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ConfirmCheckoutRequest {
    pub order_id: Uuid,
    pub session_id: String,
}
