use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{domain::promotion::DiscountType, models::Promotion};

#[derive(Debug, Deserialize, ToSchema)]
pub struct ValidatePromotionRequest {
    pub code: String,
    /// Cart subtotal in cents.
    pub subtotal: i64,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreatePromotionRequest {
    pub code: String,
    pub description: Option<String>,
    pub discount_type: DiscountType,
    pub discount_value: i64,
    pub min_purchase: Option<i64>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdatePromotionRequest {
    pub code: Option<String>,
    pub description: Option<String>,
    pub discount_type: Option<DiscountType>,
    pub discount_value: Option<i64>,
    pub min_purchase: Option<i64>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub active: Option<bool>,
}

#[derive(Serialize, ToSchema)]
#[serde(transparent)]
pub struct PromotionList {
    #[schema(value_type = Vec<Promotion>)]
    pub items: Vec<Promotion>,
}
