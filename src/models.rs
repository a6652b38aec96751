use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    domain::{
        address::Address,
        order_status::OrderStatus,
        promotion::{DiscountType, PromotionRule},
    },
    entity::{
        order_items, orders, product_images, product_variants, products, profiles, promotions,
        users,
    },
    error::AppError,
};

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub role: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ProductImage {
    pub id: Uuid,
    pub product_id: Uuid,
    pub image_url: String,
    pub position: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ProductVariant {
    pub id: Uuid,
    pub product_id: Uuid,
    pub name: String,
    pub price: i64,
    pub in_stock: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub short_description: Option<String>,
    pub price: i64,
    pub compare_at_price: Option<i64>,
    pub category: String,
    pub ingredients: Vec<String>,
    pub benefits: Vec<String>,
    pub how_to_use: Option<String>,
    pub expected_results: Option<String>,
    pub in_stock: bool,
    pub featured: bool,
    pub images: Vec<ProductImage>,
    pub variants: Vec<ProductVariant>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Order {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub status: OrderStatus,
    pub subtotal: i64,
    pub discount_amount: i64,
    pub shipping_cost: i64,
    pub total_amount: i64,
    pub promo_code: Option<String>,
    pub shipping_address: Address,
    pub billing_address: Address,
    pub notes: Option<String>,
    pub payment_session_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OrderItem {
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_id: Option<Uuid>,
    pub product_name: String,
    pub variant_id: Option<Uuid>,
    pub variant_name: Option<String>,
    pub quantity: i32,
    pub unit_price: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Promotion {
    pub id: Uuid,
    pub code: String,
    pub description: Option<String>,
    pub discount_type: DiscountType,
    pub discount_value: i64,
    pub min_purchase: Option<i64>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

impl Promotion {
    pub fn rule(&self) -> PromotionRule {
        PromotionRule {
            code: self.code.clone(),
            discount_type: self.discount_type,
            discount_value: self.discount_value,
            min_purchase: self.min_purchase,
            start_date: self.start_date,
            end_date: self.end_date,
            active: self.active,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Profile {
    pub id: Uuid,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub postal_code: Option<String>,
    pub country: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl From<users::Model> for User {
    fn from(model: users::Model) -> Self {
        User {
            id: model.id,
            email: model.email,
            password_hash: model.password_hash,
            role: model.role,
            created_at: model.created_at.with_timezone(&Utc),
        }
    }
}

impl From<product_images::Model> for ProductImage {
    fn from(model: product_images::Model) -> Self {
        ProductImage {
            id: model.id,
            product_id: model.product_id,
            image_url: model.image_url,
            position: model.position,
        }
    }
}

impl From<product_variants::Model> for ProductVariant {
    fn from(model: product_variants::Model) -> Self {
        ProductVariant {
            id: model.id,
            product_id: model.product_id,
            name: model.name,
            price: model.price,
            in_stock: model.in_stock,
        }
    }
}

impl Product {
    pub fn from_entity(
        model: products::Model,
        images: Vec<ProductImage>,
        variants: Vec<ProductVariant>,
    ) -> Self {
        Product {
            id: model.id,
            name: model.name,
            slug: model.slug,
            description: model.description,
            short_description: model.short_description,
            price: model.price,
            compare_at_price: model.compare_at_price,
            category: model.category,
            ingredients: model.ingredients,
            benefits: model.benefits,
            how_to_use: model.how_to_use,
            expected_results: model.expected_results,
            in_stock: model.in_stock,
            featured: model.featured,
            images,
            variants,
            created_at: model.created_at.with_timezone(&Utc),
            updated_at: model.updated_at.with_timezone(&Utc),
        }
    }
}

impl TryFrom<orders::Model> for Order {
    type Error = AppError;

    fn try_from(model: orders::Model) -> Result<Self, Self::Error> {
        let status = model
            .status
            .parse::<OrderStatus>()
            .map_err(|e| AppError::Internal(anyhow::anyhow!(e)))?;
        let shipping_address = serde_json::from_value(model.shipping_address)
            .map_err(|e| AppError::Internal(e.into()))?;
        let billing_address = serde_json::from_value(model.billing_address)
            .map_err(|e| AppError::Internal(e.into()))?;

        Ok(Order {
            id: model.id,
            user_id: model.user_id,
            status,
            subtotal: model.subtotal,
            discount_amount: model.discount_amount,
            shipping_cost: model.shipping_cost,
            total_amount: model.total_amount,
            promo_code: model.promo_code,
            shipping_address,
            billing_address,
            notes: model.notes,
            payment_session_id: model.payment_session_id,
            created_at: model.created_at.with_timezone(&Utc),
            updated_at: model.updated_at.with_timezone(&Utc),
        })
    }
}

impl From<order_items::Model> for OrderItem {
    fn from(model: order_items::Model) -> Self {
        OrderItem {
            id: model.id,
            order_id: model.order_id,
            product_id: model.product_id,
            product_name: model.product_name,
            variant_id: model.variant_id,
            variant_name: model.variant_name,
            quantity: model.quantity,
            unit_price: model.unit_price,
        }
    }
}

impl TryFrom<promotions::Model> for Promotion {
    type Error = AppError;

    fn try_from(model: promotions::Model) -> Result<Self, Self::Error> {
        let discount_type = model
            .discount_type
            .parse::<DiscountType>()
            .map_err(|e| AppError::Internal(anyhow::anyhow!(e)))?;

        Ok(Promotion {
            id: model.id,
            code: model.code,
            description: model.description,
            discount_type,
            discount_value: model.discount_value,
            min_purchase: model.min_purchase,
            start_date: model.start_date.map(|dt| dt.with_timezone(&Utc)),
            end_date: model.end_date.map(|dt| dt.with_timezone(&Utc)),
            active: model.active,
            created_at: model.created_at.with_timezone(&Utc),
        })
    }
}

impl From<profiles::Model> for Profile {
    fn from(model: profiles::Model) -> Self {
        Profile {
            id: model.id,
            first_name: model.first_name,
            last_name: model.last_name,
            email: model.email,
            phone: model.phone,
            address: model.address,
            city: model.city,
            postal_code: model.postal_code,
            country: model.country,
            updated_at: model.updated_at.with_timezone(&Utc),
        }
    }
}
