use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::domain::cart::{Cart, CartLine};

#[derive(Debug, Deserialize, ToSchema)]
pub struct AddToCartRequest {
    pub product_id: Uuid,
    #[serde(default)]
    pub variant_id: Option<Uuid>,
    pub quantity: i32,
}

/// Quantity ≤ 0 removes the line.
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateCartItemRequest {
    pub product_id: Uuid,
    #[serde(default)]
    pub variant_id: Option<Uuid>,
    pub quantity: i32,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CartItemKey {
    pub product_id: Uuid,
    #[serde(default)]
    pub variant_id: Option<Uuid>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CartView {
    pub items: Vec<CartLine>,
    pub total_items: i64,
    pub subtotal: i64,
}

impl From<Cart> for CartView {
    fn from(cart: Cart) -> Self {
        let total_items = cart.total_items();
        let subtotal = cart.subtotal();
        CartView {
            items: cart.into_lines(),
            total_items,
            subtotal,
        }
    }
}
