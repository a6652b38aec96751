use serde::Serialize;
use utoipa::ToSchema;

use crate::models::{Order, OrderItem};

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderWithItems {
    pub order: Order,
    pub items: Vec<OrderItem>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderList {
    pub items: Vec<OrderWithItems>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ReorderResult {
    /// Lines put back into the cart.
    pub added: usize,
    /// Lines whose product no longer exists or is out of stock.
    pub skipped: usize,
}
