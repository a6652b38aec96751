use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{domain::order_status::OrderStatus, models::User};

#[derive(Debug, Serialize, ToSchema)]
pub struct DashboardStats {
    pub total_products: i64,
    pub total_orders: i64,
    pub total_users: i64,
    /// Cents, over orders that are neither pending nor cancelled.
    pub total_revenue: i64,
    pub pending_orders: i64,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateOrderStatusRequest {
    pub status: OrderStatus,
}

#[derive(Serialize, ToSchema)]
#[serde(transparent)]
pub struct UserList {
    #[schema(value_type = Vec<User>)]
    pub items: Vec<User>,
}
