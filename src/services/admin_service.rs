use chrono::Utc;
use sea_orm::ActiveValue::Set;
use sea_orm::{ActiveModelTrait, Condition, EntityTrait, PaginatorTrait, QueryOrder, QuerySelect};
use sqlx::FromRow;
use uuid::Uuid;

use crate::{
    audit,
    dto::{
        admin::{DashboardStats, UpdateOrderStatusRequest, UserList},
        orders::{OrderList, OrderWithItems},
    },
    entity::{
        orders::{ActiveModel as OrderActive, Entity as Orders},
        users::{Column as UserCol, Entity as Users},
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::{Order, User},
    response::{ApiResponse, Meta},
    routes::params::{OrderListQuery, Pagination},
    services::order_service,
    state::AppState,
};

#[derive(FromRow)]
struct StatsRow {
    total_products: i64,
    total_orders: i64,
    total_users: i64,
    total_revenue: i64,
    pending_orders: i64,
}

pub async fn dashboard(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<DashboardStats>> {
    ensure_admin(user)?;
    let row = sqlx::query_as::<_, StatsRow>(
        r#"
        SELECT
            (SELECT COUNT(*) FROM products) AS total_products,
            (SELECT COUNT(*) FROM orders) AS total_orders,
            (SELECT COUNT(*) FROM users) AS total_users,
            (SELECT COALESCE(SUM(total_amount), 0)::BIGINT FROM orders
                WHERE status NOT IN ('pending', 'cancelled')) AS total_revenue,
            (SELECT COUNT(*) FROM orders WHERE status = 'pending') AS pending_orders
        "#,
    )
    .fetch_one(&state.pool)
    .await?;

    Ok(ApiResponse::success(
        "Dashboard",
        DashboardStats {
            total_products: row.total_products,
            total_orders: row.total_orders,
            total_users: row.total_users,
            total_revenue: row.total_revenue,
            pending_orders: row.pending_orders,
        },
        Some(Meta::empty()),
    ))
}

pub async fn list_all_orders(
    state: &AppState,
    user: &AuthUser,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    ensure_admin(user)?;
    order_service::page_of_orders(state, Condition::all(), &query).await
}

pub async fn get_order_admin(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<OrderWithItems>> {
    ensure_admin(user)?;
    let order = Orders::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    let data = order_service::with_items(&state.orm, order).await?;
    Ok(ApiResponse::success("Order found", data, Some(Meta::empty())))
}

pub async fn update_order_status(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateOrderStatusRequest,
) -> AppResult<ApiResponse<Order>> {
    ensure_admin(user)?;

    let existing = Orders::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;
    let previous = existing.status.clone();

    let mut active: OrderActive = existing.into();
    active.status = Set(payload.status.as_str().to_string());
    active.updated_at = Set(Utc::now().into());
    let order = active.update(&state.orm).await?;

    tracing::info!(order_id = %order.id, from = %previous, to = %payload.status, "order status changed");
    audit::record(
        &state.pool,
        Some(user.user_id),
        "order_status_update",
        "orders",
        serde_json::json!({ "order_id": order.id, "from": previous, "status": order.status }),
    )
    .await;

    Ok(ApiResponse::success(
        "Order updated",
        Order::try_from(order)?,
        Some(Meta::empty()),
    ))
}

pub async fn list_users(
    state: &AppState,
    user: &AuthUser,
    pagination: Pagination,
) -> AppResult<ApiResponse<UserList>> {
    ensure_admin(user)?;
    let (page, limit, offset) = pagination.normalize();

    let finder = Users::find().order_by_desc(UserCol::CreatedAt);
    let total = finder.clone().count(&state.orm).await? as i64;
    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(User::from)
        .collect();

    Ok(ApiResponse::paginated("Users", UserList { items }, page, limit, total))
}
