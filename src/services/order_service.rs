use std::collections::HashMap;

use sea_orm::{
    ColumnTrait, Condition, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, TransactionTrait,
};
use uuid::Uuid;

use crate::{
    audit,
    dto::orders::{OrderList, OrderWithItems, ReorderResult},
    entity::{
        order_items::{Column as OrderItemCol, Entity as OrderItems},
        orders::{Column as OrderCol, Entity as Orders, Model as OrderModel},
        product_variants::{Column as VariantCol, Entity as ProductVariants},
        products::{Column as ProdCol, Entity as Products},
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::{Order, OrderItem},
    response::{ApiResponse, Meta},
    routes::params::{OrderListQuery, SortOrder},
    services::cart_service,
    state::AppState,
};

pub async fn with_items<C: ConnectionTrait>(db: &C, model: OrderModel) -> AppResult<OrderWithItems> {
    let items = OrderItems::find()
        .filter(OrderItemCol::OrderId.eq(model.id))
        .all(db)
        .await?
        .into_iter()
        .map(OrderItem::from)
        .collect();
    Ok(OrderWithItems {
        order: Order::try_from(model)?,
        items,
    })
}

/// Loads the items of many orders in one query, keeping the order sequence.
pub async fn many_with_items<C: ConnectionTrait>(
    db: &C,
    models: Vec<OrderModel>,
) -> AppResult<Vec<OrderWithItems>> {
    if models.is_empty() {
        return Ok(Vec::new());
    }
    let ids: Vec<Uuid> = models.iter().map(|m| m.id).collect();
    let mut items: HashMap<Uuid, Vec<OrderItem>> = HashMap::new();
    for item in OrderItems::find()
        .filter(OrderItemCol::OrderId.is_in(ids))
        .all(db)
        .await?
    {
        items.entry(item.order_id).or_default().push(OrderItem::from(item));
    }

    models
        .into_iter()
        .map(|model| {
            let id = model.id;
            Ok(OrderWithItems {
                order: Order::try_from(model)?,
                items: items.remove(&id).unwrap_or_default(),
            })
        })
        .collect()
}

/// Orders matching `condition`, paginated and sorted by creation date.
pub async fn page_of_orders(
    state: &AppState,
    condition: Condition,
    query: &OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    let (page, limit, offset) = query.pagination().normalize();
    let mut condition = condition;
    if let Some(status) = query.status {
        condition = condition.add(OrderCol::Status.eq(status.as_str()));
    }

    let sort_order = query.sort_order.unwrap_or(SortOrder::Desc);
    let mut finder = Orders::find().filter(condition);
    finder = match sort_order {
        SortOrder::Asc => finder.order_by_asc(OrderCol::CreatedAt),
        SortOrder::Desc => finder.order_by_desc(OrderCol::CreatedAt),
    };

    let total = finder.clone().count(&state.orm).await? as i64;

    let models = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?;
    let items = many_with_items(&state.orm, models).await?;

    Ok(ApiResponse::paginated("Orders", OrderList { items }, page, limit, total))
}

pub async fn list_orders(
    state: &AppState,
    user: &AuthUser,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    let condition = Condition::all().add(OrderCol::UserId.eq(user.user_id));
    page_of_orders(state, condition, &query).await
}

async fn find_own_order(state: &AppState, user: &AuthUser, id: Uuid) -> AppResult<OrderModel> {
    Orders::find()
        .filter(
            Condition::all()
                .add(OrderCol::UserId.eq(user.user_id))
                .add(OrderCol::Id.eq(id)),
        )
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)
}

pub async fn get_order(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<OrderWithItems>> {
    let order = find_own_order(state, user, id).await?;
    let data = with_items(&state.orm, order).await?;
    Ok(ApiResponse::success("OK", data, Some(Meta::empty())))
}

/// Puts the items of a past order back into the cart. Items whose product was
/// deleted or is out of stock are skipped; a deleted variant falls back to the
/// base product. Either every line is merged or none is.
pub async fn reorder(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<ReorderResult>> {
    let order = find_own_order(state, user, id).await?;
    let items = OrderItems::find()
        .filter(OrderItemCol::OrderId.eq(order.id))
        .all(&state.orm)
        .await?;

    let product_ids: Vec<Uuid> = items.iter().filter_map(|i| i.product_id).collect();
    let variant_ids: Vec<Uuid> = items.iter().filter_map(|i| i.variant_id).collect();

    let live_products: HashMap<Uuid, bool> = Products::find()
        .select_only()
        .column(ProdCol::Id)
        .column(ProdCol::InStock)
        .filter(ProdCol::Id.is_in(product_ids))
        .into_tuple::<(Uuid, bool)>()
        .all(&state.orm)
        .await?
        .into_iter()
        .collect();
    let live_variants: HashMap<Uuid, bool> = ProductVariants::find()
        .select_only()
        .column(VariantCol::Id)
        .column(VariantCol::InStock)
        .filter(VariantCol::Id.is_in(variant_ids))
        .into_tuple::<(Uuid, bool)>()
        .all(&state.orm)
        .await?
        .into_iter()
        .collect();

    let txn = state.orm.begin().await?;
    let mut result = ReorderResult { added: 0, skipped: 0 };
    for item in &items {
        let Some((product_id, product_in_stock)) = item
            .product_id
            .and_then(|id| live_products.get(&id).map(|in_stock| (id, *in_stock)))
        else {
            result.skipped += 1;
            continue;
        };
        let variant = item
            .variant_id
            .and_then(|id| live_variants.get(&id).map(|in_stock| (id, *in_stock)));
        let available = product_in_stock && variant.is_none_or(|(_, in_stock)| in_stock);
        if !available {
            result.skipped += 1;
            continue;
        }

        cart_service::merge_line(&txn, user.user_id, product_id, variant.map(|(id, _)| id), item.quantity)
            .await?;
        result.added += 1;
    }
    txn.commit().await?;

    audit::record(
        &state.pool,
        Some(user.user_id),
        "order_reorder",
        "cart_items",
        serde_json::json!({ "order_id": order.id, "added": result.added, "skipped": result.skipped }),
    )
    .await;

    Ok(ApiResponse::success("Items added to cart", result, Some(Meta::empty())))
}
