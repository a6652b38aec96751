use std::collections::HashMap;

use sea_orm::ActiveValue::NotSet;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, QueryFilter,
    QueryOrder, Set,
};
use uuid::Uuid;

use crate::{
    audit,
    domain::cart::{Cart, CartLine, check_quantity, merge_quantity},
    dto::{
        cart::{AddToCartRequest, CartItemKey, CartView, UpdateCartItemRequest},
        checkout::CheckoutItem,
    },
    entity::{
        cart_items::{ActiveModel as CartActive, Column as CartCol, Entity as CartItems},
        product_images::{Column as ImageCol, Entity as ProductImages},
        product_variants::{Column as VariantCol, Entity as ProductVariants},
        products::{Column as ProdCol, Entity as Products},
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    response::{ApiResponse, Meta},
    state::AppState,
};

fn line_condition(user_id: Uuid, product_id: Uuid, variant_id: Option<Uuid>) -> Condition {
    let condition = Condition::all()
        .add(CartCol::UserId.eq(user_id))
        .add(CartCol::ProductId.eq(product_id));
    match variant_id {
        Some(variant_id) => condition.add(CartCol::VariantId.eq(variant_id)),
        None => condition.add(CartCol::VariantId.is_null()),
    }
}

/// Prices requested lines from the catalog. Unknown products or variants are
/// rejected; so are unavailable ones when `require_stock` is set.
pub async fn price_lines<C: ConnectionTrait>(
    db: &C,
    requests: &[CheckoutItem],
    require_stock: bool,
) -> AppResult<Vec<CartLine>> {
    if requests.is_empty() {
        return Ok(Vec::new());
    }

    let product_ids: Vec<Uuid> = requests.iter().map(|r| r.product_id).collect();
    let variant_ids: Vec<Uuid> = requests.iter().filter_map(|r| r.variant_id).collect();

    let products: HashMap<Uuid, _> = Products::find()
        .filter(ProdCol::Id.is_in(product_ids.clone()))
        .all(db)
        .await?
        .into_iter()
        .map(|p| (p.id, p))
        .collect();

    let variants: HashMap<Uuid, _> = if variant_ids.is_empty() {
        HashMap::new()
    } else {
        ProductVariants::find()
            .filter(VariantCol::Id.is_in(variant_ids))
            .all(db)
            .await?
            .into_iter()
            .map(|v| (v.id, v))
            .collect()
    };

    let mut first_images: HashMap<Uuid, String> = HashMap::new();
    for image in ProductImages::find()
        .filter(ImageCol::ProductId.is_in(product_ids))
        .order_by_asc(ImageCol::Position)
        .all(db)
        .await?
    {
        first_images.entry(image.product_id).or_insert(image.image_url);
    }

    let mut lines = Vec::with_capacity(requests.len());
    for request in requests {
        let product = products
            .get(&request.product_id)
            .ok_or_else(|| AppError::BadRequest(format!("Product {} not found", request.product_id)))?;

        let (variant_name, unit_price, available) = match request.variant_id {
            Some(variant_id) => {
                let variant = variants
                    .get(&variant_id)
                    .filter(|v| v.product_id == product.id)
                    .ok_or_else(|| AppError::BadRequest(format!("Variant {variant_id} not found")))?;
                (
                    Some(variant.name.clone()),
                    variant.price,
                    product.in_stock && variant.in_stock,
                )
            }
            None => (None, product.price, product.in_stock),
        };

        let line = CartLine {
            product_id: product.id,
            variant_id: request.variant_id,
            product_name: product.name.clone(),
            variant_name,
            unit_price,
            quantity: request.quantity,
            image_url: first_images.get(&product.id).cloned(),
        };
        if require_stock && !available {
            return Err(AppError::BadRequest(format!(
                "{} is out of stock",
                line.display_name()
            )));
        }
        lines.push(line);
    }
    Ok(lines)
}

/// Stored lines of a user's cart, oldest first, without prices.
pub async fn stored_items<C: ConnectionTrait>(db: &C, user_id: Uuid) -> AppResult<Vec<CheckoutItem>> {
    Ok(CartItems::find()
        .filter(CartCol::UserId.eq(user_id))
        .order_by_asc(CartCol::CreatedAt)
        .all(db)
        .await?
        .into_iter()
        .map(|item| CheckoutItem {
            product_id: item.product_id,
            variant_id: item.variant_id,
            quantity: item.quantity,
        })
        .collect())
}

/// The persisted cart of a user, priced at current catalog prices.
pub async fn load_cart<C: ConnectionTrait>(db: &C, user_id: Uuid) -> AppResult<Cart> {
    let requests = stored_items(db, user_id).await?;
    let lines = price_lines(db, &requests, false).await?;
    Ok(Cart::from_lines(lines)?)
}

/// Adds `quantity` to the stored line, creating it when absent.
pub async fn merge_line<C: ConnectionTrait>(
    db: &C,
    user_id: Uuid,
    product_id: Uuid,
    variant_id: Option<Uuid>,
    quantity: i32,
) -> AppResult<()> {
    check_quantity(quantity)?;

    let existing = CartItems::find()
        .filter(line_condition(user_id, product_id, variant_id))
        .one(db)
        .await?;

    match existing {
        Some(item) => {
            let merged = merge_quantity(item.quantity, quantity)?;
            let mut active: CartActive = item.into();
            active.quantity = Set(merged);
            active.update(db).await?;
        }
        None => {
            CartActive {
                id: Set(Uuid::new_v4()),
                user_id: Set(user_id),
                product_id: Set(product_id),
                variant_id: Set(variant_id),
                quantity: Set(quantity),
                created_at: NotSet,
            }
            .insert(db)
            .await?;
        }
    }
    Ok(())
}

pub async fn clear<C: ConnectionTrait>(db: &C, user_id: Uuid) -> AppResult<u64> {
    let result = CartItems::delete_many()
        .filter(CartCol::UserId.eq(user_id))
        .exec(db)
        .await?;
    Ok(result.rows_affected)
}

pub async fn get_cart(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<CartView>> {
    let cart = load_cart(&state.orm, user.user_id).await?;
    Ok(ApiResponse::success("OK", CartView::from(cart), None))
}

pub async fn add_to_cart(
    state: &AppState,
    user: &AuthUser,
    payload: AddToCartRequest,
) -> AppResult<ApiResponse<CartView>> {
    check_quantity(payload.quantity)?;

    let request = CheckoutItem {
        product_id: payload.product_id,
        variant_id: payload.variant_id,
        quantity: payload.quantity,
    };
    price_lines(&state.orm, std::slice::from_ref(&request), true).await?;

    merge_line(
        &state.orm,
        user.user_id,
        payload.product_id,
        payload.variant_id,
        payload.quantity,
    )
    .await?;

    audit::record(
        &state.pool,
        Some(user.user_id),
        "cart_add",
        "cart_items",
        serde_json::json!({
            "product_id": payload.product_id,
            "variant_id": payload.variant_id,
            "quantity": payload.quantity,
        }),
    )
    .await;

    let cart = load_cart(&state.orm, user.user_id).await?;
    Ok(ApiResponse::success("Added to cart", CartView::from(cart), None))
}

pub async fn update_item(
    state: &AppState,
    user: &AuthUser,
    payload: UpdateCartItemRequest,
) -> AppResult<ApiResponse<CartView>> {
    let condition = line_condition(user.user_id, payload.product_id, payload.variant_id);

    if payload.quantity <= 0 {
        let result = CartItems::delete_many()
            .filter(condition)
            .exec(&state.orm)
            .await?;
        if result.rows_affected == 0 {
            return Err(AppError::NotFound);
        }
    } else {
        check_quantity(payload.quantity)?;
        let item = CartItems::find()
            .filter(condition)
            .one(&state.orm)
            .await?
            .ok_or(AppError::NotFound)?;
        let mut active: CartActive = item.into();
        active.quantity = Set(payload.quantity);
        active.update(&state.orm).await?;
    }

    audit::record(
        &state.pool,
        Some(user.user_id),
        "cart_update",
        "cart_items",
        serde_json::json!({
            "product_id": payload.product_id,
            "variant_id": payload.variant_id,
            "quantity": payload.quantity,
        }),
    )
    .await;

    let cart = load_cart(&state.orm, user.user_id).await?;
    Ok(ApiResponse::success("Cart updated", CartView::from(cart), None))
}

pub async fn remove_item(
    state: &AppState,
    user: &AuthUser,
    key: CartItemKey,
) -> AppResult<ApiResponse<CartView>> {
    let result = CartItems::delete_many()
        .filter(line_condition(user.user_id, key.product_id, key.variant_id))
        .exec(&state.orm)
        .await?;

    if result.rows_affected == 0 {
        return Err(AppError::NotFound);
    }

    audit::record(
        &state.pool,
        Some(user.user_id),
        "cart_remove",
        "cart_items",
        serde_json::json!({ "product_id": key.product_id, "variant_id": key.variant_id }),
    )
    .await;

    let cart = load_cart(&state.orm, user.user_id).await?;
    Ok(ApiResponse::success("Removed from cart", CartView::from(cart), None))
}

pub async fn clear_cart(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<serde_json::Value>> {
    let removed = clear(&state.orm, user.user_id).await?;
    tracing::debug!(user_id = %user.user_id, removed, "cart cleared");

    Ok(ApiResponse::success(
        "Cart cleared",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}
