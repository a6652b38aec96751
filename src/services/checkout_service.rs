use chrono::Utc;
use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::LockType;
use sea_orm::{ActiveModelTrait, ConnectionTrait, EntityTrait, QuerySelect, Set, TransactionTrait};
use uuid::Uuid;

use crate::{
    audit,
    clients::payment::{CheckoutLineItem, CheckoutSessionRequest, is_session_id},
    domain::{
        cart::Cart,
        order_status::OrderStatus,
        pricing::{CheckoutTotals, compute_totals},
        promotion::AppliedPromotion,
    },
    dto::{
        checkout::{
            CheckoutItem, CheckoutRequest, CheckoutResponse, ConfirmCheckoutRequest, QuoteRequest,
            QuoteResponse,
        },
        orders::OrderWithItems,
    },
    entity::{
        order_items::ActiveModel as OrderItemActive,
        orders::{ActiveModel as OrderActive, Entity as Orders},
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::{Order, OrderItem},
    response::{ApiResponse, Meta},
    services::{cart_service, order_service, promotion_service},
    state::AppState,
};

const EMPTY_CART: &str = "Your cart is empty";

/// `(success_url, cancel_url)` for the hosted checkout page.
pub fn redirect_urls(origin: &str, order_id: Uuid) -> (String, String) {
    let origin = origin.trim_end_matches('/');
    (
        format!("{origin}/checkout/success?session_id={{CHECKOUT_SESSION_ID}}&order_id={order_id}"),
        format!("{origin}/checkout?cancelled=true"),
    )
}

pub fn promo_note(promotion: Option<&AppliedPromotion>) -> Option<String> {
    promotion.map(|p| format!("Code promo: {}", p.code))
}

/// Where the checkout lines came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CartSource {
    Request,
    Stored,
}

/// Explicit lines win; otherwise a signed-in user's stored cart is used.
async fn resolve_cart<C: ConnectionTrait>(
    db: &C,
    user: Option<&AuthUser>,
    items: Option<Vec<CheckoutItem>>,
) -> AppResult<(Cart, CartSource)> {
    let (requests, source) = match (items.filter(|items| !items.is_empty()), user) {
        (Some(items), _) => (items, CartSource::Request),
        (None, Some(user)) => (
            cart_service::stored_items(db, user.user_id).await?,
            CartSource::Stored,
        ),
        (None, None) => (Vec::new(), CartSource::Request),
    };
    let lines = cart_service::price_lines(db, &requests, true).await?;
    let cart = Cart::from_lines(lines)?;
    if cart.is_empty() {
        return Err(AppError::BadRequest(EMPTY_CART.into()));
    }
    Ok((cart, source))
}

async fn price_cart<C: ConnectionTrait>(
    db: &C,
    cart: &Cart,
    promo_code: Option<&str>,
) -> AppResult<(CheckoutTotals, Option<AppliedPromotion>)> {
    let subtotal = cart.subtotal();
    let promotion = promotion_service::apply(db, promo_code, subtotal).await?;
    let discount = promotion.as_ref().map_or(0, |p| p.discount_amount);
    Ok((compute_totals(subtotal, discount), promotion))
}

pub async fn quote(
    state: &AppState,
    user: Option<&AuthUser>,
    payload: QuoteRequest,
) -> AppResult<ApiResponse<QuoteResponse>> {
    let (cart, _) = resolve_cart(&state.orm, user, payload.items).await?;
    let (totals, promotion) = price_cart(&state.orm, &cart, payload.promo_code.as_deref()).await?;

    Ok(ApiResponse::success(
        "Quote",
        QuoteResponse {
            items: cart.into_lines(),
            totals,
            promotion,
        },
        None,
    ))
}

/// Creates the pending order and its hosted payment session.
pub async fn place_order(
    state: &AppState,
    user: Option<&AuthUser>,
    origin: Option<&str>,
    payload: CheckoutRequest,
) -> AppResult<ApiResponse<CheckoutResponse>> {
    let address = payload.address;
    address
        .validate()
        .map_err(|msg| AppError::BadRequest(msg.to_string()))?;

    let (cart, source) = resolve_cart(&state.orm, user, payload.items).await?;
    let (totals, promotion) = price_cart(&state.orm, &cart, payload.promo_code.as_deref()).await?;
    let address_json = serde_json::to_value(&address).map_err(|e| AppError::Internal(e.into()))?;

    let txn = state.orm.begin().await?;

    let order_id = Uuid::new_v4();
    let order = OrderActive {
        id: Set(order_id),
        user_id: Set(user.map(|u| u.user_id)),
        status: Set(OrderStatus::Pending.as_str().to_string()),
        subtotal: Set(totals.subtotal),
        discount_amount: Set(totals.discount),
        shipping_cost: Set(totals.shipping),
        total_amount: Set(totals.total),
        promo_code: Set(promotion.as_ref().map(|p| p.code.clone())),
        shipping_address: Set(address_json.clone()),
        billing_address: Set(address_json),
        notes: Set(promo_note(promotion.as_ref())),
        payment_session_id: Set(None),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&txn)
    .await?;

    let mut items: Vec<OrderItem> = Vec::with_capacity(cart.lines().len());
    for line in cart.lines() {
        let item = OrderItemActive {
            id: Set(Uuid::new_v4()),
            order_id: Set(order.id),
            product_id: Set(Some(line.product_id)),
            product_name: Set(line.product_name.clone()),
            variant_id: Set(line.variant_id),
            variant_name: Set(line.variant_name.clone()),
            quantity: Set(line.quantity),
            unit_price: Set(line.unit_price),
        }
        .insert(&txn)
        .await?;
        items.push(OrderItem::from(item));
    }

    if let (Some(user), CartSource::Stored) = (user, source) {
        cart_service::clear(&txn, user.user_id).await?;
    }

    txn.commit().await?;
    tracing::info!(%order_id, total = totals.total, "order created");

    let origin = origin
        .filter(|o| !o.is_empty())
        .unwrap_or(&state.config.public_site_url);
    let (success_url, cancel_url) = redirect_urls(origin, order_id);

    let session_request = CheckoutSessionRequest {
        order_id,
        customer_email: address.email.clone(),
        line_items: cart
            .lines()
            .iter()
            .map(|line| CheckoutLineItem {
                name: line.display_name(),
                unit_amount: line.unit_price,
                quantity: line.quantity,
                image_url: line.image_url.clone(),
            })
            .collect(),
        shipping_cost: totals.shipping,
        discount: totals.discount,
        promo_code: promotion.as_ref().map(|p| p.code.clone()),
        success_url,
        cancel_url,
    };

    let session = state
        .payments
        .create_checkout_session(&session_request)
        .await
        .inspect_err(|err| tracing::error!(%order_id, error = %err, "checkout session failed"))?;

    let mut active: OrderActive = order.into();
    active.payment_session_id = Set(Some(session.id.clone()));
    active.updated_at = Set(Utc::now().into());
    let order = active.update(&state.orm).await?;

    audit::record(
        &state.pool,
        user.map(|u| u.user_id),
        "checkout",
        "orders",
        serde_json::json!({ "order_id": order_id, "session_id": session.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Checkout session created",
        CheckoutResponse {
            order: Order::try_from(order)?,
            items,
            session_id: session.id,
            url: session.url,
        },
        Some(Meta::empty()),
    ))
}

/// Marks a pending order confirmed once the provider reports its session paid.
/// Confirming an already-confirmed order with the same session is a no-op.
pub async fn confirm(
    state: &AppState,
    payload: ConfirmCheckoutRequest,
) -> AppResult<ApiResponse<OrderWithItems>> {
    if !is_session_id(&payload.session_id) {
        return Err(AppError::BadRequest("Invalid payment session".into()));
    }
    let existing = Orders::find_by_id(payload.order_id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;
    let current = Order::try_from(existing.clone())?;

    if current.status != OrderStatus::Pending {
        if current.status.is_paid()
            && current.payment_session_id.as_deref() == Some(payload.session_id.as_str())
        {
            let data = order_service::with_items(&state.orm, existing).await?;
            return Ok(ApiResponse::success("Order confirmed", data, Some(Meta::empty())));
        }
        return Err(AppError::BadRequest("Order cannot be confirmed".into()));
    }

    let session = state.payments.retrieve_session(&payload.session_id).await?;
    let order_ref = payload.order_id.to_string();
    if session.order_id.as_deref() != Some(order_ref.as_str()) {
        return Err(AppError::BadRequest(
            "Payment session does not match this order".into(),
        ));
    }
    if !session.paid {
        return Err(AppError::BadRequest("Payment has not been completed".into()));
    }

    let txn = state.orm.begin().await?;
    let order = Orders::find_by_id(payload.order_id)
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound)?;
    if order.status != OrderStatus::Pending.as_str() {
        return Err(AppError::BadRequest("Order cannot be confirmed".into()));
    }

    let user_id = order.user_id;
    let mut active: OrderActive = order.into();
    active.status = Set(OrderStatus::Confirmed.as_str().to_string());
    active.payment_session_id = Set(Some(session.id));
    active.updated_at = Set(Utc::now().into());
    let order = active.update(&txn).await?;
    txn.commit().await?;

    tracing::info!(order_id = %order.id, "order confirmed");
    audit::record(
        &state.pool,
        user_id,
        "order_confirmed",
        "orders",
        serde_json::json!({ "order_id": order.id }),
    )
    .await;

    let data = order_service::with_items(&state.orm, order).await?;
    Ok(ApiResponse::success("Order confirmed", data, Some(Meta::empty())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::promotion::DiscountType;

    #[test]
    fn redirect_urls_keep_session_placeholder() {
        let id = Uuid::nil();
        let (success, cancel) = redirect_urls("https://shop.example/", id);
        assert_eq!(
            success,
            format!("https://shop.example/checkout/success?session_id={{CHECKOUT_SESSION_ID}}&order_id={id}")
        );
        assert_eq!(cancel, "https://shop.example/checkout?cancelled=true");
    }

    #[test]
    fn promo_note_names_the_code() {
        let applied = AppliedPromotion {
            code: "BIENVENUE".into(),
            discount_type: DiscountType::Percentage,
            discount_value: 10,
            discount_amount: 600,
        };
        assert_eq!(promo_note(Some(&applied)).as_deref(), Some("Code promo: BIENVENUE"));
        assert_eq!(promo_note(None), None);
    }
}
