use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, StatusCode, header},
    routing::post,
};

use crate::{
    dto::{
        checkout::{CheckoutRequest, CheckoutResponse, ConfirmCheckoutRequest, QuoteRequest, QuoteResponse},
        orders::OrderWithItems,
    },
    error::AppResult,
    middleware::auth::AuthUser,
    response::ApiResponse,
    services::checkout_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(checkout))
        .route("/quote", post(quote))
        .route("/confirm", post(confirm))
}

#[utoipa::path(
    post,
    path = "/api/checkout/quote",
    request_body = QuoteRequest,
    responses(
        (status = 200, description = "Server-side totals for a cart and optional promo code", body = ApiResponse<QuoteResponse>),
        (status = 400, description = "Empty cart, unavailable product or invalid promo code")
    ),
    security((), ("bearer_auth" = [])),
    tag = "Checkout"
)]
pub async fn quote(
    State(state): State<AppState>,
    user: Option<AuthUser>,
    Json(payload): Json<QuoteRequest>,
) -> AppResult<Json<ApiResponse<QuoteResponse>>> {
    let resp = checkout_service::quote(&state, user.as_ref(), payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/checkout",
    request_body = CheckoutRequest,
    responses(
        (status = 201, description = "Order created and payment session opened", body = ApiResponse<CheckoutResponse>),
        (status = 400, description = "Invalid form, empty cart or invalid promo code"),
        (status = 500, description = "Payment provider error")
    ),
    security((), ("bearer_auth" = [])),
    tag = "Checkout"
)]
pub async fn checkout(
    State(state): State<AppState>,
    user: Option<AuthUser>,
    headers: HeaderMap,
    Json(payload): Json<CheckoutRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<CheckoutResponse>>)> {
    let origin = headers
        .get(header::ORIGIN)
        .and_then(|value| value.to_str().ok());
    let resp = checkout_service::place_order(&state, user.as_ref(), origin, payload).await?;
    Ok((StatusCode::CREATED, Json(resp)))
}

#[utoipa::path(
    post,
    path = "/api/checkout/confirm",
    request_body = ConfirmCheckoutRequest,
    responses(
        (status = 200, description = "Order confirmed after a paid session", body = ApiResponse<OrderWithItems>),
        (status = 400, description = "Session unpaid or not matching the order"),
        (status = 404, description = "Order not found")
    ),
    tag = "Checkout"
)]
pub async fn confirm(
    State(state): State<AppState>,
    Json(payload): Json<ConfirmCheckoutRequest>,
) -> AppResult<Json<ApiResponse<OrderWithItems>>> {
    let resp = checkout_service::confirm(&state, payload).await?;
    Ok(Json(resp))
}
