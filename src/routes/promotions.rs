use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post, put},
};
use uuid::Uuid;

use crate::{
    domain::promotion::AppliedPromotion,
    dto::promotions::{
        CreatePromotionRequest, PromotionList, UpdatePromotionRequest, ValidatePromotionRequest,
    },
    error::AppResult,
    middleware::auth::AuthUser,
    models::Promotion,
    response::ApiResponse,
    services::promotion_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new().route("/validate", post(validate_code))
}

/// Mounted under `/api/admin/promotions`.
pub fn admin_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_promotions).post(create_promotion))
        .route("/{id}", put(update_promotion).delete(delete_promotion))
}

#[utoipa::path(
    post,
    path = "/api/promotions/validate",
    request_body = ValidatePromotionRequest,
    responses(
        (status = 200, description = "Promotion applies; discount computed for the subtotal", body = ApiResponse<AppliedPromotion>),
        (status = 400, description = "Unknown, expired, not yet active or minimum not reached")
    ),
    tag = "Promotions"
)]
pub async fn validate_code(
    State(state): State<AppState>,
    Json(payload): Json<ValidatePromotionRequest>,
) -> AppResult<Json<ApiResponse<AppliedPromotion>>> {
    let resp = promotion_service::validate_code(&state, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/admin/promotions",
    responses(
        (status = 200, description = "All promotions", body = ApiResponse<PromotionList>),
        (status = 403, description = "Admin only")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn list_promotions(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<PromotionList>>> {
    let resp = promotion_service::list_promotions(&state, &user).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/admin/promotions",
    request_body = CreatePromotionRequest,
    responses(
        (status = 201, description = "Promotion created", body = ApiResponse<Promotion>),
        (status = 400, description = "Invalid payload or duplicate code")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn create_promotion(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreatePromotionRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<Promotion>>)> {
    let resp = promotion_service::create_promotion(&state, &user, payload).await?;
    Ok((StatusCode::CREATED, Json(resp)))
}

#[utoipa::path(
    put,
    path = "/api/admin/promotions/{id}",
    params(
        ("id" = Uuid, Path, description = "Promotion ID")
    ),
    request_body = UpdatePromotionRequest,
    responses(
        (status = 200, description = "Promotion updated", body = ApiResponse<Promotion>),
        (status = 404, description = "Promotion not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn update_promotion(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdatePromotionRequest>,
) -> AppResult<Json<ApiResponse<Promotion>>> {
    let resp = promotion_service::update_promotion(&state, &user, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/admin/promotions/{id}",
    params(
        ("id" = Uuid, Path, description = "Promotion ID")
    ),
    responses(
        (status = 200, description = "Promotion deleted", body = ApiResponse<serde_json::Value>),
        (status = 404, description = "Promotion not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn delete_promotion(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let resp = promotion_service::delete_promotion(&state, &user, id).await?;
    Ok(Json(resp))
}
