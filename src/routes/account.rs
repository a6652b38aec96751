use axum::{
    Json, Router,
    extract::State,
    routing::{get, post},
};

use crate::{
    dto::profiles::{ChangePasswordRequest, UpdateProfileRequest},
    error::AppResult,
    middleware::auth::AuthUser,
    models::Profile,
    response::ApiResponse,
    services::profile_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/profile", get(get_profile).put(update_profile))
        .route("/password", post(change_password))
}

#[utoipa::path(
    get,
    path = "/api/account/profile",
    responses(
        (status = 200, description = "Own profile, created empty on first access", body = ApiResponse<Profile>)
    ),
    security(("bearer_auth" = [])),
    tag = "Account"
)]
pub async fn get_profile(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<Profile>>> {
    let resp = profile_service::get_profile(&state, &user).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    put,
    path = "/api/account/profile",
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Profile updated", body = ApiResponse<Profile>),
        (status = 400, description = "Invalid email")
    ),
    security(("bearer_auth" = [])),
    tag = "Account"
)]
pub async fn update_profile(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<UpdateProfileRequest>,
) -> AppResult<Json<ApiResponse<Profile>>> {
    let resp = profile_service::update_profile(&state, &user, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/account/password",
    request_body = ChangePasswordRequest,
    responses(
        (status = 200, description = "Password changed", body = ApiResponse<serde_json::Value>),
        (status = 400, description = "Passwords do not match or too short")
    ),
    security(("bearer_auth" = [])),
    tag = "Account"
)]
pub async fn change_password(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<ChangePasswordRequest>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let resp = profile_service::change_password(&state, &user, payload).await?;
    Ok(Json(resp))
}
