use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::HeaderMap,
    routing::post,
};

use crate::{
    services::auth_email_service::{self, AuthEmailError},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new().route("/auth-email", post(auth_email))
}

/// Called by the auth provider instead of its built-in mailer. The body is
/// kept raw since the signature covers the exact bytes.
#[utoipa::path(
    post,
    path = "/api/hooks/auth-email",
    request_body(content = String, content_type = "application/json", description = "Signed auth email payload"),
    responses(
        (status = 200, description = "Email sent", body = serde_json::Value),
        (status = 401, description = "Signature verification or delivery failed"),
        (status = 500, description = "Webhook secret or email API key missing")
    ),
    tag = "Hooks"
)]
pub async fn auth_email(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<serde_json::Value>, AuthEmailError> {
    auth_email_service::handle_hook(&state, &headers, &body).await?;
    Ok(Json(serde_json::json!({})))
}
