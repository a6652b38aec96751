mod common;

use std::sync::Arc;

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
};
use chrono::Utc;
use hairlab_storefront::{
    app::build_router,
    models::User,
    services::auth_service::issue_token,
    webhook::{HEADER_ID, HEADER_SIGNATURE, HEADER_TIMESTAMP, WebhookVerifier},
};
use secrecy::SecretString;
use serde_json::{Value, json};
use tower::ServiceExt;
use uuid::Uuid;

use common::{FakeMailer, HOOK_SECRET, JWT_SECRET, lazy_state, test_config, with_fakes};

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    // Layer-generated rejections are plain text.
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

fn bearer(role: &str) -> String {
    let user = User {
        id: Uuid::new_v4(),
        email: format!("{role}@shop.test"),
        password_hash: String::new(),
        role: role.into(),
        created_at: Utc::now(),
    };
    format!("Bearer {}", issue_token(&user, JWT_SECRET).unwrap())
}

fn hook_payload() -> Vec<u8> {
    serde_json::to_vec(&json!({
        "user": { "email": "camille@example.fr" },
        "email_data": {
            "token": "123456",
            "token_hash": "abc123",
            "redirect_to": "https://shop.test/account",
            "email_action_type": "recovery",
            "site_url": "https://shop.test"
        }
    }))
    .unwrap()
}

fn signed_hook_request(body: Vec<u8>, timestamp: i64) -> Request<Body> {
    let verifier = WebhookVerifier::from_secret(HOOK_SECRET).unwrap();
    let signature = verifier.sign("msg_1", timestamp, &body);
    Request::post("/api/hooks/auth-email")
        .header(header::CONTENT_TYPE, "application/json")
        .header(HEADER_ID, "msg_1")
        .header(HEADER_TIMESTAMP, timestamp.to_string())
        .header(HEADER_SIGNATURE, signature)
        .body(Body::from(body))
        .unwrap()
}

#[tokio::test]
async fn health_endpoint_reports_ok() {
    let app = build_router(lazy_state(test_config("")));
    let (status, body) = send(app, Request::get("/health").body(Body::empty()).unwrap()).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Health check");
    assert_eq!(body["data"]["status"], "ok");
}

#[tokio::test]
async fn unknown_route_returns_envelope_with_path() {
    let app = build_router(lazy_state(test_config("")));
    let (status, body) = send(app, Request::get("/nope").body(Body::empty()).unwrap()).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Not Found");
    assert_eq!(body["data"]["path"], "/nope");
}

#[tokio::test]
async fn responses_carry_a_request_id() {
    let app = build_router(lazy_state(test_config("")));
    let response = app
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert!(response.headers().contains_key("x-request-id"));
}

#[tokio::test]
async fn cart_requires_a_token() {
    let app = build_router(lazy_state(test_config("")));
    let (status, body) = send(app, Request::get("/api/cart").body(Body::empty()).unwrap()).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Unauthorized");
}

#[tokio::test]
async fn admin_routes_reject_customers() {
    let app = build_router(lazy_state(test_config("")));
    let request = Request::get("/api/admin/dashboard")
        .header(header::AUTHORIZATION, bearer("user"))
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(app, request).await;

    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn negative_subtotal_is_rejected_before_lookup() {
    let app = build_router(lazy_state(test_config("")));
    let request = Request::post("/api/promotions/validate")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(r#"{"code":"BIENVENUE","subtotal":-1}"#))
        .unwrap();
    let (status, body) = send(app, request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["data"]["error"], "subtotal cannot be negative");
}

#[tokio::test]
async fn malformed_session_id_is_rejected_before_lookup() {
    let app = build_router(lazy_state(test_config("")));
    let payload = json!({
        "order_id": Uuid::nil(),
        "session_id": "../../customers/cus_x",
    });
    let request = Request::post("/api/checkout/confirm")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(payload.to_string()))
        .unwrap();
    let (status, body) = send(app, request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["data"]["error"], "Invalid payment session");
}

#[test]
fn config_debug_output_redacts_secrets() {
    let mut config = test_config("postgres://app:hunter2@db/shop");
    config.send_email_hook_secret = Some(SecretString::from(HOOK_SECRET.to_string()));
    let printed = format!("{config:?}");

    assert!(!printed.contains(JWT_SECRET));
    assert!(!printed.contains("hunter2"));
    assert!(!printed.contains(HOOK_SECRET));
}

#[tokio::test]
async fn oversized_bodies_are_refused() {
    let app = build_router(lazy_state(test_config("")));
    let body = vec![b' '; 2 * 1024 * 1024];
    let request = Request::post("/api/auth/login")
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::CONTENT_LENGTH, body.len())
        .body(Body::from(body))
        .unwrap();
    let (status, _) = send(app, request).await;

    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn auth_email_hook_without_secret_is_a_server_error() {
    let (state, _, _) = with_fakes(lazy_state(test_config("")));
    let app = build_router(state);
    let request = signed_hook_request(hook_payload(), Utc::now().timestamp());
    let (status, body) = send(app, request).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"]["message"], "Webhook secret not configured");
}

#[tokio::test]
async fn auth_email_hook_without_api_key_is_a_server_error() {
    let mut config = test_config("");
    config.send_email_hook_secret = Some(SecretString::from(HOOK_SECRET.to_string()));
    let app = build_router(lazy_state(config));
    let request = signed_hook_request(hook_payload(), Utc::now().timestamp());
    let (status, body) = send(app, request).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"]["message"], "Resend API key not configured");
}

#[tokio::test]
async fn auth_email_hook_rejects_bad_signature() {
    let mut config = test_config("");
    config.send_email_hook_secret = Some(SecretString::from(HOOK_SECRET.to_string()));
    let (state, _, mailer) = with_fakes(lazy_state(config));
    let app = build_router(state);

    let mut request = signed_hook_request(hook_payload(), Utc::now().timestamp());
    request
        .headers_mut()
        .insert(HEADER_SIGNATURE, "v1,AAAA".parse().unwrap());
    let (status, body) = send(app, request).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["http_code"], 500);
    assert!(mailer.sent.lock().unwrap().is_empty());
}

#[tokio::test]
async fn auth_email_hook_rejects_stale_timestamp() {
    let mut config = test_config("");
    config.send_email_hook_secret = Some(SecretString::from(HOOK_SECRET.to_string()));
    let (state, _, _) = with_fakes(lazy_state(config));
    let app = build_router(state);

    let request = signed_hook_request(hook_payload(), Utc::now().timestamp() - 3600);
    let (status, _) = send(app, request).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn auth_email_hook_rejects_minimum_timestamp() {
    let mut config = test_config("");
    config.send_email_hook_secret = Some(SecretString::from(HOOK_SECRET.to_string()));
    let (state, _, mailer) = with_fakes(lazy_state(config));
    let app = build_router(state);

    let request = signed_hook_request(hook_payload(), i64::MIN);
    let (status, body) = send(app, request).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["message"], "Message timestamp too old");
    assert!(mailer.sent.lock().unwrap().is_empty());
}

#[tokio::test]
async fn auth_email_hook_sends_recovery_email() {
    let mut config = test_config("");
    config.send_email_hook_secret = Some(SecretString::from(HOOK_SECRET.to_string()));
    let (state, _, mailer) = with_fakes(lazy_state(config));
    let app = build_router(state);

    let request = signed_hook_request(hook_payload(), Utc::now().timestamp());
    let (status, body) = send(app, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({}));

    let sent = mailer.sent.lock().unwrap();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, vec!["camille@example.fr".to_string()]);
    assert!(sent[0].html.contains(
        "https://auth.shop.test/auth/v1/verify?token=abc123&amp;type=recovery"
    ));
}

#[tokio::test]
async fn auth_email_delivery_failure_is_reported_as_unauthorized() {
    let mut config = test_config("");
    config.send_email_hook_secret = Some(SecretString::from(HOOK_SECRET.to_string()));
    let mailer = Arc::new(FakeMailer {
        fail_with: Some("The domain is not verified".into()),
        ..Default::default()
    });
    let app = build_router(lazy_state(config).with_mailer(mailer));

    let request = signed_hook_request(hook_payload(), Utc::now().timestamp());
    let (status, body) = send(app, request).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["message"], "The domain is not verified");
}
