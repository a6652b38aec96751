use axum::Router;
use tower_http::limit::RequestBodyLimitLayer;

use crate::state::AppState;

pub mod account;
pub mod admin;
pub mod auth;
pub mod cart;
pub mod checkout;
pub mod doc;
pub mod health;
pub mod hooks;
pub mod orders;
pub mod params;
pub mod products;
pub mod promotions;

pub const BODY_LIMIT: usize = 1024 * 1024;

// Build the API router without binding state; it will be provided at the top level.
pub fn create_api_router() -> Router<AppState> {
    Router::new()
        .nest("/products", products::router())
        .nest("/auth", auth::router())
        .nest("/cart", cart::router())
        .nest("/checkout", checkout::router())
        .nest("/orders", orders::router())
        .nest("/account", account::router())
        .nest("/promotions", promotions::router())
        .nest("/admin", admin::router())
        .nest("/hooks", hooks::router())
        .layer(RequestBodyLimitLayer::new(BODY_LIMIT))
        .merge(Router::new().nest("/admin/products", products::upload_router()))
}
