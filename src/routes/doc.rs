use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        OpenApi as OpenApiSpec,
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    domain::{
        address::Address,
        cart::CartLine,
        order_status::OrderStatus,
        pricing::CheckoutTotals,
        promotion::{AppliedPromotion, DiscountType},
    },
    dto::{
        admin::{DashboardStats, UpdateOrderStatusRequest, UserList},
        auth::{LoginRequest, LoginResponse, RegisterRequest},
        cart::{AddToCartRequest, CartItemKey, CartView, UpdateCartItemRequest},
        checkout::{
            CheckoutItem, CheckoutRequest, CheckoutResponse, ConfirmCheckoutRequest, QuoteRequest,
            QuoteResponse,
        },
        orders::{OrderList, OrderWithItems, ReorderResult},
        products::{
            CreateProductRequest, CreateVariantRequest, ProductCategory, ProductList,
            UpdateProductRequest, VariantList,
        },
        profiles::{ChangePasswordRequest, UpdateProfileRequest},
        promotions::{
            CreatePromotionRequest, PromotionList, UpdatePromotionRequest, ValidatePromotionRequest,
        },
    },
    models::{Order, OrderItem, Product, ProductImage, ProductVariant, Profile, Promotion, User},
    response::{ApiResponse, Meta},
    routes::{
        account, admin, auth, cart, checkout, health, hooks, orders, params, products, promotions,
    },
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        auth::register,
        auth::login,
        products::list_products,
        products::list_featured,
        products::get_product,
        products::get_product_admin,
        products::create_product,
        products::update_product,
        products::delete_product,
        products::list_variants,
        products::add_variant,
        products::delete_variant,
        products::upload_image,
        products::delete_image,
        cart::get_cart,
        cart::add_to_cart,
        cart::update_item,
        cart::remove_item,
        cart::clear_cart,
        checkout::quote,
        checkout::checkout,
        checkout::confirm,
        orders::list_orders,
        orders::get_order,
        orders::reorder,
        account::get_profile,
        account::update_profile,
        account::change_password,
        promotions::validate_code,
        promotions::list_promotions,
        promotions::create_promotion,
        promotions::update_promotion,
        promotions::delete_promotion,
        admin::dashboard,
        admin::list_all_orders,
        admin::get_order_admin,
        admin::update_order_status,
        admin::list_users,
        hooks::auth_email
    ),
    components(
        schemas(
            User,
            Product,
            ProductImage,
            ProductVariant,
            ProductCategory,
            Order,
            OrderItem,
            OrderStatus,
            Promotion,
            DiscountType,
            Profile,
            Address,
            CartLine,
            CheckoutTotals,
            AppliedPromotion,
            RegisterRequest,
            LoginRequest,
            LoginResponse,
            CreateProductRequest,
            UpdateProductRequest,
            CreateVariantRequest,
            ProductList,
            VariantList,
            AddToCartRequest,
            UpdateCartItemRequest,
            CartItemKey,
            CartView,
            CheckoutItem,
            QuoteRequest,
            QuoteResponse,
            CheckoutRequest,
            CheckoutResponse,
            ConfirmCheckoutRequest,
            OrderList,
            OrderWithItems,
            ReorderResult,
            UpdateProfileRequest,
            ChangePasswordRequest,
            ValidatePromotionRequest,
            CreatePromotionRequest,
            UpdatePromotionRequest,
            PromotionList,
            DashboardStats,
            UpdateOrderStatusRequest,
            UserList,
            params::Pagination,
            params::SortOrder,
            params::ProductSortBy,
            Meta,
            ApiResponse<Product>,
            ApiResponse<ProductList>,
            ApiResponse<CartView>,
            ApiResponse<OrderWithItems>,
            ApiResponse<OrderList>,
            ApiResponse<CheckoutResponse>
        )
    ),
    security(
        ("bearer_auth" = [])
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Auth", description = "Authentication endpoints"),
        (name = "Products", description = "Catalog endpoints"),
        (name = "Cart", description = "Cart endpoints"),
        (name = "Checkout", description = "Quote, order placement and payment confirmation"),
        (name = "Orders", description = "Order history endpoints"),
        (name = "Account", description = "Profile and password endpoints"),
        (name = "Promotions", description = "Promo code endpoints"),
        (name = "Admin", description = "Admin endpoints"),
        (name = "Hooks", description = "Auth provider webhooks"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn documents_storefront_paths() {
        let spec = ApiDoc::openapi();
        for path in [
            "/api/checkout",
            "/api/cart/items",
            "/api/admin/products/{id}/images",
            "/api/hooks/auth-email",
        ] {
            assert!(spec.paths.paths.contains_key(path), "missing {path}");
        }
    }
}
