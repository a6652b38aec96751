mod common;

use hairlab_storefront::{
    db::{create_pool, orm_from_pool, run_migrations},
    domain::{address::Address, order_status::OrderStatus, promotion::DiscountType},
    dto::{
        admin::UpdateOrderStatusRequest,
        auth::RegisterRequest,
        cart::{AddToCartRequest, UpdateCartItemRequest},
        checkout::{CheckoutItem, CheckoutRequest, ConfirmCheckoutRequest, QuoteRequest},
        products::{
            CreateProductRequest, CreateVariantRequest, ProductCategory, UpdateProductRequest,
        },
        promotions::CreatePromotionRequest,
    },
    entity::users::ActiveModel as UserActive,
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    routes::params::OrderListQuery,
    services::{
        admin_service, auth_service, cart_service, checkout_service, order_service,
        product_service, profile_service, promotion_service,
    },
    state::AppState,
};
use sea_orm::ActiveValue::NotSet;
use sea_orm::{ActiveModelTrait, ConnectionTrait, Set, Statement};
use uuid::Uuid;

use common::{FakePayments, lazy_state, test_config, with_fakes};

// Integration flow: admin stocks the catalog, a customer fills the cart, checks
// out with a promo code and confirms payment; admin ships; a guest checks out.
#[tokio::test]
async fn cart_checkout_confirm_and_ship_flow() -> anyhow::Result<()> {
    // Allow skipping when no DB is configured in the environment.
    let database_url = match std::env::var("TEST_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
    {
        Ok(url) => url,
        Err(_) => {
            eprintln!(
                "Skipping test: set TEST_DATABASE_URL or DATABASE_URL to run integration flow tests."
            );
            return Ok(());
        }
    };

    let (state, payments) = setup_state(&database_url).await?;

    let customer = AuthUser {
        user_id: create_user(&state, "user", "camille@example.fr").await?,
        role: "user".into(),
    };
    let admin = AuthUser {
        user_id: create_user(&state, "admin", "admin@example.fr").await?,
        role: "admin".into(),
    };

    // Catalog
    let serum = product_service::create_product(
        &state,
        &admin,
        CreateProductRequest {
            name: "Sérum Anti-Chute Intensif".into(),
            slug: None,
            description: Some("Traitement concentré".into()),
            short_description: None,
            price: 3000,
            compare_at_price: None,
            category: ProductCategory::AntiChute,
            ingredients: vec!["Caféine".into()],
            benefits: vec![],
            how_to_use: None,
            expected_results: None,
            in_stock: true,
            featured: true,
        },
    )
    .await?
    .data
    .unwrap();
    assert_eq!(serum.slug, "serum-anti-chute-intensif");

    let large = product_service::add_variant(
        &state,
        &admin,
        serum.id,
        CreateVariantRequest {
            name: "Grand format".into(),
            price: 4000,
            in_stock: true,
        },
    )
    .await?
    .data
    .unwrap();

    promotion_service::create_promotion(
        &state,
        &admin,
        CreatePromotionRequest {
            code: " bienvenue ".into(),
            description: None,
            discount_type: DiscountType::Percentage,
            discount_value: 10,
            min_purchase: Some(3000),
            start_date: None,
            end_date: None,
            active: true,
        },
    )
    .await?;

    // Cart: same key merges, variants are separate lines
    for (variant_id, quantity) in [(None, 1), (Some(large.id), 1), (None, 1)] {
        cart_service::add_to_cart(
            &state,
            &customer,
            AddToCartRequest {
                product_id: serum.id,
                variant_id,
                quantity,
            },
        )
        .await?;
    }
    let cart = cart_service::get_cart(&state, &customer).await?.data.unwrap();
    assert_eq!(cart.items.len(), 2);
    assert_eq!(cart.total_items, 3);
    assert_eq!(cart.subtotal, 2 * 3000 + 4000);

    // Zero quantity drops the line
    let cart = cart_service::update_item(
        &state,
        &customer,
        UpdateCartItemRequest {
            product_id: serum.id,
            variant_id: Some(large.id),
            quantity: 0,
        },
    )
    .await?
    .data
    .unwrap();
    assert_eq!(cart.items.len(), 1);
    assert_eq!(cart.subtotal, 6000);

    // Quote: free shipping above 50 €, 10 % off
    let quote = checkout_service::quote(
        &state,
        Some(&customer),
        QuoteRequest {
            promo_code: Some("BIENVENUE".into()),
            items: None,
        },
    )
    .await?
    .data
    .unwrap();
    assert_eq!(quote.totals.subtotal, 6000);
    assert_eq!(quote.totals.discount, 600);
    assert_eq!(quote.totals.shipping, 0);
    assert_eq!(quote.totals.total, 5400);

    // Checkout
    let placed = checkout_service::place_order(
        &state,
        Some(&customer),
        Some("https://shop.example"),
        CheckoutRequest {
            address: address("camille@example.fr"),
            promo_code: Some("bienvenue".into()),
            items: None,
        },
    )
    .await?
    .data
    .unwrap();
    assert_eq!(placed.order.status, OrderStatus::Pending);
    assert_eq!(placed.order.total_amount, 5400);
    assert_eq!(placed.order.notes.as_deref(), Some("Code promo: BIENVENUE"));
    assert_eq!(placed.order.payment_session_id.as_deref(), Some(placed.session_id.as_str()));
    assert_eq!(placed.items.len(), 1);

    {
        let requests = payments.requests.lock().unwrap();
        let request = requests.last().unwrap();
        assert_eq!(request.discount, 600);
        assert!(request.success_url.starts_with("https://shop.example/checkout/success"));
    }

    let cart = cart_service::get_cart(&state, &customer).await?.data.unwrap();
    assert!(cart.items.is_empty(), "cart cleared after checkout");

    // Confirm, then confirm again with the same session
    let confirm = ConfirmCheckoutRequest {
        order_id: placed.order.id,
        session_id: placed.session_id.clone(),
    };
    let confirmed = checkout_service::confirm(&state, confirm).await?.data.unwrap();
    assert_eq!(confirmed.order.status, OrderStatus::Confirmed);

    let again = checkout_service::confirm(
        &state,
        ConfirmCheckoutRequest {
            order_id: placed.order.id,
            session_id: placed.session_id.clone(),
        },
    )
    .await?
    .data
    .unwrap();
    assert_eq!(again.order.status, OrderStatus::Confirmed);

    // Admin ships
    let shipped = admin_service::update_order_status(
        &state,
        &admin,
        placed.order.id,
        UpdateOrderStatusRequest {
            status: OrderStatus::Shipped,
        },
    )
    .await?
    .data
    .unwrap();
    assert_eq!(shipped.status, OrderStatus::Shipped);

    let stats = admin_service::dashboard(&state, &admin).await?.data.unwrap();
    assert_eq!(stats.total_revenue, 5400);
    assert_eq!(stats.pending_orders, 0);

    // Account history and reorder
    let history = order_service::list_orders(&state, &customer, OrderListQuery::default())
        .await?
        .data
        .unwrap();
    assert_eq!(history.items.len(), 1);

    let reordered = order_service::reorder(&state, &customer, placed.order.id)
        .await?
        .data
        .unwrap();
    assert_eq!(reordered.added, 1);
    assert_eq!(reordered.skipped, 0);

    // Guest checkout with explicit lines, below the free shipping threshold
    let guest = checkout_service::place_order(
        &state,
        None,
        None,
        CheckoutRequest {
            address: address("guest@example.fr"),
            promo_code: None,
            items: Some(vec![CheckoutItem {
                product_id: serum.id,
                variant_id: None,
                quantity: 1,
            }]),
        },
    )
    .await?
    .data
    .unwrap();
    assert_eq!(guest.order.user_id, None);
    assert_eq!(guest.order.shipping_cost, 490);
    assert_eq!(guest.order.total_amount, 3490);

    // Another customer's order stays private
    let err = order_service::get_order(&state, &customer, guest.order.id)
        .await
        .unwrap_err();
    assert_eq!(err.status(), axum::http::StatusCode::NOT_FOUND);

    // Explicit lines leave the stored cart alone
    checkout_service::place_order(
        &state,
        Some(&customer),
        None,
        CheckoutRequest {
            address: address("camille@example.fr"),
            promo_code: None,
            items: Some(vec![CheckoutItem {
                product_id: serum.id,
                variant_id: Some(large.id),
                quantity: 1,
            }]),
        },
    )
    .await?;
    let cart = cart_service::get_cart(&state, &customer).await?.data.unwrap();
    assert_eq!(cart.items.len(), 1, "reordered line survives a direct checkout");

    // Confirmation needs a well-formed, paid session for this very order
    let confirm_guest = || ConfirmCheckoutRequest {
        order_id: guest.order.id,
        session_id: guest.session_id.clone(),
    };
    let message = rejection(
        checkout_service::confirm(
            &state,
            ConfirmCheckoutRequest {
                order_id: guest.order.id,
                session_id: "../../customers/cus_x".into(),
            },
        )
        .await,
    );
    assert_eq!(message, "Invalid payment session");

    payments.report_order(Some(Uuid::new_v4()));
    let message = rejection(checkout_service::confirm(&state, confirm_guest()).await);
    assert_eq!(message, "Payment session does not match this order");
    payments.report_order(None);

    payments.set_unpaid(true);
    let message = rejection(checkout_service::confirm(&state, confirm_guest()).await);
    assert_eq!(message, "Payment has not been completed");
    payments.set_unpaid(false);

    let still_pending = admin_service::get_order_admin(&state, &admin, guest.order.id)
        .await?
        .data
        .unwrap();
    assert_eq!(still_pending.order.status, OrderStatus::Pending);

    rejected_requests(&state, &admin, serum.id).await?;

    // Reorder skips items that went out of stock, all in one go
    product_service::update_product(
        &state,
        &admin,
        serum.id,
        UpdateProductRequest {
            in_stock: Some(false),
            ..Default::default()
        },
    )
    .await?;
    cart_service::clear(&state.orm, customer.user_id).await?;
    let reordered = order_service::reorder(&state, &customer, placed.order.id)
        .await?
        .data
        .unwrap();
    assert_eq!(reordered.added, 0);
    assert_eq!(reordered.skipped, 1);
    let cart = cart_service::get_cart(&state, &customer).await?.data.unwrap();
    assert!(cart.items.is_empty());

    Ok(())
}

/// Requests the storefront must turn away with a 400.
async fn rejected_requests(state: &AppState, admin: &AuthUser, serum_id: Uuid) -> anyhow::Result<()> {
    let newcomer = AuthUser {
        user_id: create_user(state, "user", "leo@example.fr").await?,
        role: "user".into(),
    };

    let message = rejection(
        checkout_service::place_order(
            state,
            Some(&newcomer),
            None,
            CheckoutRequest {
                address: address("leo@example.fr"),
                promo_code: None,
                items: None,
            },
        )
        .await,
    );
    assert_eq!(message, "Your cart is empty");

    let powder = product_service::create_product(
        state,
        admin,
        CreateProductRequest {
            name: "Poudre Densifiante".into(),
            slug: None,
            description: None,
            short_description: None,
            price: 2490,
            compare_at_price: None,
            category: ProductCategory::Camouflage,
            ingredients: vec![],
            benefits: vec![],
            how_to_use: None,
            expected_results: None,
            in_stock: false,
            featured: false,
        },
    )
    .await?
    .data
    .unwrap();
    let message = rejection(
        cart_service::add_to_cart(
            state,
            &newcomer,
            AddToCartRequest {
                product_id: powder.id,
                variant_id: None,
                quantity: 1,
            },
        )
        .await,
    );
    assert_eq!(message, "Poudre Densifiante is out of stock");

    let add_serum = |quantity| AddToCartRequest {
        product_id: serum_id,
        variant_id: None,
        quantity,
    };
    cart_service::add_to_cart(state, &newcomer, add_serum(99)).await?;
    let message = rejection(cart_service::add_to_cart(state, &newcomer, add_serum(1)).await);
    assert_eq!(message, "quantity cannot exceed 99 per item");

    let message = rejection(
        promotion_service::create_promotion(
            state,
            admin,
            CreatePromotionRequest {
                code: "Bienvenue".into(),
                description: None,
                discount_type: DiscountType::Fixed,
                discount_value: 500,
                min_purchase: None,
                start_date: None,
                end_date: None,
                active: true,
            },
        )
        .await,
    );
    assert_eq!(message, "Promotion code already exists");

    let register = || RegisterRequest {
        email: "nina@example.fr".into(),
        password: "secret1".into(),
    };
    auth_service::register_user(state, register()).await?;
    let message = rejection(auth_service::register_user(state, register()).await);
    assert_eq!(message, "Email is already taken");

    // First profile access from two requests at once
    let (first, second) = tokio::join!(
        profile_service::get_profile(state, &newcomer),
        profile_service::get_profile(state, &newcomer),
    );
    assert_eq!(first?.data.unwrap().id, second?.data.unwrap().id);

    Ok(())
}

fn rejection<T>(result: AppResult<T>) -> String {
    match result {
        Err(AppError::BadRequest(message)) => message,
        Err(other) => panic!("expected a 400, got: {other}"),
        Ok(_) => panic!("expected a 400, got a success"),
    }
}

fn address(email: &str) -> Address {
    Address {
        first_name: "Camille".into(),
        last_name: "Martin".into(),
        email: email.into(),
        phone: None,
        address: "12 rue des Lilas".into(),
        city: "Lyon".into(),
        postal_code: "69003".into(),
        country: "France".into(),
    }
}

async fn setup_state(database_url: &str) -> anyhow::Result<(AppState, std::sync::Arc<FakePayments>)> {
    let pool = create_pool(database_url).await?;
    let orm = orm_from_pool(pool.clone());
    run_migrations(&orm).await?;

    // Clean tables between runs
    let backend = orm.get_database_backend();
    orm.execute(Statement::from_string(
        backend,
        "TRUNCATE TABLE order_items, orders, cart_items, product_images, product_variants, products, promotions, profiles, audit_logs, users RESTART IDENTITY CASCADE",
    ))
    .await?;

    let base = lazy_state(test_config(database_url));
    let state = AppState { pool, orm, ..base };
    let (state, payments, _) = with_fakes(state);
    Ok((state, payments))
}

async fn create_user(state: &AppState, role: &str, email: &str) -> anyhow::Result<Uuid> {
    let user = UserActive {
        id: Set(Uuid::new_v4()),
        email: Set(email.to_string()),
        password_hash: Set("dummy".into()),
        role: Set(role.into()),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    Ok(user.id)
}
