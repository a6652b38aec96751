use std::collections::HashMap;

use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::sea_query::extension::postgres::PgExpr;
use sea_orm::ActiveValue::NotSet;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set,
};
use uuid::Uuid;

use crate::{
    audit,
    dto::products::{
        CreateProductRequest, CreateVariantRequest, ProductList, UpdateProductRequest, VariantList,
        slugify,
    },
    entity::{
        product_images::{
            ActiveModel as ImageActive, Column as ImageCol, Entity as ProductImages,
        },
        product_variants::{
            ActiveModel as VariantActive, Column as VariantCol, Entity as ProductVariants,
        },
        products::{ActiveModel, Column, Entity as Products, Model as ProductModel},
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::{Product, ProductImage, ProductVariant},
    response::{ApiResponse, Meta},
    routes::params::{ProductQuery, ProductSortBy, SortOrder},
    state::AppState,
    storage::ImageStorage,
};

const SLUG_TAKEN: &str = "A product with this slug already exists";

pub async fn list_products(
    state: &AppState,
    query: ProductQuery,
) -> AppResult<ApiResponse<ProductList>> {
    let (page, limit, offset) = query.pagination().normalize();
    let mut condition = Condition::all();

    if let Some(search) = query.q.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        let pattern = format!("%{}%", search);
        condition = condition.add(
            Condition::any()
                .add(Expr::col(Column::Name).ilike(pattern.clone()))
                .add(Expr::col(Column::Description).ilike(pattern)),
        );
    }

    if let Some(category) = query.category {
        condition = condition.add(Column::Category.eq(category.as_str()));
    }
    if let Some(featured) = query.featured {
        condition = condition.add(Column::Featured.eq(featured));
    }
    if let Some(in_stock) = query.in_stock {
        condition = condition.add(Column::InStock.eq(in_stock));
    }
    if let Some(min_price) = query.min_price {
        condition = condition.add(Column::Price.gte(min_price));
    }
    if let Some(max_price) = query.max_price {
        condition = condition.add(Column::Price.lte(max_price));
    }

    let sort_by = query.sort_by.unwrap_or(ProductSortBy::CreatedAt);
    let sort_order = query.sort_order.unwrap_or(SortOrder::Desc);
    let sort_col = match sort_by {
        ProductSortBy::CreatedAt => Column::CreatedAt,
        ProductSortBy::Price => Column::Price,
        ProductSortBy::Name => Column::Name,
    };

    let mut finder = Products::find().filter(condition);
    finder = match sort_order {
        SortOrder::Asc => finder.order_by_asc(sort_col),
        SortOrder::Desc => finder.order_by_desc(sort_col),
    };

    let total = finder.clone().count(&state.orm).await? as i64;

    let models = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?;
    let items = with_media(&state.orm, models).await?;

    Ok(ApiResponse::paginated(
        "Products",
        ProductList { items },
        page,
        limit,
        total,
    ))
}

pub async fn list_featured(state: &AppState) -> AppResult<ApiResponse<ProductList>> {
    let models = Products::find()
        .filter(Column::Featured.eq(true))
        .order_by_desc(Column::CreatedAt)
        .all(&state.orm)
        .await?;
    let items = with_media(&state.orm, models).await?;
    Ok(ApiResponse::success("Featured products", ProductList { items }, None))
}

pub async fn get_product_by_slug(state: &AppState, slug: &str) -> AppResult<ApiResponse<Product>> {
    let model = Products::find()
        .filter(Column::Slug.eq(slug))
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;
    let product = load_product(&state.orm, model).await?;
    Ok(ApiResponse::success("Product", product, None))
}

pub async fn get_product(state: &AppState, id: Uuid) -> AppResult<ApiResponse<Product>> {
    let model = Products::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;
    let product = load_product(&state.orm, model).await?;
    Ok(ApiResponse::success("Product", product, None))
}

pub async fn create_product(
    state: &AppState,
    user: &AuthUser,
    payload: CreateProductRequest,
) -> AppResult<ApiResponse<Product>> {
    ensure_admin(user)?;
    validate_name_and_price(&payload.name, payload.price)?;

    let slug = payload
        .slug
        .as_deref()
        .map(slugify)
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| slugify(&payload.name));
    if slug.is_empty() {
        return Err(AppError::BadRequest("Product slug cannot be empty".into()));
    }

    let active = ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(payload.name.trim().to_string()),
        slug: Set(slug),
        description: Set(payload.description),
        short_description: Set(payload.short_description),
        price: Set(payload.price),
        compare_at_price: Set(payload.compare_at_price),
        category: Set(payload.category.as_str().to_string()),
        ingredients: Set(payload.ingredients),
        benefits: Set(payload.benefits),
        how_to_use: Set(payload.how_to_use),
        expected_results: Set(payload.expected_results),
        in_stock: Set(payload.in_stock),
        featured: Set(payload.featured),
        created_at: NotSet,
        updated_at: NotSet,
    };
    let product = active
        .insert(&state.orm)
        .await
        .map_err(|e| AppError::on_unique_violation(e, "products_slug_key", SLUG_TAKEN))?;

    audit::record(
        &state.pool,
        Some(user.user_id),
        "product_create",
        "products",
        serde_json::json!({ "product_id": product.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Product created",
        Product::from_entity(product, Vec::new(), Vec::new()),
        Some(Meta::empty()),
    ))
}

pub async fn update_product(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateProductRequest,
) -> AppResult<ApiResponse<Product>> {
    ensure_admin(user)?;
    let existing = Products::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    let mut active: ActiveModel = existing.into();
    if let Some(name) = payload.name {
        validate_name(&name)?;
        active.name = Set(name.trim().to_string());
    }
    if let Some(slug) = payload.slug.as_deref().map(slugify) {
        if slug.is_empty() {
            return Err(AppError::BadRequest("Product slug cannot be empty".into()));
        }
        active.slug = Set(slug);
    }
    if let Some(description) = payload.description {
        active.description = Set(Some(description));
    }
    if let Some(short_description) = payload.short_description {
        active.short_description = Set(Some(short_description));
    }
    if let Some(price) = payload.price {
        validate_price(price)?;
        active.price = Set(price);
    }
    if let Some(compare_at_price) = payload.compare_at_price {
        active.compare_at_price = Set(Some(compare_at_price));
    }
    if let Some(category) = payload.category {
        active.category = Set(category.as_str().to_string());
    }
    if let Some(ingredients) = payload.ingredients {
        active.ingredients = Set(ingredients);
    }
    if let Some(benefits) = payload.benefits {
        active.benefits = Set(benefits);
    }
    if let Some(how_to_use) = payload.how_to_use {
        active.how_to_use = Set(Some(how_to_use));
    }
    if let Some(expected_results) = payload.expected_results {
        active.expected_results = Set(Some(expected_results));
    }
    if let Some(in_stock) = payload.in_stock {
        active.in_stock = Set(in_stock);
    }
    if let Some(featured) = payload.featured {
        active.featured = Set(featured);
    }
    active.updated_at = Set(Utc::now().into());

    let product = active
        .update(&state.orm)
        .await
        .map_err(|e| AppError::on_unique_violation(e, "products_slug_key", SLUG_TAKEN))?;

    audit::record(
        &state.pool,
        Some(user.user_id),
        "product_update",
        "products",
        serde_json::json!({ "product_id": product.id }),
    )
    .await;

    let product = load_product(&state.orm, product).await?;
    Ok(ApiResponse::success("Updated", product, Some(Meta::empty())))
}

pub async fn delete_product(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    ensure_admin(user)?;

    let images = ProductImages::find()
        .filter(ImageCol::ProductId.eq(id))
        .all(&state.orm)
        .await?;

    let result = Products::delete_by_id(id).exec(&state.orm).await?;
    if result.rows_affected == 0 {
        return Err(AppError::NotFound);
    }

    // Rows are gone through the cascade; the files are removed best-effort.
    for image in images {
        if let Some(key) = ImageStorage::key_from_url(&image.image_url) {
            if let Err(err) = state.storage.delete(key).await {
                tracing::warn!(error = %err, key, "failed to remove product image file");
            }
        }
    }

    audit::record(
        &state.pool,
        Some(user.user_id),
        "product_delete",
        "products",
        serde_json::json!({ "product_id": id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Deleted",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

pub async fn list_variants(state: &AppState, product_id: Uuid) -> AppResult<ApiResponse<VariantList>> {
    Products::find_by_id(product_id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    let items = ProductVariants::find()
        .filter(VariantCol::ProductId.eq(product_id))
        .order_by_asc(VariantCol::Price)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(ProductVariant::from)
        .collect();
    Ok(ApiResponse::success("Variants", VariantList { items }, None))
}

pub async fn add_variant(
    state: &AppState,
    user: &AuthUser,
    product_id: Uuid,
    payload: CreateVariantRequest,
) -> AppResult<ApiResponse<ProductVariant>> {
    ensure_admin(user)?;
    validate_name_and_price(&payload.name, payload.price)?;

    Products::find_by_id(product_id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    let variant = VariantActive {
        id: Set(Uuid::new_v4()),
        product_id: Set(product_id),
        name: Set(payload.name.trim().to_string()),
        price: Set(payload.price),
        in_stock: Set(payload.in_stock),
    }
    .insert(&state.orm)
    .await?;

    audit::record(
        &state.pool,
        Some(user.user_id),
        "variant_create",
        "product_variants",
        serde_json::json!({ "product_id": product_id, "variant_id": variant.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Variant created",
        ProductVariant::from(variant),
        Some(Meta::empty()),
    ))
}

pub async fn delete_variant(
    state: &AppState,
    user: &AuthUser,
    product_id: Uuid,
    variant_id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    ensure_admin(user)?;
    let result = ProductVariants::delete_many()
        .filter(
            Condition::all()
                .add(VariantCol::Id.eq(variant_id))
                .add(VariantCol::ProductId.eq(product_id)),
        )
        .exec(&state.orm)
        .await?;
    if result.rows_affected == 0 {
        return Err(AppError::NotFound);
    }

    audit::record(
        &state.pool,
        Some(user.user_id),
        "variant_delete",
        "product_variants",
        serde_json::json!({ "product_id": product_id, "variant_id": variant_id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Deleted",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

/// Stores the file and appends it after the product's last image.
pub async fn upload_image(
    state: &AppState,
    user: &AuthUser,
    product_id: Uuid,
    file_name: Option<&str>,
    bytes: &[u8],
) -> AppResult<ApiResponse<ProductImage>> {
    ensure_admin(user)?;
    if bytes.is_empty() {
        return Err(AppError::BadRequest("Image file is empty".into()));
    }

    Products::find_by_id(product_id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    let extension = file_name
        .and_then(|name| name.rsplit_once('.'))
        .map(|(_, ext)| ext)
        .unwrap_or("jpg");
    let key = ImageStorage::key_for(product_id, extension);
    let image_url = state.storage.save(&key, bytes).await?;

    let last_position: Option<i32> = ProductImages::find()
        .select_only()
        .column_as(Expr::col(ImageCol::Position).max(), "max_position")
        .filter(ImageCol::ProductId.eq(product_id))
        .into_tuple::<Option<i32>>()
        .one(&state.orm)
        .await?
        .flatten();
    let position = next_position(last_position);

    let image = ImageActive {
        id: Set(Uuid::new_v4()),
        product_id: Set(product_id),
        image_url: Set(image_url),
        position: Set(position),
    }
    .insert(&state.orm)
    .await?;

    audit::record(
        &state.pool,
        Some(user.user_id),
        "product_image_upload",
        "product_images",
        serde_json::json!({ "product_id": product_id, "image_id": image.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Image uploaded",
        ProductImage::from(image),
        Some(Meta::empty()),
    ))
}

pub async fn delete_image(
    state: &AppState,
    user: &AuthUser,
    product_id: Uuid,
    image_id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    ensure_admin(user)?;
    let image = ProductImages::find_by_id(image_id)
        .filter(ImageCol::ProductId.eq(product_id))
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    if let Some(key) = ImageStorage::key_from_url(&image.image_url) {
        state.storage.delete(key).await?;
    }
    ProductImages::delete_by_id(image.id).exec(&state.orm).await?;

    audit::record(
        &state.pool,
        Some(user.user_id),
        "product_image_delete",
        "product_images",
        serde_json::json!({ "product_id": product_id, "image_id": image_id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Deleted",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

fn next_position(last: Option<i32>) -> i32 {
    last.map_or(0, |p| p + 1)
}

fn validate_name(name: &str) -> AppResult<()> {
    if name.trim().is_empty() {
        return Err(AppError::BadRequest("name is required".into()));
    }
    Ok(())
}

fn validate_price(price: i64) -> AppResult<()> {
    if price < 0 {
        return Err(AppError::BadRequest("price cannot be negative".into()));
    }
    Ok(())
}

fn validate_name_and_price(name: &str, price: i64) -> AppResult<()> {
    validate_name(name)?;
    validate_price(price)
}

async fn load_product<C: ConnectionTrait>(db: &C, model: ProductModel) -> AppResult<Product> {
    let mut products = with_media(db, vec![model]).await?;
    products.pop().ok_or(AppError::NotFound)
}

/// Attaches images (by position) and variants (by price) to each product,
/// with one query per table.
pub(crate) async fn with_media<C: ConnectionTrait>(
    db: &C,
    models: Vec<ProductModel>,
) -> AppResult<Vec<Product>> {
    if models.is_empty() {
        return Ok(Vec::new());
    }
    let ids: Vec<Uuid> = models.iter().map(|m| m.id).collect();

    let mut images: HashMap<Uuid, Vec<ProductImage>> = HashMap::new();
    for image in ProductImages::find()
        .filter(ImageCol::ProductId.is_in(ids.clone()))
        .order_by_asc(ImageCol::Position)
        .all(db)
        .await?
    {
        images
            .entry(image.product_id)
            .or_default()
            .push(ProductImage::from(image));
    }

    let mut variants: HashMap<Uuid, Vec<ProductVariant>> = HashMap::new();
    for variant in ProductVariants::find()
        .filter(VariantCol::ProductId.is_in(ids))
        .order_by_asc(VariantCol::Price)
        .all(db)
        .await?
    {
        variants
            .entry(variant.product_id)
            .or_default()
            .push(ProductVariant::from(variant));
    }

    Ok(models
        .into_iter()
        .map(|model| {
            let id = model.id;
            Product::from_entity(
                model,
                images.remove(&id).unwrap_or_default(),
                variants.remove(&id).unwrap_or_default(),
            )
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_image_goes_to_position_zero() {
        assert_eq!(next_position(None), 0);
        assert_eq!(next_position(Some(0)), 1);
        assert_eq!(next_position(Some(4)), 5);
    }

    #[test]
    fn rejects_blank_names_and_negative_prices() {
        assert!(validate_name_and_price("Sérum", 2990).is_ok());
        assert!(matches!(
            validate_name_and_price("  ", 10),
            Err(AppError::BadRequest(_))
        ));
        assert!(matches!(
            validate_name_and_price("Sérum", -1),
            Err(AppError::BadRequest(_))
        ));
    }
}
