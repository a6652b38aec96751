use chrono::Utc;
use sea_orm::ActiveValue::NotSet;
use sea_orm::{ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, Set};
use uuid::Uuid;

use crate::{
    audit,
    domain::promotion::{AppliedPromotion, PromotionError, normalize_code},
    dto::promotions::{
        CreatePromotionRequest, PromotionList, UpdatePromotionRequest, ValidatePromotionRequest,
    },
    entity::promotions::{ActiveModel, Column, Entity as Promotions},
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::Promotion,
    response::{ApiResponse, Meta},
    state::AppState,
};

const CODE_TAKEN: &str = "Promotion code already exists";
const CODE_CONSTRAINT: &str = "promotions_code_key";

async fn find_by_code<C: ConnectionTrait>(db: &C, code: &str) -> AppResult<Option<Promotion>> {
    Promotions::find()
        .filter(Column::Code.eq(code))
        .one(db)
        .await?
        .map(Promotion::try_from)
        .transpose()
}

/// Looks up and evaluates a code against `subtotal`. A blank code means no
/// promotion; an unknown or inapplicable one is an error.
pub async fn apply<C: ConnectionTrait>(
    db: &C,
    code: Option<&str>,
    subtotal: i64,
) -> AppResult<Option<AppliedPromotion>> {
    let Some(code) = code.map(normalize_code).filter(|c| !c.is_empty()) else {
        return Ok(None);
    };
    let promotion = find_by_code(db, &code)
        .await?
        .ok_or(PromotionError::Invalid)?;
    let applied = promotion.rule().evaluate(subtotal, Utc::now())?;
    tracing::debug!(code = %applied.code, discount = applied.discount_amount, "promotion applied");
    Ok(Some(applied))
}

pub async fn validate_code(
    state: &AppState,
    payload: ValidatePromotionRequest,
) -> AppResult<ApiResponse<AppliedPromotion>> {
    if payload.subtotal < 0 {
        return Err(AppError::BadRequest("subtotal cannot be negative".into()));
    }
    let applied = apply(&state.orm, Some(&payload.code), payload.subtotal)
        .await?
        .ok_or(PromotionError::Invalid)?;
    Ok(ApiResponse::success("Promotion applied", applied, None))
}

pub async fn list_promotions(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<PromotionList>> {
    ensure_admin(user)?;
    let items = Promotions::find()
        .order_by_desc(Column::CreatedAt)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Promotion::try_from)
        .collect::<AppResult<Vec<_>>>()?;
    Ok(ApiResponse::success("Promotions", PromotionList { items }, None))
}

fn validate_values(discount_value: i64, min_purchase: Option<i64>) -> AppResult<()> {
    if discount_value < 0 {
        return Err(AppError::BadRequest("discount_value cannot be negative".into()));
    }
    if min_purchase.is_some_and(|min| min < 0) {
        return Err(AppError::BadRequest("min_purchase cannot be negative".into()));
    }
    Ok(())
}

pub async fn create_promotion(
    state: &AppState,
    user: &AuthUser,
    payload: CreatePromotionRequest,
) -> AppResult<ApiResponse<Promotion>> {
    ensure_admin(user)?;
    let code = normalize_code(&payload.code);
    if code.is_empty() {
        return Err(AppError::BadRequest("code is required".into()));
    }
    validate_values(payload.discount_value, payload.min_purchase)?;

    let model = ActiveModel {
        id: Set(Uuid::new_v4()),
        code: Set(code),
        description: Set(payload.description),
        discount_type: Set(payload.discount_type.as_str().to_string()),
        discount_value: Set(payload.discount_value),
        min_purchase: Set(payload.min_purchase),
        start_date: Set(payload.start_date.map(Into::into)),
        end_date: Set(payload.end_date.map(Into::into)),
        active: Set(payload.active),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await
    .map_err(|e| AppError::on_unique_violation(e, CODE_CONSTRAINT, CODE_TAKEN))?;

    audit::record(
        &state.pool,
        Some(user.user_id),
        "promotion_create",
        "promotions",
        serde_json::json!({ "promotion_id": model.id, "code": model.code }),
    )
    .await;

    Ok(ApiResponse::success(
        "Promotion created",
        Promotion::try_from(model)?,
        Some(Meta::empty()),
    ))
}

pub async fn update_promotion(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdatePromotionRequest,
) -> AppResult<ApiResponse<Promotion>> {
    ensure_admin(user)?;
    let existing = Promotions::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;
    validate_values(
        payload.discount_value.unwrap_or(existing.discount_value),
        payload.min_purchase,
    )?;

    let mut active: ActiveModel = existing.into();
    if let Some(code) = payload.code {
        let code = normalize_code(&code);
        if code.is_empty() {
            return Err(AppError::BadRequest("code is required".into()));
        }
        active.code = Set(code);
    }
    if let Some(description) = payload.description {
        active.description = Set(Some(description));
    }
    if let Some(discount_type) = payload.discount_type {
        active.discount_type = Set(discount_type.as_str().to_string());
    }
    if let Some(discount_value) = payload.discount_value {
        active.discount_value = Set(discount_value);
    }
    if let Some(min_purchase) = payload.min_purchase {
        active.min_purchase = Set(Some(min_purchase));
    }
    if let Some(start_date) = payload.start_date {
        active.start_date = Set(Some(start_date.into()));
    }
    if let Some(end_date) = payload.end_date {
        active.end_date = Set(Some(end_date.into()));
    }
    if let Some(flag) = payload.active {
        active.active = Set(flag);
    }

    let model = active
        .update(&state.orm)
        .await
        .map_err(|e| AppError::on_unique_violation(e, CODE_CONSTRAINT, CODE_TAKEN))?;

    audit::record(
        &state.pool,
        Some(user.user_id),
        "promotion_update",
        "promotions",
        serde_json::json!({ "promotion_id": model.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Updated",
        Promotion::try_from(model)?,
        Some(Meta::empty()),
    ))
}

pub async fn delete_promotion(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    ensure_admin(user)?;
    let result = Promotions::delete_by_id(id).exec(&state.orm).await?;
    if result.rows_affected == 0 {
        return Err(AppError::NotFound);
    }

    audit::record(
        &state.pool,
        Some(user.user_id),
        "promotion_delete",
        "promotions",
        serde_json::json!({ "promotion_id": id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Deleted",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}
