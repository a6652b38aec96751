use chrono::Utc;
use sea_orm::sea_query::OnConflict;
use sea_orm::{ActiveModelTrait, EntityTrait, Set};

use crate::{
    audit,
    domain::address::is_valid_email,
    dto::{
        auth::MIN_PASSWORD_LEN,
        profiles::{ChangePasswordRequest, UpdateProfileRequest},
    },
    entity::{
        profiles::{
            ActiveModel as ProfileActive, Column as ProfileCol, Entity as Profiles,
            Model as ProfileModel,
        },
        users::{ActiveModel as UserActive, Entity as Users},
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::Profile,
    response::{ApiResponse, Meta},
    services::auth_service::hash_password,
    state::AppState,
};

/// Blank strings clear a field.
fn non_blank(value: String) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

pub fn check_new_password(payload: &ChangePasswordRequest) -> AppResult<()> {
    if payload.new_password != payload.confirm_password {
        return Err(AppError::BadRequest("Passwords do not match".into()));
    }
    if payload.new_password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::BadRequest(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

async fn find_or_create(state: &AppState, user: &AuthUser) -> AppResult<ProfileModel> {
    if let Some(profile) = Profiles::find_by_id(user.user_id).one(&state.orm).await? {
        return Ok(profile);
    }

    let account = Users::find_by_id(user.user_id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    let blank = ProfileActive {
        id: Set(user.user_id),
        first_name: Set(None),
        last_name: Set(None),
        email: Set(Some(account.email)),
        phone: Set(None),
        address: Set(None),
        city: Set(None),
        postal_code: Set(None),
        country: Set(None),
        updated_at: Set(Utc::now().into()),
    };
    // Concurrent first requests race here; the loser's insert is a no-op.
    let inserted = Profiles::insert(blank)
        .on_conflict(OnConflict::column(ProfileCol::Id).do_nothing().to_owned())
        .exec_without_returning(&state.orm)
        .await?;
    if inserted > 0 {
        tracing::debug!(user_id = %user.user_id, "profile created");
    }

    Profiles::find_by_id(user.user_id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)
}

pub async fn get_profile(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<Profile>> {
    let profile = find_or_create(state, user).await?;
    Ok(ApiResponse::success("Profile", Profile::from(profile), None))
}

pub async fn update_profile(
    state: &AppState,
    user: &AuthUser,
    payload: UpdateProfileRequest,
) -> AppResult<ApiResponse<Profile>> {
    let existing = find_or_create(state, user).await?;
    let mut active: ProfileActive = existing.into();

    if let Some(email) = payload.email {
        let email = non_blank(email);
        if email.as_deref().is_some_and(|e| !is_valid_email(e)) {
            return Err(AppError::BadRequest("Please enter a valid email address".into()));
        }
        active.email = Set(email);
    }
    if let Some(first_name) = payload.first_name {
        active.first_name = Set(non_blank(first_name));
    }
    if let Some(last_name) = payload.last_name {
        active.last_name = Set(non_blank(last_name));
    }
    if let Some(phone) = payload.phone {
        active.phone = Set(non_blank(phone));
    }
    if let Some(address) = payload.address {
        active.address = Set(non_blank(address));
    }
    if let Some(city) = payload.city {
        active.city = Set(non_blank(city));
    }
    if let Some(postal_code) = payload.postal_code {
        active.postal_code = Set(non_blank(postal_code));
    }
    if let Some(country) = payload.country {
        active.country = Set(non_blank(country));
    }
    active.updated_at = Set(Utc::now().into());

    let profile = active.update(&state.orm).await?;

    audit::record(
        &state.pool,
        Some(user.user_id),
        "profile_update",
        "profiles",
        serde_json::json!({ "user_id": user.user_id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Profile updated",
        Profile::from(profile),
        Some(Meta::empty()),
    ))
}

pub async fn change_password(
    state: &AppState,
    user: &AuthUser,
    payload: ChangePasswordRequest,
) -> AppResult<ApiResponse<serde_json::Value>> {
    check_new_password(&payload)?;

    let account = Users::find_by_id(user.user_id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    let mut active: UserActive = account.into();
    active.password_hash = Set(hash_password(&payload.new_password)?);
    active.update(&state.orm).await?;

    audit::record(
        &state.pool,
        Some(user.user_id),
        "password_change",
        "users",
        serde_json::json!({ "user_id": user.user_id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Password updated",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(new: &str, confirm: &str) -> ChangePasswordRequest {
        ChangePasswordRequest {
            new_password: new.into(),
            confirm_password: confirm.into(),
        }
    }

    #[test]
    fn password_rules() {
        assert!(check_new_password(&request("secret1", "secret1")).is_ok());
        assert!(check_new_password(&request("secret", "secret")).is_ok());

        let err = check_new_password(&request("secret1", "secret2")).unwrap_err();
        assert_eq!(err.to_string(), "Passwords do not match");

        let err = check_new_password(&request("abc", "abc")).unwrap_err();
        assert_eq!(err.to_string(), "Password must be at least 6 characters");
    }

    #[test]
    fn blank_values_clear_fields() {
        assert_eq!(non_blank("  ".into()), None);
        assert_eq!(non_blank(" Lyon ".into()), Some("Lyon".into()));
    }
}
