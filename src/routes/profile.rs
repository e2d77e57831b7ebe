// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Profile routes for the signed-in user.

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::{ActivityKind, NotificationPreferences, Role, User};
use crate::routes::auth::normalize_email;
use crate::routes::{ok, ApiResponse, AppJson};
use crate::services::password::{hash_password, verify_password};
use crate::time_utils::format_utc_rfc3339;
use crate::AppState;
use axum::{
    extract::State,
    routing::{get, put},
    Extension, Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/profile",
            get(get_profile).put(update_profile).delete(delete_profile),
        )
        .route("/profile/password", put(change_password))
        .route("/profile/notifications", put(update_notifications))
}

// ─── Profile ─────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "camelCase")]
pub struct ProfileResponse {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub referral_code: String,
    pub notification_preferences: NotificationPreferences,
    /// RFC3339, UTC
    pub member_since: String,
}

impl From<&User> for ProfileResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            name: user.name.clone(),
            email: user.email.clone(),
            role: user.role,
            referral_code: user.referral_code.clone(),
            notification_preferences: user.notification_preferences.clone(),
            member_since: format_utc_rfc3339(user.created_at),
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateProfileRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    #[validate(length(min = 1))]
    pub current_password: String,
    #[validate(length(min = 8, max = 128))]
    pub new_password: String,
}

async fn load_user(state: &AppState, user_id: &str) -> Result<User> {
    state
        .db
        .get_user(user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))
}

async fn get_profile(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<ApiResponse<ProfileResponse>>> {
    let user = load_user(&state, &auth.user_id).await?;
    Ok(ok(ProfileResponse::from(&user)))
}

async fn update_profile(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    AppJson(req): AppJson<UpdateProfileRequest>,
) -> Result<Json<ApiResponse<ProfileResponse>>> {
    req.validate()?;
    let mut user = load_user(&state, &auth.user_id).await?;

    if let Some(name) = req.name {
        user.name = name.trim().to_string();
    }
    if let Some(email) = req.email {
        let email = normalize_email(&email);
        if email != user.email {
            if state.db.find_user_by_email(&email).await?.is_some() {
                return Err(AppError::Conflict(
                    "An account with this email already exists".to_string(),
                ));
            }
            user.email = email;
        }
    }
    user.updated_at = Utc::now();
    state.db.upsert_user(&user).await?;

    Ok(ok(ProfileResponse::from(&user)))
}

async fn change_password(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    AppJson(req): AppJson<ChangePasswordRequest>,
) -> Result<Json<ApiResponse<bool>>> {
    req.validate()?;
    let mut user = load_user(&state, &auth.user_id).await?;

    if !verify_password(&req.current_password, &user.password_hash)? {
        return Err(AppError::BadRequest(
            "Current password is incorrect".to_string(),
        ));
    }

    user.password_hash = hash_password(&req.new_password)?;
    user.updated_at = Utc::now();
    state.db.upsert_user(&user).await?;

    tracing::info!(user_id = %user.id, "Password changed");
    state
        .activity_log
        .record_or_warn(
            &user.id,
            ActivityKind::Account,
            "Password changed",
            "Your password was changed.".to_string(),
            None,
        )
        .await;

    Ok(ok(true))
}

async fn update_notifications(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    AppJson(prefs): AppJson<NotificationPreferences>,
) -> Result<Json<ApiResponse<NotificationPreferences>>> {
    let mut user = load_user(&state, &auth.user_id).await?;
    user.notification_preferences = prefs;
    user.updated_at = Utc::now();
    state.db.upsert_user(&user).await?;

    Ok(ok(user.notification_preferences))
}

// ─── Account Deletion ────────────────────────────────────────

#[derive(Debug, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "camelCase")]
pub struct DeleteAccountResponse {
    pub deleted_documents: usize,
}

/// Delete the caller's account and all associated data.
///
/// Accounts holding financial records (paid enrollments or referral
/// earnings) cannot be self-deleted.
async fn delete_profile(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<ApiResponse<DeleteAccountResponse>>> {
    let (user, purchases) = tokio::try_join!(
        load_user(&state, &auth.user_id),
        state.db.list_purchases_for_user(&auth.user_id),
    )?;

    if purchases.iter().any(|p| p.is_completed()) || user.referral_earnings > 0 {
        return Err(AppError::Conflict(
            "Accounts with purchases or referral earnings cannot be deleted; contact support"
                .to_string(),
        ));
    }

    tracing::info!(user_id = %user.id, "User-initiated account deletion");
    let deleted_documents = state.db.delete_user_data(&user.id).await?;

    Ok(ok(DeleteAccountResponse { deleted_documents }))
}
