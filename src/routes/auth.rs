// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Email/password authentication routes.

use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::error::{AppError, Result};
use crate::id_utils::{new_document_id, new_referral_code};
use crate::middleware::auth::{create_jwt, SESSION_COOKIE, SESSION_DAYS};
use crate::models::{NotificationPreferences, Role, User};
use crate::routes::{ok, ApiResponse, AppJson};
use crate::services::password::{hash_password, verify_password};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/signup", post(signup))
        .route("/auth/login", post(login))
        .route("/auth/logout", post(logout))
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SignupRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 8, max = 128))]
    pub password: String,
    pub referral_code: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1))]
    pub password: String,
}

/// Public view of the signed-in user.
#[derive(Debug, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "camelCase")]
pub struct SessionUser {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub referral_code: String,
}

impl From<&User> for SessionUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            name: user.name.clone(),
            email: user.email.clone(),
            role: user.role,
            referral_code: user.referral_code.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct SessionResponse {
    pub token: String,
    pub user: SessionUser,
}

/// Normalize an email address for storage and lookup.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn session_cookie(token: String, secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::days(SESSION_DAYS))
        .build()
}

fn start_session(
    state: &AppState,
    jar: CookieJar,
    user: &User,
) -> Result<(CookieJar, Json<ApiResponse<SessionResponse>>)> {
    let token = create_jwt(&user.id, user.role, &state.config.jwt_signing_key)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("JWT creation failed: {}", e)))?;

    let secure = state.config.frontend_url.starts_with("https://");
    let jar = jar.add(session_cookie(token.clone(), secure));

    Ok((
        jar,
        ok(SessionResponse {
            token,
            user: SessionUser::from(user),
        }),
    ))
}

/// Create an account and start a session.
async fn signup(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    AppJson(req): AppJson<SignupRequest>,
) -> Result<(StatusCode, CookieJar, Json<ApiResponse<SessionResponse>>)> {
    req.validate()?;

    let email = normalize_email(&req.email);
    if state.db.find_user_by_email(&email).await?.is_some() {
        return Err(AppError::Conflict(
            "An account with this email already exists".to_string(),
        ));
    }

    // Unknown referral codes are ignored rather than failing signup
    let referred_by = match req.referral_code.as_deref().map(str::trim) {
        Some(code) if !code.is_empty() => state
            .db
            .find_user_by_referral_code(&code.to_uppercase())
            .await?
            .map(|referrer| referrer.id),
        _ => None,
    };

    let password_hash = hash_password(&req.password)?;
    let now = Utc::now();
    let user = User {
        id: new_document_id()?,
        name: req.name.trim().to_string(),
        email,
        password_hash,
        role: Role::Student,
        referral_code: new_referral_code()?,
        referred_by,
        referral_earnings: 0,
        notification_preferences: NotificationPreferences::default(),
        created_at: now,
        updated_at: now,
    };
    state.db.upsert_user(&user).await?;

    tracing::info!(
        user_id = %user.id,
        referred = user.referred_by.is_some(),
        "User signed up"
    );

    let (jar, body) = start_session(&state, jar, &user)?;
    Ok((StatusCode::CREATED, jar, body))
}

/// Verify credentials and start a session.
async fn login(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    AppJson(req): AppJson<LoginRequest>,
) -> Result<(CookieJar, Json<ApiResponse<SessionResponse>>)> {
    req.validate()?;

    let user = state
        .db
        .find_user_by_email(&normalize_email(&req.email))
        .await?
        .ok_or(AppError::InvalidCredentials)?;

    if !verify_password(&req.password, &user.password_hash)? {
        tracing::info!(user_id = %user.id, "Login failed: wrong password");
        return Err(AppError::InvalidCredentials);
    }

    tracing::info!(user_id = %user.id, "User logged in");
    start_session(&state, jar, &user)
}

/// Logout - clears the session cookie. Bearer tokens are dropped client-side.
async fn logout(jar: CookieJar) -> (StatusCode, CookieJar) {
    let jar = jar.remove(Cookie::build(SESSION_COOKIE).path("/"));
    (StatusCode::NO_CONTENT, jar)
}
