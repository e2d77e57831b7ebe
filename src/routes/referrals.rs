// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Referral program summary.

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::routes::{ok, ApiResponse};
use crate::AppState;
use axum::{extract::State, routing::get, Extension, Json, Router};
use serde::Serialize;
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/referrals", get(get_referrals))
}

#[derive(Debug, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "camelCase")]
pub struct ReferralSummary {
    pub referral_code: String,
    /// Signup link carrying the code
    pub referral_link: String,
    pub referred_users: usize,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub total_earnings: u64,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub commission_percent: u64,
}

async fn get_referrals(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<ApiResponse<ReferralSummary>>> {
    let (user, referred) = tokio::try_join!(
        state.db.get_user(&auth.user_id),
        state.db.list_referred_users(&auth.user_id),
    )?;
    let user = user.ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    Ok(ok(ReferralSummary {
        referral_link: format!(
            "{}/signup?ref={}",
            state.config.frontend_url, user.referral_code
        ),
        referral_code: user.referral_code,
        referred_users: referred.len(),
        total_earnings: user.referral_earnings,
        commission_percent: state.config.referral_commission_percent,
    }))
}
