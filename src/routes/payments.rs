// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Payment routes: checkout, verification and the gateway webhook.

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::Purchase;
use crate::routes::{ok, ApiResponse, AppJson};
use crate::services::enrollment::CheckoutSession;
use crate::services::payments::SIGNATURE_HEADER;
use crate::AppState;
use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Routes for signed-in users.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/payments/initialize", post(initialize_payment))
        .route("/payments/verify/{reference}", get(verify_payment))
}

/// Gateway callback (authenticated by signature, not session).
pub fn public_routes() -> Router<Arc<AppState>> {
    Router::new().route("/payments/webhook", post(payment_webhook))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializePaymentRequest {
    pub course_id: Option<String>,
    pub coupon_code: Option<String>,
}

/// Purchase state as returned to the buyer.
#[derive(Debug, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseView {
    pub course_id: String,
    pub reference: String,
    pub status: String,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub amount: u64,
    pub coupon_code: Option<String>,
    #[cfg_attr(feature = "binding-generation", ts(type = "string | null"))]
    pub completed_at: Option<DateTime<Utc>>,
}

impl From<&Purchase> for PurchaseView {
    fn from(purchase: &Purchase) -> Self {
        Self {
            course_id: purchase.course_id.clone(),
            reference: purchase.reference.clone(),
            status: purchase.status.as_str().to_string(),
            amount: purchase.amount,
            coupon_code: purchase.coupon_code.clone(),
            completed_at: purchase.completed_at,
        }
    }
}

/// Start a purchase for the current user.
async fn initialize_payment(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    AppJson(req): AppJson<InitializePaymentRequest>,
) -> Result<Json<ApiResponse<CheckoutSession>>> {
    let course_id = req
        .course_id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| AppError::BadRequest("Course ID is required".to_string()))?;

    let user = state
        .db
        .get_user(&auth.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    let session = state
        .enrollment
        .checkout(&user, course_id, req.coupon_code.as_deref())
        .await?;

    Ok(ok(session))
}

/// Confirm a payment with the gateway after the buyer returns from checkout.
async fn verify_payment(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(reference): Path<String>,
) -> Result<Json<ApiResponse<PurchaseView>>> {
    let purchase = state.enrollment.verify(&auth.user_id, &reference).await?;
    Ok(ok(PurchaseView::from(&purchase)))
}

/// Gateway webhook. The signature covers the raw body, so it is read as bytes.
async fn payment_webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<StatusCode> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|h| h.to_str().ok());

    state.enrollment.handle_webhook(&body, signature).await?;
    Ok(StatusCode::OK)
}
