// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Certificate routes: listing, issuance and public verification.

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::{ActivityKind, Course};
use crate::routes::{lessons::ProgressView, ok, ApiResponse};
use crate::services::certificates::{
    build_certificate_views, evaluate_verification, parse_certificate_id, CertificateView,
    Verification,
};
use crate::AppState;
use axum::{
    extract::{Path, State},
    routing::{get, post},
    Extension, Json, Router,
};
use futures_util::stream::{self, StreamExt, TryStreamExt};
use std::sync::Arc;

/// Concurrent course lookups when listing certificates.
const COURSE_FETCH_CONCURRENCY: usize = 8;

/// Routes for signed-in users.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/certificates", get(list_certificates))
        .route("/certificates/{course_id}/issue", post(issue_certificate))
}

/// Routes that need no session.
pub fn public_routes() -> Router<Arc<AppState>> {
    Router::new().route("/certificates/verify/{certificate_id}", get(verify_certificate))
}

/// One entry per purchased course, available certificates first.
async fn list_certificates(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<ApiResponse<Vec<CertificateView>>>> {
    let (purchases, progress) = tokio::try_join!(
        state.db.list_purchases_for_user(&user.user_id),
        state.db.list_progress_for_user(&user.user_id),
    )?;

    let course_ids: Vec<String> = purchases
        .iter()
        .filter(|p| p.is_completed())
        .map(|p| p.course_id.clone())
        .collect();

    let db = &state.db;
    let courses: Vec<Course> = stream::iter(course_ids)
        .map(|id| async move { db.get_course(&id).await })
        .buffer_unordered(COURSE_FETCH_CONCURRENCY)
        .try_filter_map(|course| async move { Ok(course) })
        .try_collect()
        .await?;

    Ok(ok(build_certificate_views(
        &user.user_id,
        &purchases,
        &courses,
        &progress,
    )))
}

/// Issue the caller's certificate for a completed course. Idempotent.
async fn issue_certificate(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(course_id): Path<String>,
) -> Result<Json<ApiResponse<ProgressView>>> {
    let enrolled = state
        .db
        .get_purchase(&user.user_id, &course_id)
        .await?
        .is_some_and(|p| p.is_completed());
    if !enrolled {
        return Err(AppError::Forbidden(
            "You are not enrolled in this course".to_string(),
        ));
    }

    let progress = issue_and_log(&state, &user.user_id, &course_id).await?;
    Ok(ok(ProgressView::from(&progress)))
}

/// Set the issuance flag and log the activity on first issuance.
///
/// Shared with the admin issuance route.
pub async fn issue_and_log(
    state: &AppState,
    user_id: &str,
    course_id: &str,
) -> Result<crate::models::Progress> {
    let (progress, newly_issued) = state.db.issue_certificate_atomic(user_id, course_id).await?;

    if newly_issued {
        tracing::info!(user_id, course_id, "Certificate issued");
        let course_title = state
            .db
            .get_course(course_id)
            .await?
            .map(|c| c.title)
            .unwrap_or_else(|| "your course".to_string());
        state
            .activity_log
            .record_or_warn(
                user_id,
                ActivityKind::CertificateIssued,
                "Certificate issued",
                format!("Your certificate for {} is ready", course_title),
                Some(course_id),
            )
            .await;
    }

    Ok(progress)
}

/// Public verification of `"{userId}-{courseId}"`.
async fn verify_certificate(
    State(state): State<Arc<AppState>>,
    Path(certificate_id): Path<String>,
) -> Result<Verification> {
    let Some((user_id, course_id)) = parse_certificate_id(&certificate_id) else {
        return Ok(Verification::NotFound("Certificate not found"));
    };

    let (user, course, purchase, progress) = tokio::try_join!(
        state.db.get_user(user_id),
        state.db.get_course(course_id),
        state.db.get_purchase(user_id, course_id),
        state.db.get_progress(user_id, course_id),
    )?;

    let verification = evaluate_verification(
        user.as_ref(),
        course.as_ref(),
        purchase.as_ref(),
        progress.as_ref(),
    );

    tracing::debug!(
        certificate_id = %certificate_id,
        valid = matches!(verification, Verification::Valid(_)),
        "Certificate verification"
    );

    Ok(verification)
}
