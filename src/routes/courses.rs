// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Course catalog routes.

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::routes::{ok, ApiResponse};
use crate::services::catalog::{build_course_detail, build_course_views, CourseDetail, CourseView};
use crate::AppState;
use axum::{
    extract::{Path, State},
    routing::get,
    Extension, Json, Router,
};
use std::sync::Arc;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/course", get(list_courses))
        .route("/course/{id}", get(get_course))
}

/// Published courses, annotated with the caller's enrollment and progress.
async fn list_courses(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<ApiResponse<Vec<CourseView>>>> {
    let (courses, purchases, progress) = tokio::try_join!(
        state.db.list_courses(true),
        state.db.list_purchases_for_user(&user.user_id),
        state.db.list_progress_for_user(&user.user_id),
    )?;

    Ok(ok(build_course_views(&courses, &purchases, &progress)))
}

/// One course with its lessons.
///
/// Unpublished courses stay visible to students who already bought them.
async fn get_course(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<CourseDetail>>> {
    let not_found = || AppError::NotFound("Course not found".to_string());

    let (course, purchase, progress) = tokio::try_join!(
        state.db.get_course(&id),
        state.db.get_purchase(&user.user_id, &id),
        state.db.get_progress(&user.user_id, &id),
    )?;
    let course = course.ok_or_else(not_found)?;

    let enrolled = purchase.as_ref().is_some_and(|p| p.is_completed());
    if !course.published && !enrolled && !user.is_admin() {
        return Err(not_found());
    }

    Ok(ok(build_course_detail(
        &course,
        purchase.as_ref(),
        progress.as_ref(),
    )))
}
