// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Admin routes. Mounted behind `require_auth` and `require_admin`.

use crate::error::{AppError, Result};
use crate::id_utils::new_document_id;
use crate::middleware::auth::AuthUser;
use crate::models::{split_pair_document_id, Coupon, Course, Lesson, PurchaseStatus, Role};
use crate::routes::certificates::issue_and_log;
use crate::routes::lessons::ProgressView;
use crate::routes::payments::PurchaseView;
use crate::routes::{ok, ApiResponse, AppJson};
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post, put},
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

const DEFAULT_USER_PAGE: u32 = 50;
const MAX_USER_PAGE: u32 = 500;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/admin/stats", get(get_stats))
        .route("/admin/users", get(list_users))
        .route("/admin/courses", get(list_courses).post(create_course))
        .route("/admin/courses/{id}", put(update_course).delete(delete_course))
        .route("/admin/coupons", get(list_coupons).post(create_coupon))
        .route("/admin/certificates/issue", post(issue_certificate))
        .route("/admin/purchases/{id}/refund", post(refund_purchase))
}

// ─── Stats ───────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "camelCase")]
pub struct PlatformStats {
    pub total_users: usize,
    pub total_courses: usize,
    pub published_courses: usize,
    pub completed_purchases: usize,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub total_revenue: u64,
    pub certificates_issued: usize,
}

async fn get_stats(State(state): State<Arc<AppState>>) -> Result<Json<ApiResponse<PlatformStats>>> {
    let (total_users, courses, completed, certificates_issued) = tokio::try_join!(
        state.db.count_users(),
        state.db.list_courses(false),
        state.db.list_purchases_by_status(PurchaseStatus::Completed),
        state.db.count_issued_certificates(),
    )?;

    Ok(ok(PlatformStats {
        total_users,
        total_courses: courses.len(),
        published_courses: courses.iter().filter(|c| c.published).count(),
        completed_purchases: completed.len(),
        total_revenue: completed.iter().map(|p| p.amount).sum(),
        certificates_issued,
    }))
}

// ─── Users ───────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct UsersQuery {
    limit: Option<u32>,
}

/// User record without credentials.
#[derive(Debug, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "camelCase")]
pub struct AdminUserView {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub referred_by: Option<String>,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub referral_earnings: u64,
    #[cfg_attr(feature = "binding-generation", ts(type = "string"))]
    pub created_at: DateTime<Utc>,
}

async fn list_users(
    State(state): State<Arc<AppState>>,
    Query(params): Query<UsersQuery>,
) -> Result<Json<ApiResponse<Vec<AdminUserView>>>> {
    let limit = params
        .limit
        .unwrap_or(DEFAULT_USER_PAGE)
        .clamp(1, MAX_USER_PAGE);

    let users = state.db.list_users(limit).await?;
    Ok(ok(users
        .into_iter()
        .map(|u| AdminUserView {
            id: u.id,
            name: u.name,
            email: u.email,
            role: u.role,
            referred_by: u.referred_by,
            referral_earnings: u.referral_earnings,
            created_at: u.created_at,
        })
        .collect()))
}

// ─── Courses ─────────────────────────────────────────────────

#[derive(Debug, Deserialize, Validate)]
pub struct CourseRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub price: u64,
    pub thumbnail: Option<String>,
    pub category: Option<String>,
    #[serde(default)]
    pub published: bool,
    #[validate(length(min = 1))]
    pub lessons: Vec<Lesson>,
}

impl CourseRequest {
    fn check_lessons(&self) -> Result<()> {
        if self.lessons.iter().any(|l| l.title.trim().is_empty()) {
            return Err(AppError::BadRequest(
                "Every lesson needs a title".to_string(),
            ));
        }
        Ok(())
    }
}

async fn list_courses(State(state): State<Arc<AppState>>) -> Result<Json<ApiResponse<Vec<Course>>>> {
    Ok(ok(state.db.list_courses(false).await?))
}

async fn create_course(
    State(state): State<Arc<AppState>>,
    Extension(admin): Extension<AuthUser>,
    AppJson(req): AppJson<CourseRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Course>>)> {
    req.validate()?;
    req.check_lessons()?;

    let now = Utc::now();
    let course = Course {
        id: new_document_id()?,
        title: req.title.trim().to_string(),
        description: req.description,
        price: req.price,
        thumbnail: req.thumbnail,
        category: req.category,
        published: req.published,
        lessons: req.lessons,
        created_at: now,
        updated_at: now,
    };
    state.db.upsert_course(&course).await?;

    tracing::info!(admin_id = %admin.user_id, course_id = %course.id, "Course created");
    Ok((StatusCode::CREATED, ok(course)))
}

/// Replace a course's content. Existing progress percentages are not
/// recomputed when the lesson list changes.
async fn update_course(
    State(state): State<Arc<AppState>>,
    Extension(admin): Extension<AuthUser>,
    Path(id): Path<String>,
    AppJson(req): AppJson<CourseRequest>,
) -> Result<Json<ApiResponse<Course>>> {
    req.validate()?;
    req.check_lessons()?;

    let mut course = state
        .db
        .get_course(&id)
        .await?
        .ok_or_else(|| AppError::NotFound("Course not found".to_string()))?;

    course.title = req.title.trim().to_string();
    course.description = req.description;
    course.price = req.price;
    course.thumbnail = req.thumbnail;
    course.category = req.category;
    course.published = req.published;
    course.lessons = req.lessons;
    course.updated_at = Utc::now();
    state.db.upsert_course(&course).await?;

    tracing::info!(admin_id = %admin.user_id, course_id = %course.id, "Course updated");
    Ok(ok(course))
}

/// Delete a course nobody has paid for. Courses with enrollments should be
/// unpublished instead.
async fn delete_course(
    State(state): State<Arc<AppState>>,
    Extension(admin): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    if state.db.get_course(&id).await?.is_none() {
        return Err(AppError::NotFound("Course not found".to_string()));
    }

    let purchases = state.db.list_purchases_for_course(&id).await?;
    if purchases
        .iter()
        .any(|p| matches!(p.status, PurchaseStatus::Completed | PurchaseStatus::Refunded))
    {
        return Err(AppError::Conflict(
            "Course has enrollments; unpublish it instead".to_string(),
        ));
    }

    state.db.delete_course(&id).await?;
    tracing::info!(admin_id = %admin.user_id, course_id = %id, "Course deleted");
    Ok(StatusCode::NO_CONTENT)
}

// ─── Coupons ─────────────────────────────────────────────────

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CouponRequest {
    #[validate(length(min = 3, max = 32))]
    pub code: String,
    #[validate(range(min = 1, max = 100))]
    pub discount_percent: u8,
    pub usage_limit: Option<u32>,
    pub expires_at: Option<DateTime<Utc>>,
}

async fn list_coupons(State(state): State<Arc<AppState>>) -> Result<Json<ApiResponse<Vec<Coupon>>>> {
    Ok(ok(state.db.list_coupons().await?))
}

async fn create_coupon(
    State(state): State<Arc<AppState>>,
    AppJson(req): AppJson<CouponRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Coupon>>)> {
    req.validate()?;

    let code = Coupon::normalize_code(&req.code);
    if !code.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(AppError::BadRequest(
            "Coupon code must be letters and digits only".to_string(),
        ));
    }
    if state.db.get_coupon(&code).await?.is_some() {
        return Err(AppError::Conflict(format!("Coupon {} already exists", code)));
    }

    let coupon = Coupon {
        code,
        discount_percent: req.discount_percent,
        usage_limit: req.usage_limit,
        usage_count: 0,
        active: true,
        expires_at: req.expires_at,
        created_at: Utc::now(),
    };
    state.db.upsert_coupon(&coupon).await?;

    tracing::info!(code = %coupon.code, discount = coupon.discount_percent, "Coupon created");
    Ok((StatusCode::CREATED, ok(coupon)))
}

// ─── Certificates & Refunds ──────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueCertificateRequest {
    pub user_id: Option<String>,
    pub course_id: Option<String>,
}

/// Issue a certificate for any user whose course is complete.
async fn issue_certificate(
    State(state): State<Arc<AppState>>,
    Extension(admin): Extension<AuthUser>,
    AppJson(req): AppJson<IssueCertificateRequest>,
) -> Result<Json<ApiResponse<ProgressView>>> {
    let (Some(user_id), Some(course_id)) = (req.user_id, req.course_id) else {
        return Err(AppError::BadRequest(
            "User ID and course ID are required".to_string(),
        ));
    };

    tracing::info!(admin_id = %admin.user_id, user_id = %user_id, course_id = %course_id, "Admin certificate issuance");
    let progress = issue_and_log(&state, &user_id, &course_id).await?;
    Ok(ok(ProgressView::from(&progress)))
}

/// Refund a purchase by its ID (`"{userId}_{courseId}"`).
async fn refund_purchase(
    State(state): State<Arc<AppState>>,
    Extension(admin): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<PurchaseView>>> {
    let (user_id, course_id) = split_pair_document_id(&id)
        .ok_or_else(|| AppError::NotFound("Purchase not found".to_string()))?;

    tracing::info!(admin_id = %admin.user_id, purchase_id = %id, "Admin refund");
    let purchase = state.enrollment.refund(user_id, course_id).await?;
    Ok(ok(PurchaseView::from(&purchase)))
}
