// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Course review routes.

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::review::average_rating;
use crate::models::{pair_document_id, Review};
use crate::routes::{ok, ApiResponse, AppJson};
use crate::AppState;
use axum::{
    extract::{Path, State},
    routing::{get, post},
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;
use validator::Validate;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/course/{id}/reviews", get(list_reviews).post(submit_review))
        .route("/reviews/{id}/vote", post(vote_review))
}

#[derive(Debug, Deserialize, Validate)]
pub struct ReviewRequest {
    #[validate(range(min = 1, max = 5))]
    pub rating: u8,
    #[serde(default)]
    #[validate(length(max = 2000))]
    pub comment: String,
}

#[derive(Debug, Deserialize)]
pub struct VoteRequest {
    pub helpful: bool,
}

#[derive(Debug, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "camelCase")]
pub struct ReviewView {
    pub id: String,
    pub user_name: String,
    pub rating: u8,
    pub comment: String,
    pub helpful_count: usize,
    pub not_helpful_count: usize,
    #[cfg_attr(feature = "binding-generation", ts(type = "string"))]
    pub created_at: DateTime<Utc>,
}

impl From<&Review> for ReviewView {
    fn from(review: &Review) -> Self {
        Self {
            id: review.document_id(),
            user_name: review.user_name.clone(),
            rating: review.rating,
            comment: review.comment.clone(),
            helpful_count: review.helpful_votes.len(),
            not_helpful_count: review.not_helpful_votes.len(),
            created_at: review.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "camelCase")]
pub struct CourseReviews {
    pub average_rating: f64,
    pub count: usize,
    pub reviews: Vec<ReviewView>,
}

/// Reviews for a course, most helpful first.
async fn list_reviews(
    State(state): State<Arc<AppState>>,
    Path(course_id): Path<String>,
) -> Result<Json<ApiResponse<CourseReviews>>> {
    let mut reviews = state.db.list_reviews_for_course(&course_id).await?;
    reviews.sort_by(|a, b| {
        b.helpful_votes
            .len()
            .cmp(&a.helpful_votes.len())
            .then_with(|| b.created_at.cmp(&a.created_at))
    });

    Ok(ok(CourseReviews {
        average_rating: average_rating(&reviews),
        count: reviews.len(),
        reviews: reviews.iter().map(ReviewView::from).collect(),
    }))
}

/// Create or replace the caller's review of a course they are enrolled in.
async fn submit_review(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(course_id): Path<String>,
    AppJson(req): AppJson<ReviewRequest>,
) -> Result<Json<ApiResponse<ReviewView>>> {
    req.validate()?;

    let review_id = pair_document_id(&auth.user_id, &course_id);
    let (user, purchase, existing) = tokio::try_join!(
        state.db.get_user(&auth.user_id),
        state.db.get_purchase(&auth.user_id, &course_id),
        state.db.get_review(&review_id),
    )?;
    let user = user.ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    if !purchase.is_some_and(|p| p.is_completed()) {
        return Err(AppError::Forbidden(
            "Only enrolled students can review this course".to_string(),
        ));
    }

    let now = Utc::now();
    // Editing keeps existing votes
    let review = match existing {
        Some(mut review) => {
            review.rating = req.rating;
            review.comment = req.comment.trim().to_string();
            review.user_name = user.name;
            review.updated_at = now;
            review
        }
        None => Review {
            user_id: auth.user_id.clone(),
            user_name: user.name,
            course_id: course_id.clone(),
            rating: req.rating,
            comment: req.comment.trim().to_string(),
            helpful_votes: BTreeSet::new(),
            not_helpful_votes: BTreeSet::new(),
            created_at: now,
            updated_at: now,
        },
    };
    state.db.upsert_review(&review).await?;

    tracing::info!(
        user_id = %auth.user_id,
        course_id = %course_id,
        rating = review.rating,
        "Review saved"
    );

    Ok(ok(ReviewView::from(&review)))
}

/// Vote a review helpful or not helpful.
async fn vote_review(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(review_id): Path<String>,
    AppJson(req): AppJson<VoteRequest>,
) -> Result<Json<ApiResponse<ReviewView>>> {
    let review = state
        .db
        .vote_review_atomic(&review_id, &auth.user_id, req.helpful)
        .await?;
    Ok(ok(ReviewView::from(&review)))
}
