// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Lesson completion route.

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::Progress;
use crate::routes::AppJson;
use crate::services::progress::LessonCompletion;
use crate::AppState;
use axum::{extract::State, routing::post, Extension, Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/lesson/complete", post(complete_lesson))
}

/// Request body. Fields are optional so a missing one reports which field
/// is required instead of a deserialization message.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompleteLessonRequest {
    pub course_id: Option<String>,
    /// Zero-based lesson index within the course
    pub lesson_id: Option<u32>,
}

#[derive(Debug, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "camelCase")]
pub struct ProgressView {
    pub course_id: String,
    pub lessons_completed: Vec<u32>,
    pub percentage: u8,
    pub completed: bool,
    pub certificate_issued: bool,
    #[cfg_attr(feature = "binding-generation", ts(type = "string | null"))]
    pub completed_at: Option<DateTime<Utc>>,
}

impl From<&Progress> for ProgressView {
    fn from(progress: &Progress) -> Self {
        Self {
            course_id: progress.course_id.clone(),
            lessons_completed: progress.lessons_completed.iter().copied().collect(),
            percentage: progress.percentage,
            completed: progress.is_complete(),
            certificate_issued: progress.certificate_issued,
            completed_at: progress.completed_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct CompleteLessonResponse {
    pub success: bool,
    pub message: String,
    pub data: ProgressView,
}

fn completion_message(completion: &LessonCompletion) -> &'static str {
    if completion.outcome.course_completed {
        "Congratulations! You have completed this course"
    } else if completion.outcome.newly_completed {
        "Lesson marked as complete"
    } else {
        "Lesson already completed"
    }
}

/// Mark a lesson complete for the current user.
async fn complete_lesson(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    AppJson(req): AppJson<CompleteLessonRequest>,
) -> Result<Json<CompleteLessonResponse>> {
    let (Some(course_id), Some(lesson_index)) = (req.course_id, req.lesson_id) else {
        return Err(AppError::BadRequest(
            "Course ID and lesson ID are required".to_string(),
        ));
    };

    let completion = state
        .progress
        .complete_lesson(&user.user_id, course_id.trim(), lesson_index)
        .await?;

    Ok(Json(CompleteLessonResponse {
        success: true,
        message: completion_message(&completion).to_string(),
        data: ProgressView::from(&completion.progress),
    }))
}
