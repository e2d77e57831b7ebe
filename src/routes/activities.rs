// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Activity log (notification) routes.

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::Activity;
use crate::routes::{ok, ApiResponse};
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

const DEFAULT_LIMIT: u32 = 50;
const MAX_LIMIT: u32 = 100;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/activities", get(list_activities))
        .route("/activities/unread-count", get(unread_count))
        .route("/activities/read-all", post(mark_all_read))
        .route("/activities/{id}/read", post(mark_read))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ActivitiesQuery {
    #[serde(default)]
    unread_only: bool,
    limit: Option<u32>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnreadCount {
    pub unread_count: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkedRead {
    pub updated: usize,
}

/// Clamp a requested page size to `1..=MAX_LIMIT`.
fn effective_limit(requested: Option<u32>) -> u32 {
    requested.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
}

/// The caller's activity entries, newest first.
async fn list_activities(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Query(params): Query<ActivitiesQuery>,
) -> Result<Json<ApiResponse<Vec<Activity>>>> {
    let activities = state
        .db
        .list_activities(
            &user.user_id,
            params.unread_only,
            effective_limit(params.limit),
        )
        .await?;
    Ok(ok(activities))
}

async fn unread_count(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<ApiResponse<UnreadCount>>> {
    let unread_count = state.db.count_unread_activities(&user.user_id).await?;
    Ok(ok(UnreadCount { unread_count }))
}

async fn mark_read(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<MarkedRead>>> {
    // Someone else's entry is reported as missing
    let activity = state
        .db
        .get_activity(&id)
        .await?
        .filter(|a| a.user_id == user.user_id)
        .ok_or_else(|| AppError::NotFound("Activity not found".to_string()))?;

    if activity.read {
        return Ok(ok(MarkedRead { updated: 0 }));
    }

    state.db.mark_activity_read(&activity).await?;
    Ok(ok(MarkedRead { updated: 1 }))
}

async fn mark_all_read(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<ApiResponse<MarkedRead>>> {
    let updated = state.db.mark_all_activities_read(&user.user_id).await?;
    Ok(ok(MarkedRead { updated }))
}
