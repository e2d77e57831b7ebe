// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod activity;
pub mod coupon;
pub mod course;
pub mod progress;
pub mod purchase;
pub mod review;
pub mod user;

pub use activity::{Activity, ActivityKind, Priority};
pub use coupon::Coupon;
pub use course::{Course, Lesson};
pub use progress::{LessonOutcome, Progress};
pub use purchase::{Purchase, PurchaseStatus};
pub use review::Review;
pub use user::{NotificationPreferences, Role, User};

/// Document ID for records that are unique per (user, course) pair.
pub fn pair_document_id(user_id: &str, course_id: &str) -> String {
    format!("{}_{}", user_id, course_id)
}

/// Inverse of [`pair_document_id`].
pub fn split_pair_document_id(id: &str) -> Option<(&str, &str)> {
    let (user_id, course_id) = id.split_once('_')?;
    if user_id.is_empty() || course_id.is_empty() || course_id.contains('_') {
        return None;
    }
    Some((user_id, course_id))
}
