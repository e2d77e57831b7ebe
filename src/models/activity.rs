// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Per-user activity log / notification entries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    Enrollment,
    LessonCompleted,
    CourseCompleted,
    CertificateIssued,
    PaymentFailed,
    Refund,
    ReferralEarned,
    Account,
}

impl ActivityKind {
    pub fn category(&self) -> &'static str {
        match self {
            ActivityKind::LessonCompleted
            | ActivityKind::CourseCompleted
            | ActivityKind::CertificateIssued => "learning",
            ActivityKind::Enrollment | ActivityKind::PaymentFailed | ActivityKind::Refund => {
                "billing"
            }
            ActivityKind::ReferralEarned => "referral",
            ActivityKind::Account => "account",
        }
    }

    pub fn default_priority(&self) -> Priority {
        match self {
            ActivityKind::LessonCompleted => Priority::Low,
            ActivityKind::CourseCompleted
            | ActivityKind::CertificateIssued
            | ActivityKind::PaymentFailed => Priority::High,
            _ => Priority::Normal,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Normal,
    High,
}

/// Activity entry stored in Firestore. Append-only apart from `read`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Activity {
    /// Document ID
    pub id: String,
    pub user_id: String,
    pub kind: ActivityKind,
    pub title: String,
    pub message: String,
    pub category: String,
    pub priority: Priority,
    #[serde(default)]
    pub read: bool,
    /// Related course, if any
    #[serde(default)]
    pub course_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Activity {
    /// New unread entry with category and priority derived from `kind`.
    pub fn new(
        id: String,
        user_id: &str,
        kind: ActivityKind,
        title: impl Into<String>,
        message: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            user_id: user_id.to_string(),
            kind,
            title: title.into(),
            message: message.into(),
            category: kind.category().to_string(),
            priority: kind.default_priority(),
            read: false,
            course_id: None,
            created_at: now,
        }
    }

    pub fn with_course(mut self, course_id: &str) -> Self {
        self.course_id = Some(course_id.to_string());
        self
    }
}
