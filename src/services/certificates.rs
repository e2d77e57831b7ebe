// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Certificate eligibility and public verification.
//!
//! A certificate is available only when the course is at 100% **and** the
//! issuance flag is set. Neither enrollment nor partial progress is enough,
//! and a stray issuance flag on an incomplete course does not count.

use crate::models::{Course, Progress, Purchase, User};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::HashMap;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Public certificate identifier: `"{user_id}-{course_id}"`.
pub fn certificate_id(user_id: &str, course_id: &str) -> String {
    format!("{}-{}", user_id, course_id)
}

/// Split a certificate identifier into (user_id, course_id).
///
/// Document IDs never contain `-`, so the first one is the separator.
pub fn parse_certificate_id(id: &str) -> Option<(&str, &str)> {
    let (user_id, course_id) = id.split_once('-')?;
    if user_id.is_empty() || course_id.is_empty() || course_id.contains('-') {
        return None;
    }
    Some((user_id, course_id))
}

/// Certificate entry on the user's certificates page.
#[derive(Debug, Clone, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "camelCase")]
pub struct CertificateView {
    pub certificate_id: String,
    pub course_id: String,
    pub course_title: String,
    pub progress: u8,
    pub available: bool,
    #[cfg_attr(feature = "binding-generation", ts(type = "string | null"))]
    pub completed_at: Option<DateTime<Utc>>,
    #[cfg_attr(feature = "binding-generation", ts(type = "string | null"))]
    pub issued_at: Option<DateTime<Utc>>,
}

/// Build one view per completed purchase whose course still exists.
pub fn build_certificate_views(
    user_id: &str,
    purchases: &[Purchase],
    courses: &[Course],
    progress: &[Progress],
) -> Vec<CertificateView> {
    let courses_by_id: HashMap<&str, &Course> =
        courses.iter().map(|c| (c.id.as_str(), c)).collect();
    let progress_by_course: HashMap<&str, &Progress> = progress
        .iter()
        .map(|p| (p.course_id.as_str(), p))
        .collect();

    let mut views: Vec<CertificateView> = purchases
        .iter()
        .filter(|p| p.is_completed())
        .filter_map(|purchase| {
            let course = courses_by_id.get(purchase.course_id.as_str())?;
            let progress = progress_by_course.get(purchase.course_id.as_str());
            Some(CertificateView {
                certificate_id: certificate_id(user_id, &course.id),
                course_id: course.id.clone(),
                course_title: course.title.clone(),
                progress: progress.map(|p| p.percentage).unwrap_or(0),
                available: progress.is_some_and(|p| p.certificate_available()),
                completed_at: progress.and_then(|p| p.completed_at),
                issued_at: progress
                    .filter(|p| p.certificate_available())
                    .and_then(|p| p.certificate_issued_at),
            })
        })
        .collect();

    sort_certificates(&mut views);
    views
}

/// Available first, then completion date (newest first, undated last),
/// then progress descending.
pub fn sort_certificates(views: &mut [CertificateView]) {
    views.sort_by(|a, b| {
        b.available
            .cmp(&a.available)
            .then_with(|| match (a.completed_at, b.completed_at) {
                (Some(a), Some(b)) => b.cmp(&a),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            })
            .then_with(|| b.progress.cmp(&a.progress))
    });
}

/// Verified certificate details shown on the public page.
#[derive(Debug, Clone, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "camelCase")]
pub struct VerifiedCertificate {
    pub certificate_id: String,
    pub student_name: String,
    pub course_title: String,
    pub lesson_count: usize,
    #[cfg_attr(feature = "binding-generation", ts(type = "string | null"))]
    pub completed_at: Option<DateTime<Utc>>,
    #[cfg_attr(feature = "binding-generation", ts(type = "string | null"))]
    pub issued_at: Option<DateTime<Utc>>,
}

/// Outcome of public certificate verification.
#[derive(Debug, Clone)]
pub enum Verification {
    Valid(VerifiedCertificate),
    /// Missing linkage (malformed ID, user, course, enrollment or progress)
    NotFound(&'static str),
    /// Progress below 100%
    Incomplete,
    /// Course complete but no certificate issued yet
    NotIssued,
}

/// Re-derive availability from the fetched records.
pub fn evaluate_verification(
    user: Option<&User>,
    course: Option<&Course>,
    purchase: Option<&Purchase>,
    progress: Option<&Progress>,
) -> Verification {
    let Some(user) = user else {
        return Verification::NotFound("Student not found");
    };
    let Some(course) = course else {
        return Verification::NotFound("Course not found");
    };
    if !purchase.is_some_and(Purchase::is_completed) {
        return Verification::NotFound("Enrollment not found");
    }
    let Some(progress) = progress else {
        return Verification::NotFound("Progress not found");
    };

    if !progress.is_complete() {
        return Verification::Incomplete;
    }
    if !progress.certificate_available() {
        return Verification::NotIssued;
    }

    Verification::Valid(VerifiedCertificate {
        certificate_id: certificate_id(&user.id, &course.id),
        student_name: user.name.clone(),
        course_title: course.title.clone(),
        lesson_count: course.lesson_count(),
        completed_at: progress.completed_at,
        issued_at: progress.certificate_issued_at,
    })
}

#[derive(Serialize)]
struct VerificationBody {
    valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<VerifiedCertificate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<&'static str>,
}

impl IntoResponse for Verification {
    fn into_response(self) -> Response {
        let (status, data, error) = match self {
            Verification::Valid(cert) => (StatusCode::OK, Some(cert), None),
            Verification::NotFound(msg) => (StatusCode::NOT_FOUND, None, Some(msg)),
            Verification::Incomplete => {
                (StatusCode::BAD_REQUEST, None, Some("Course not completed"))
            }
            Verification::NotIssued => {
                (StatusCode::BAD_REQUEST, None, Some("Certificate not issued"))
            }
        };

        let body = VerificationBody {
            valid: data.is_some(),
            data,
            error,
        };
        (status, Json(body)).into_response()
    }
}
