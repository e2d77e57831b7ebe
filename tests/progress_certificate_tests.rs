// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Progress, badge and certificate eligibility behavior (no database).

use axum::http::StatusCode;
use axum::response::IntoResponse;
use chrono::Utc;
use coursely::models::{Progress, PurchaseStatus};
use coursely::services::catalog::{build_course_view, Badge};
use coursely::services::certificates::{evaluate_verification, Verification};

mod common;

/// All orderings of 0..n (n is small).
fn permutations(n: u32) -> Vec<Vec<u32>> {
    fn go(prefix: &mut Vec<u32>, rest: &mut Vec<u32>, out: &mut Vec<Vec<u32>>) {
        if rest.is_empty() {
            out.push(prefix.clone());
            return;
        }
        for i in 0..rest.len() {
            let item = rest.remove(i);
            prefix.push(item);
            go(prefix, rest, out);
            prefix.pop();
            rest.insert(i, item);
        }
    }
    let mut out = Vec::new();
    go(&mut Vec::new(), &mut (0..n).collect(), &mut out);
    out
}

#[test]
fn test_all_lessons_reach_100_exactly_once_in_any_order() {
    for order in permutations(4) {
        let mut progress = Progress::new("u1", "c1", Utc::now());
        let mut completions = 0;

        for &lesson in &order {
            let outcome = progress.mark_lesson_complete(lesson, 4, Utc::now());
            if outcome.course_completed {
                completions += 1;
            }
        }

        assert_eq!(progress.percentage, 100, "order {:?}", order);
        assert_eq!(completions, 1, "order {:?}", order);
        assert!(progress.completed_at.is_some());
    }
}

#[test]
fn test_recompleting_lesson_changes_nothing() {
    let mut progress = Progress::new("u1", "c1", Utc::now());
    progress.mark_lesson_complete(1, 3, Utc::now());
    let set_before = progress.lessons_completed.clone();
    let pct_before = progress.percentage;

    let outcome = progress.mark_lesson_complete(1, 3, Utc::now());

    assert!(!outcome.newly_completed);
    assert!(!outcome.course_completed);
    assert_eq!(progress.lessons_completed, set_before);
    assert_eq!(progress.percentage, pct_before);
}

#[test]
fn test_four_lesson_scenario() {
    let mut progress = Progress::new("u1", "c1", Utc::now());
    progress.mark_lesson_complete(0, 4, Utc::now());
    progress.mark_lesson_complete(2, 4, Utc::now());
    assert_eq!(progress.percentage, 50);

    progress.mark_lesson_complete(1, 4, Utc::now());
    assert_eq!(progress.percentage, 75);
    progress.mark_lesson_complete(3, 4, Utc::now());
    assert_eq!(progress.percentage, 100);
}

#[test]
fn test_issued_flag_without_completion_is_not_available() {
    let mut progress = Progress::new("u1", "c1", Utc::now());
    progress.percentage = 80;
    progress.certificate_issued = true;

    assert!(!progress.certificate_available());
}

#[test]
fn test_issuance_requires_completion() {
    let mut progress = Progress::new("u1", "c1", Utc::now());
    progress.mark_lesson_complete(0, 2, Utc::now());
    assert!(progress.issue_certificate(Utc::now()).is_err());

    progress.mark_lesson_complete(1, 2, Utc::now());
    assert!(progress.issue_certificate(Utc::now()).unwrap());
    // Second issuance is a no-op
    assert!(!progress.issue_certificate(Utc::now()).unwrap());
    assert!(progress.certificate_available());
}

#[test]
fn test_badges() {
    let course = common::test_course("c1", 4);
    let purchase = common::test_purchase("u1", "c1", PurchaseStatus::Completed);

    let mut progress = Progress::new("u1", "c1", Utc::now());
    let view = build_course_view(&course, Some(&purchase), Some(&progress));
    assert_eq!(view.badge, Some(Badge::Enrolled));

    progress.percentage = 50;
    let view = build_course_view(&course, Some(&purchase), Some(&progress));
    assert_eq!(view.badge, Some(Badge::InProgress));

    progress.percentage = 100;
    let view = build_course_view(&course, Some(&purchase), Some(&progress));
    assert_eq!(view.badge, Some(Badge::Completed));
    assert!(view.completed);

    let view = build_course_view(&course, None, Some(&progress));
    assert_eq!(view.badge, None);
}

#[test]
fn test_durations() {
    let mut course = common::test_course("c1", 3);
    for (lesson, minutes) in course.lessons.iter_mut().zip([10, 10, 45]) {
        lesson.duration_minutes = Some(minutes);
    }
    assert_eq!(build_course_view(&course, None, None).duration, "1h 5m");

    let mut course = common::test_course("c2", 2);
    for lesson in course.lessons.iter_mut() {
        lesson.duration_minutes = Some(5);
    }
    assert_eq!(build_course_view(&course, None, None).duration, "10m");

    // Missing durations default to 10 minutes
    let mut course = common::test_course("c3", 2);
    for lesson in course.lessons.iter_mut() {
        lesson.duration_minutes = None;
    }
    assert_eq!(build_course_view(&course, None, None).duration, "20m");
}

async fn verification_body(v: Verification) -> (StatusCode, serde_json::Value) {
    let response = v.into_response();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), 4096)
        .await
        .unwrap();
    (status, serde_json::from_slice(&body).unwrap())
}

#[tokio::test]
async fn test_verify_incomplete_course() {
    let user = common::test_user("u1");
    let course = common::test_course("c1", 5);
    let purchase = common::test_purchase("u1", "c1", PurchaseStatus::Completed);
    let mut progress = Progress::new("u1", "c1", Utc::now());
    progress.percentage = 80;

    let verification = evaluate_verification(
        Some(&user),
        Some(&course),
        Some(&purchase),
        Some(&progress),
    );
    let (status, json) = verification_body(verification).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        json,
        serde_json::json!({ "valid": false, "error": "Course not completed" })
    );
}

#[tokio::test]
async fn test_verify_complete_but_not_issued() {
    let user = common::test_user("u1");
    let course = common::test_course("c1", 1);
    let purchase = common::test_purchase("u1", "c1", PurchaseStatus::Completed);
    let mut progress = Progress::new("u1", "c1", Utc::now());
    progress.mark_lesson_complete(0, 1, Utc::now());

    let (status, json) = verification_body(evaluate_verification(
        Some(&user),
        Some(&course),
        Some(&purchase),
        Some(&progress),
    ))
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "Certificate not issued");
}

#[tokio::test]
async fn test_verify_valid_certificate() {
    let user = common::test_user("u1");
    let course = common::test_course("c1", 1);
    let purchase = common::test_purchase("u1", "c1", PurchaseStatus::Completed);
    let mut progress = Progress::new("u1", "c1", Utc::now());
    progress.mark_lesson_complete(0, 1, Utc::now());
    progress.issue_certificate(Utc::now()).unwrap();

    let (status, json) = verification_body(evaluate_verification(
        Some(&user),
        Some(&course),
        Some(&purchase),
        Some(&progress),
    ))
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["valid"], true);
    assert_eq!(json["data"]["certificateId"], "u1-c1");
    assert_eq!(json["data"]["studentName"], "Test Student");
}

#[tokio::test]
async fn test_verify_missing_linkage_is_not_found() {
    let user = common::test_user("u1");
    let course = common::test_course("c1", 1);
    let pending = common::test_purchase("u1", "c1", PurchaseStatus::Pending);
    let progress = Progress::new("u1", "c1", Utc::now());

    let cases = [
        evaluate_verification(None, Some(&course), None, Some(&progress)),
        evaluate_verification(Some(&user), None, None, Some(&progress)),
        evaluate_verification(Some(&user), Some(&course), Some(&pending), Some(&progress)),
        evaluate_verification(
            Some(&user),
            Some(&course),
            Some(&common::test_purchase("u1", "c1", PurchaseStatus::Completed)),
            None,
        ),
    ];

    for verification in cases {
        let (status, json) = verification_body(verification).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["valid"], false);
    }
}
