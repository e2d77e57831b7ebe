// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore integration tests.
//!
//! These tests require the Firestore emulator to be running
//! (FIRESTORE_EMULATOR_HOST set). Every test uses fresh IDs, so they can
//! share one emulator instance.

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use chrono::Utc;
use coursely::error::AppError;
use coursely::models::{pair_document_id, Coupon, PurchaseStatus, Review, Role};
use coursely::routes::create_router;
use coursely::services::payments::sign_payload;
use coursely::services::ActivityLog;
use std::collections::BTreeSet;
use tower::ServiceExt;

mod common;
use common::{test_course, test_db, test_purchase, test_state, test_user, unique_id};

// ═══════════════════════════════════════════════════════════════════════════
// USER TESTS
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_user_lookup_by_email_and_referral_code() {
    require_emulator!();

    let db = test_db().await;
    let user = test_user(&unique_id("u"));

    assert!(db.get_user(&user.id).await.unwrap().is_none());
    db.upsert_user(&user).await.unwrap();

    let by_email = db.find_user_by_email(&user.email).await.unwrap().unwrap();
    assert_eq!(by_email.id, user.id);

    let by_code = db
        .find_user_by_referral_code(&user.referral_code)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(by_code.id, user.id);
}

// ═══════════════════════════════════════════════════════════════════════════
// PROGRESS TESTS
// ═══════════════════════════════════════════════════════════════════════════

/// Enrolled user and a 4-lesson course.
async fn enrolled_fixture(db: &coursely::db::FirestoreDb) -> (String, String) {
    let user = test_user(&unique_id("u"));
    let course = test_course(&unique_id("c"), 4);
    db.upsert_user(&user).await.unwrap();
    db.upsert_course(&course).await.unwrap();
    db.upsert_purchase(&test_purchase(&user.id, &course.id, PurchaseStatus::Completed))
        .await
        .unwrap();
    (user.id, course.id)
}

#[tokio::test]
async fn test_lesson_completion_scenario() {
    require_emulator!();

    let db = test_db().await;
    let state = test_state(db.clone());
    let (user_id, course_id) = enrolled_fixture(&db).await;

    let first = state.progress.complete_lesson(&user_id, &course_id, 0).await.unwrap();
    assert!(first.outcome.newly_completed);
    assert_eq!(first.progress.percentage, 25);

    let second = state.progress.complete_lesson(&user_id, &course_id, 2).await.unwrap();
    assert_eq!(second.progress.percentage, 50);

    // Idempotent
    let again = state.progress.complete_lesson(&user_id, &course_id, 2).await.unwrap();
    assert!(!again.outcome.newly_completed);
    assert_eq!(again.progress.percentage, 50);
    assert_eq!(again.progress.lessons_completed, BTreeSet::from([0, 2]));

    state.progress.complete_lesson(&user_id, &course_id, 1).await.unwrap();
    let last = state.progress.complete_lesson(&user_id, &course_id, 3).await.unwrap();
    assert!(last.outcome.course_completed);
    assert_eq!(last.progress.percentage, 100);

    let stored = db.get_progress(&user_id, &course_id).await.unwrap().unwrap();
    assert_eq!(stored.percentage, 100);
    assert!(stored.completed_at.is_some());
    assert!(!stored.certificate_issued);

    let activities = db.list_activities(&user_id, false, 50).await.unwrap();
    assert_eq!(activities.len(), 5, "4 lessons + 1 course completion");
}

#[tokio::test]
async fn test_lesson_completion_rejections() {
    require_emulator!();

    let db = test_db().await;
    let state = test_state(db.clone());
    let (user_id, course_id) = enrolled_fixture(&db).await;

    let err = state
        .progress
        .complete_lesson(&user_id, &course_id, 4)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    let err = state
        .progress
        .complete_lesson(&unique_id("ghost"), &course_id, 0)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));

    let err = state
        .progress
        .complete_lesson(&user_id, &unique_id("ghost"), 0)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));

    // Enrolled in nothing
    let stranger = test_user(&unique_id("u"));
    db.upsert_user(&stranger).await.unwrap();
    let err = state
        .progress
        .complete_lesson(&stranger.id, &course_id, 0)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));
}

#[tokio::test]
async fn test_concurrent_lesson_completion_loses_nothing() {
    require_emulator!();

    let db = test_db().await;
    let state = test_state(db.clone());
    let (user_id, course_id) = enrolled_fixture(&db).await;

    let mut handles = Vec::new();
    for lesson in [0u32, 1, 2, 3, 1, 3] {
        let state = state.clone();
        let user_id = user_id.clone();
        let course_id = course_id.clone();
        handles.push(tokio::spawn(async move {
            state
                .progress
                .complete_lesson(&user_id, &course_id, lesson)
                .await
        }));
    }

    let mut course_completions = 0;
    for handle in handles {
        let completion = handle.await.unwrap().unwrap();
        if completion.outcome.course_completed {
            course_completions += 1;
        }
    }

    let stored = db.get_progress(&user_id, &course_id).await.unwrap().unwrap();
    assert_eq!(stored.lessons_completed, BTreeSet::from([0, 1, 2, 3]));
    assert_eq!(stored.percentage, 100);
    assert_eq!(course_completions, 1);
}

#[tokio::test]
async fn test_certificate_issuance() {
    require_emulator!();

    let db = test_db().await;
    let state = test_state(db.clone());
    let (user_id, course_id) = enrolled_fixture(&db).await;

    state.progress.complete_lesson(&user_id, &course_id, 0).await.unwrap();
    let err = db
        .issue_certificate_atomic(&user_id, &course_id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    for lesson in 1..4 {
        state
            .progress
            .complete_lesson(&user_id, &course_id, lesson)
            .await
            .unwrap();
    }

    let (progress, newly) = db.issue_certificate_atomic(&user_id, &course_id).await.unwrap();
    assert!(newly);
    assert!(progress.certificate_available());

    let (_, newly) = db.issue_certificate_atomic(&user_id, &course_id).await.unwrap();
    assert!(!newly, "second issuance is a no-op");
}

// ═══════════════════════════════════════════════════════════════════════════
// PURCHASE TESTS
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_purchase_completion_is_idempotent_and_credits_referrer() {
    require_emulator!();

    let db = test_db().await;

    let referrer = test_user(&unique_id("ref"));
    db.upsert_user(&referrer).await.unwrap();

    let mut buyer = test_user(&unique_id("u"));
    buyer.referred_by = Some(referrer.id.clone());
    db.upsert_user(&buyer).await.unwrap();

    let course = test_course(&unique_id("c"), 2);
    db.upsert_course(&course).await.unwrap();

    let code = unique_id("SAVE").to_uppercase();
    db.upsert_coupon(&Coupon {
        code: code.clone(),
        discount_percent: 20,
        usage_limit: Some(5),
        usage_count: 0,
        active: true,
        expires_at: None,
        created_at: Utc::now(),
    })
    .await
    .unwrap();

    let mut purchase = test_purchase(&buyer.id, &course.id, PurchaseStatus::Pending);
    purchase.amount = 8_000;
    purchase.coupon_code = Some(code.clone());
    db.upsert_purchase(&purchase).await.unwrap();

    let completion = db
        .complete_purchase_atomic(&buyer.id, &course.id, 10)
        .await
        .unwrap()
        .expect("first completion settles");
    assert_eq!(completion.purchase.status, PurchaseStatus::Completed);
    assert_eq!(completion.referral_credit, Some((referrer.id.clone(), 800)));

    // Duplicate (verify + webhook)
    let duplicate = db
        .complete_purchase_atomic(&buyer.id, &course.id, 10)
        .await
        .unwrap();
    assert!(duplicate.is_none());

    let referrer = db.get_user(&referrer.id).await.unwrap().unwrap();
    assert_eq!(referrer.referral_earnings, 800);
    let coupon = db.get_coupon(&code).await.unwrap().unwrap();
    assert_eq!(coupon.usage_count, 1);
}

#[tokio::test]
async fn test_settle_logs_enrollment() {
    require_emulator!();

    let db = test_db().await;
    let state = test_state(db.clone());

    let buyer = test_user(&unique_id("u"));
    db.upsert_user(&buyer).await.unwrap();
    let course = test_course(&unique_id("c"), 1);
    db.upsert_course(&course).await.unwrap();
    let purchase = test_purchase(&buyer.id, &course.id, PurchaseStatus::Pending);
    db.upsert_purchase(&purchase).await.unwrap();

    assert!(state.enrollment.settle(&purchase).await.unwrap());
    assert!(!state.enrollment.settle(&purchase).await.unwrap());

    let activities = db.list_activities(&buyer.id, true, 10).await.unwrap();
    assert_eq!(activities.len(), 1);
    assert_eq!(activities[0].course_id.as_deref(), Some(course.id.as_str()));
}

/// Buyer, 10000-unit course and a pending purchase that already has a
/// gateway session.
async fn pending_checkout_fixture(
    db: &coursely::db::FirestoreDb,
) -> (coursely::models::User, String, coursely::models::Purchase) {
    let buyer = test_user(&unique_id("u"));
    db.upsert_user(&buyer).await.unwrap();
    let course = test_course(&unique_id("c"), 2);
    db.upsert_course(&course).await.unwrap();

    let mut pending = test_purchase(&buyer.id, &course.id, PurchaseStatus::Pending);
    pending.authorization_url =
        Some(format!("https://checkout.example.com/{}", pending.reference));
    db.upsert_purchase(&pending).await.unwrap();

    (buyer, course.id, pending)
}

#[tokio::test]
async fn test_repeat_checkout_keeps_first_reference_payable() {
    require_emulator!();

    let db = test_db().await;
    let state = test_state(db.clone());
    let (buyer, course_id, pending) = pending_checkout_fixture(&db).await;

    // Same terms: the existing session is handed back without a gateway call
    let session = state
        .enrollment
        .checkout(&buyer, &course_id, None)
        .await
        .unwrap();
    assert_eq!(session.reference, pending.reference);
    assert_eq!(session.authorization_url, pending.authorization_url);

    let stored = db.get_purchase(&buyer.id, &course_id).await.unwrap().unwrap();
    assert_eq!(stored.reference, pending.reference);

    // Customer pays in the first session
    let body = serde_json::json!({
        "event": "charge.success",
        "data": { "reference": pending.reference, "amount": pending.amount }
    })
    .to_string();
    let signature =
        sign_payload(state.config.payment_secret_key.as_bytes(), body.as_bytes()).unwrap();
    state
        .enrollment
        .handle_webhook(body.as_bytes(), Some(&signature))
        .await
        .unwrap();

    let settled = db.get_purchase(&buyer.id, &course_id).await.unwrap().unwrap();
    assert_eq!(settled.status, PurchaseStatus::Completed);
}

#[tokio::test]
async fn test_checkout_with_new_terms_does_not_drop_open_session() {
    require_emulator!();

    let db = test_db().await;
    let state = test_state(db.clone());
    let (buyer, course_id, pending) = pending_checkout_fixture(&db).await;

    let code = unique_id("HALF").to_uppercase();
    db.upsert_coupon(&Coupon {
        code: code.clone(),
        discount_percent: 50,
        usage_limit: None,
        usage_count: 0,
        active: true,
        expires_at: None,
        created_at: Utc::now(),
    })
    .await
    .unwrap();

    // The old session has to be checked with the gateway first; the test
    // gateway is unreachable, so nothing is replaced.
    let err = state
        .enrollment
        .checkout(&buyer, &course_id, Some(&code))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::PaymentGateway(_)));

    let stored = db.get_purchase(&buyer.id, &course_id).await.unwrap().unwrap();
    assert_eq!(stored.reference, pending.reference);
    assert_eq!(stored.amount, pending.amount);
}

// ═══════════════════════════════════════════════════════════════════════════
// ACTIVITY / REVIEW / DELETION TESTS
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_mark_all_activities_read() {
    require_emulator!();

    let db = test_db().await;
    let log = ActivityLog::new(db.clone());
    let user_id = unique_id("u");

    for i in 0..3 {
        log.record(
            &user_id,
            coursely::models::ActivityKind::Account,
            "Test",
            format!("entry {}", i),
            None,
        )
        .await
        .unwrap();
    }

    assert_eq!(db.count_unread_activities(&user_id).await.unwrap(), 3);
    assert_eq!(db.mark_all_activities_read(&user_id).await.unwrap(), 3);
    assert_eq!(db.count_unread_activities(&user_id).await.unwrap(), 0);
    assert_eq!(db.list_activities(&user_id, false, 10).await.unwrap().len(), 3);
}

#[tokio::test]
async fn test_review_votes() {
    require_emulator!();

    let db = test_db().await;
    let author = unique_id("u");
    let course_id = unique_id("c");
    let now = Utc::now();
    let review = Review {
        user_id: author.clone(),
        user_name: "Author".to_string(),
        course_id: course_id.clone(),
        rating: 4,
        comment: "Solid".to_string(),
        helpful_votes: BTreeSet::new(),
        not_helpful_votes: BTreeSet::new(),
        created_at: now,
        updated_at: now,
    };
    db.upsert_review(&review).await.unwrap();
    let review_id = review.document_id();

    let updated = db.vote_review_atomic(&review_id, "voter1", true).await.unwrap();
    assert_eq!(updated.helpful_votes.len(), 1);

    // Same vote twice does not double count; switching moves the voter
    db.vote_review_atomic(&review_id, "voter1", true).await.unwrap();
    let updated = db.vote_review_atomic(&review_id, "voter1", false).await.unwrap();
    assert!(updated.helpful_votes.is_empty());
    assert_eq!(updated.not_helpful_votes.len(), 1);

    let err = db
        .vote_review_atomic(&review_id, &author, true)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));
}

#[tokio::test]
async fn test_delete_user_data() {
    require_emulator!();

    let db = test_db().await;
    let state = test_state(db.clone());
    let (user_id, course_id) = enrolled_fixture(&db).await;
    state.progress.complete_lesson(&user_id, &course_id, 0).await.unwrap();

    // progress + 1 activity + purchase + user
    let deleted = db.delete_user_data(&user_id).await.unwrap();
    assert_eq!(deleted, 4);

    assert!(db.get_user(&user_id).await.unwrap().is_none());
    assert!(db.get_progress(&user_id, &course_id).await.unwrap().is_none());
    assert!(db.get_purchase(&user_id, &course_id).await.unwrap().is_none());
    assert!(db.get_course(&course_id).await.unwrap().is_some());
}

#[tokio::test]
async fn test_resubmitted_review_keeps_votes() {
    require_emulator!();

    let db = test_db().await;
    let state = test_state(db.clone());
    let app = create_router(state.clone());
    let (user_id, course_id) = enrolled_fixture(&db).await;
    let token = common::create_test_jwt(&user_id, Role::Student, &state.config.jwt_signing_key);

    let submit = |rating: u8| {
        Request::builder()
            .method("POST")
            .uri(format!("/course/{}/reviews", course_id))
            .header(header::CONTENT_TYPE, "application/json")
            .header(header::AUTHORIZATION, format!("Bearer {}", token))
            .body(Body::from(
                serde_json::json!({ "rating": rating, "comment": "Clear lessons" }).to_string(),
            ))
            .unwrap()
    };

    let response = app.clone().oneshot(submit(4)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let review_id = pair_document_id(&user_id, &course_id);
    db.vote_review_atomic(&review_id, "voter1", true).await.unwrap();

    let response = app.oneshot(submit(5)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .unwrap();
    let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(json["data"]["rating"], 5);
    assert_eq!(json["data"]["helpfulCount"], 1);
}
