// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use chrono::Utc;
use coursely::config::Config;
use coursely::db::FirestoreDb;
use coursely::middleware::auth::create_jwt;
use coursely::models::{
    Course, Lesson, NotificationPreferences, Purchase, PurchaseStatus, Role, User,
};
use coursely::routes::create_router;
use coursely::AppState;
use std::sync::Arc;

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a test database connection.
#[allow(dead_code)]
pub async fn test_db() -> FirestoreDb {
    FirestoreDb::new("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

/// Create a mock database connection (offline).
#[allow(dead_code)]
pub fn test_db_offline() -> FirestoreDb {
    FirestoreDb::new_mock()
}

/// State wired around `db` with the test config.
#[allow(dead_code)]
pub fn test_state(db: FirestoreDb) -> Arc<AppState> {
    Arc::new(AppState::new(
        Config::test_default(),
        db,
        Arc::new(dashmap::DashMap::new()),
    ))
}

/// Create a test app with offline mock dependencies.
/// Returns the router and the shared state.
#[allow(dead_code)]
pub fn create_test_app() -> (axum::Router, Arc<AppState>) {
    let state = test_state(test_db_offline());
    (create_router(state.clone()), state)
}

/// Session token for `user_id` with `role`.
#[allow(dead_code)]
pub fn create_test_jwt(user_id: &str, role: Role, signing_key: &[u8]) -> String {
    create_jwt(user_id, role, signing_key).expect("JWT creation failed")
}

/// Unique hex ID for test isolation (no `-` or `_`).
#[allow(dead_code)]
pub fn unique_id(prefix: &str) -> String {
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::time::{SystemTime, UNIX_EPOCH};
    static COUNTER: AtomicU64 = AtomicU64::new(0);

    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    format!(
        "{}{:x}{:x}",
        prefix,
        nanos,
        COUNTER.fetch_add(1, Ordering::Relaxed)
    )
}

#[allow(dead_code)]
pub fn test_user(id: &str) -> User {
    let now = Utc::now();
    User {
        id: id.to_string(),
        name: "Test Student".to_string(),
        email: format!("{}@example.com", id),
        password_hash: String::new(),
        role: Role::Student,
        referral_code: id.to_uppercase(),
        referred_by: None,
        referral_earnings: 0,
        notification_preferences: NotificationPreferences::default(),
        created_at: now,
        updated_at: now,
    }
}

/// Published course with `lessons` lessons of 10 minutes each.
#[allow(dead_code)]
pub fn test_course(id: &str, lessons: usize) -> Course {
    let now = Utc::now();
    Course {
        id: id.to_string(),
        title: format!("Course {}", id),
        description: "A test course".to_string(),
        price: 10_000,
        thumbnail: None,
        category: Some("testing".to_string()),
        published: true,
        lessons: (0..lessons)
            .map(|i| Lesson {
                title: format!("Lesson {}", i + 1),
                video_url: Some(format!("https://video.example.com/{}", i)),
                content: None,
                duration_minutes: Some(10),
            })
            .collect(),
        created_at: now,
        updated_at: now,
    }
}

#[allow(dead_code)]
pub fn test_purchase(user_id: &str, course_id: &str, status: PurchaseStatus) -> Purchase {
    let now = Utc::now();
    Purchase {
        user_id: user_id.to_string(),
        course_id: course_id.to_string(),
        status,
        reference: unique_id("ref"),
        amount: 10_000,
        original_amount: 10_000,
        coupon_code: None,
        authorization_url: None,
        created_at: now,
        updated_at: now,
        completed_at: None,
    }
}
