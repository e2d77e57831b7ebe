// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore client wrapper with typed operations.
//!
//! Provides high-level operations for:
//! - Users (profiles, credentials, referral earnings)
//! - Courses (catalog)
//! - Purchases (one per user and course)
//! - Progress (one per user and course)
//! - Activities (per-user notification log)
//! - Coupons and reviews
//!
//! Read-modify-write sequences on progress, purchases and reviews run inside
//! Firestore transactions with the read bound to the transaction, so a
//! concurrent writer makes the commit fail instead of losing an update.

use crate::db::collections;
use crate::error::AppError;
use crate::models::{
    pair_document_id, Activity, Coupon, Course, LessonOutcome, Progress, Purchase,
    PurchaseStatus, Review, User,
};
use chrono::Utc;

// Firestore limits batch/transaction writes to 500 operations.
// We use a safe limit of 400 to allow headroom.
const BATCH_SIZE: usize = 400;

/// Result of completing a purchase.
#[derive(Debug, Clone)]
pub struct PurchaseCompletion {
    pub purchase: Purchase,
    /// Referrer credited for this purchase and the commission amount
    pub referral_credit: Option<(String, u64)>,
}

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    client: Option<firestore::FirestoreDb>,
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, AppError> {
        // If the emulator environment variable is set, use unauthenticated connection
        // to avoid local credential warnings and leakage.
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, AppError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a mock Firestore client for testing (offline mode).
    ///
    /// All database operations will return an error if called.
    pub fn new_mock() -> Self {
        Self { client: None }
    }

    /// Helper to get the client or return an error if offline.
    fn get_client(&self) -> Result<&firestore::FirestoreDb, AppError> {
        self.client
            .as_ref()
            .ok_or_else(|| AppError::Database("Database not connected (offline mode)".to_string()))
    }

    /// A client whose reads are bound to `transaction`.
    fn transaction_reader(
        &self,
        transaction: &firestore::FirestoreTransaction<'_>,
    ) -> Result<firestore::FirestoreDb, AppError> {
        Ok(self.get_client()?.clone_with_consistency_selector(
            firestore::FirestoreConsistencySelector::Transaction(
                transaction.transaction_id().clone(),
            ),
        ))
    }

    async fn begin_transaction(&self) -> Result<firestore::FirestoreTransaction<'_>, AppError> {
        self.get_client()?
            .begin_transaction()
            .await
            .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))
    }

    // ─── User Operations ─────────────────────────────────────────

    /// Get a user by ID.
    pub async fn get_user(&self, user_id: &str) -> Result<Option<User>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::USERS)
            .obj()
            .one(user_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a user by (lowercased) email.
    pub async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let email = email.to_string();
        let users: Vec<User> = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::USERS)
            .filter(move |q| q.field("email").eq(email.clone()))
            .limit(1)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(users.into_iter().next())
    }

    /// Find the owner of a referral code.
    pub async fn find_user_by_referral_code(&self, code: &str) -> Result<Option<User>, AppError> {
        let code = code.to_string();
        let users: Vec<User> = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::USERS)
            .filter(move |q| q.field("referral_code").eq(code.clone()))
            .limit(1)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(users.into_iter().next())
    }

    /// Create or update a user.
    pub async fn upsert_user(&self, user: &User) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::USERS)
            .document_id(&user.id)
            .object(user)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// List users, newest first.
    pub async fn list_users(&self, limit: u32) -> Result<Vec<User>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .from(collections::USERS)
            .order_by([("created_at", firestore::FirestoreQueryDirection::Descending)])
            .limit(limit)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Total number of registered users.
    pub async fn count_users(&self) -> Result<usize, AppError> {
        let docs = self
            .get_client()?
            .fluent()
            .select()
            .fields(["id"])
            .from(collections::USERS)
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(docs.len())
    }

    /// Users who signed up with this user's referral code.
    pub async fn list_referred_users(&self, referrer_id: &str) -> Result<Vec<User>, AppError> {
        let referrer_id = referrer_id.to_string();
        self.get_client()?
            .fluent()
            .select()
            .from(collections::USERS)
            .filter(move |q| q.field("referred_by").eq(referrer_id.clone()))
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    // ─── Course Operations ───────────────────────────────────────

    /// Get a course by ID.
    pub async fn get_course(&self, course_id: &str) -> Result<Option<Course>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::COURSES)
            .obj()
            .one(course_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// List courses, newest first.
    pub async fn list_courses(&self, published_only: bool) -> Result<Vec<Course>, AppError> {
        let query = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::COURSES);

        let query = if published_only {
            query.filter(|q| q.field("published").eq(true))
        } else {
            query
        };

        query
            .order_by([("created_at", firestore::FirestoreQueryDirection::Descending)])
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create or update a course.
    pub async fn upsert_course(&self, course: &Course) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::COURSES)
            .document_id(&course.id)
            .object(course)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Delete a course document.
    pub async fn delete_course(&self, course_id: &str) -> Result<(), AppError> {
        self.get_client()?
            .fluent()
            .delete()
            .from(collections::COURSES)
            .document_id(course_id)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    // ─── Purchase Operations ─────────────────────────────────────

    /// Get the purchase for a (user, course) pair.
    pub async fn get_purchase(
        &self,
        user_id: &str,
        course_id: &str,
    ) -> Result<Option<Purchase>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::PURCHASES)
            .obj()
            .one(pair_document_id(user_id, course_id))
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a purchase by its payment reference.
    pub async fn find_purchase_by_reference(
        &self,
        reference: &str,
    ) -> Result<Option<Purchase>, AppError> {
        let reference = reference.to_string();
        let purchases: Vec<Purchase> = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::PURCHASES)
            .filter(move |q| q.field("reference").eq(reference.clone()))
            .limit(1)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(purchases.into_iter().next())
    }

    /// All purchases of a user, any status.
    pub async fn list_purchases_for_user(&self, user_id: &str) -> Result<Vec<Purchase>, AppError> {
        let user_id = user_id.to_string();
        self.get_client()?
            .fluent()
            .select()
            .from(collections::PURCHASES)
            .filter(move |q| q.field("user_id").eq(user_id.clone()))
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// All purchases of a course, any status.
    pub async fn list_purchases_for_course(
        &self,
        course_id: &str,
    ) -> Result<Vec<Purchase>, AppError> {
        let course_id = course_id.to_string();
        self.get_client()?
            .fluent()
            .select()
            .from(collections::PURCHASES)
            .filter(move |q| q.field("course_id").eq(course_id.clone()))
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// All purchases with the given status.
    pub async fn list_purchases_by_status(
        &self,
        status: PurchaseStatus,
    ) -> Result<Vec<Purchase>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .from(collections::PURCHASES)
            .filter(move |q| q.field("status").eq(status.as_str()))
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create or update a purchase.
    pub async fn upsert_purchase(&self, purchase: &Purchase) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::PURCHASES)
            .document_id(purchase.document_id())
            .object(purchase)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Atomically complete a purchase: status, coupon usage and referral credit.
    ///
    /// Returns `None` if the purchase was already completed or refunded
    /// (idempotent duplicate from verify + webhook).
    pub async fn complete_purchase_atomic(
        &self,
        user_id: &str,
        course_id: &str,
        commission_percent: u64,
    ) -> Result<Option<PurchaseCompletion>, AppError> {
        let client = self.get_client()?;
        let doc_id = pair_document_id(user_id, course_id);
        let now = Utc::now();

        let mut transaction = self.begin_transaction().await?;
        let reader = self.transaction_reader(&transaction)?;

        // 1. Read the purchase within the transaction
        let purchase: Option<Purchase> = reader
            .fluent()
            .select()
            .by_id_in(collections::PURCHASES)
            .obj()
            .one(&doc_id)
            .await
            .map_err(|e| {
                AppError::Database(format!("Failed to read purchase in transaction: {}", e))
            })?;

        let Some(mut purchase) = purchase else {
            let _ = transaction.rollback().await;
            return Err(AppError::NotFound(format!("Purchase {} not found", doc_id)));
        };

        // 2. Idempotency
        if matches!(
            purchase.status,
            PurchaseStatus::Completed | PurchaseStatus::Refunded
        ) {
            tracing::debug!(
                user_id,
                course_id,
                status = purchase.status.as_str(),
                "Purchase already settled (idempotent skip)"
            );
            let _ = transaction.rollback().await;
            return Ok(None);
        }

        purchase.status = PurchaseStatus::Completed;
        purchase.completed_at = Some(now);
        purchase.updated_at = now;

        // 3. Coupon usage
        if let Some(code) = &purchase.coupon_code {
            let coupon: Option<Coupon> = reader
                .fluent()
                .select()
                .by_id_in(collections::COUPONS)
                .obj()
                .one(code)
                .await
                .map_err(|e| {
                    AppError::Database(format!("Failed to read coupon in transaction: {}", e))
                })?;

            if let Some(mut coupon) = coupon {
                coupon.usage_count += 1;
                client
                    .fluent()
                    .update()
                    .in_col(collections::COUPONS)
                    .document_id(&coupon.code)
                    .object(&coupon)
                    .add_to_transaction(&mut transaction)
                    .map_err(|e| {
                        AppError::Database(format!("Failed to add coupon to transaction: {}", e))
                    })?;
            }
        }

        // 4. Referral credit
        let buyer: Option<User> = reader
            .fluent()
            .select()
            .by_id_in(collections::USERS)
            .obj()
            .one(user_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to read user in transaction: {}", e)))?;

        let mut referral_credit = None;
        if let Some(referrer_id) = buyer.and_then(|b| b.referred_by) {
            let commission = purchase.amount * commission_percent / 100;
            let referrer: Option<User> = reader
                .fluent()
                .select()
                .by_id_in(collections::USERS)
                .obj()
                .one(&referrer_id)
                .await
                .map_err(|e| {
                    AppError::Database(format!("Failed to read referrer in transaction: {}", e))
                })?;

            if let Some(mut referrer) = referrer.filter(|_| commission > 0) {
                referrer.referral_earnings += commission;
                referrer.updated_at = now;
                client
                    .fluent()
                    .update()
                    .in_col(collections::USERS)
                    .document_id(&referrer.id)
                    .object(&referrer)
                    .add_to_transaction(&mut transaction)
                    .map_err(|e| {
                        AppError::Database(format!(
                            "Failed to add referrer to transaction: {}",
                            e
                        ))
                    })?;
                referral_credit = Some((referrer.id, commission));
            }
        }

        // 5. Purchase write
        client
            .fluent()
            .update()
            .in_col(collections::PURCHASES)
            .document_id(&doc_id)
            .object(&purchase)
            .add_to_transaction(&mut transaction)
            .map_err(|e| {
                AppError::Database(format!("Failed to add purchase to transaction: {}", e))
            })?;

        // 6. Commit
        transaction
            .commit()
            .await
            .map_err(|e| AppError::Database(format!("Transaction commit failed: {}", e)))?;

        tracing::info!(
            user_id,
            course_id,
            amount = purchase.amount,
            referral = referral_credit.is_some(),
            "Purchase completed atomically"
        );

        Ok(Some(PurchaseCompletion {
            purchase,
            referral_credit,
        }))
    }

    // ─── Progress Operations ─────────────────────────────────────

    /// Get progress for a (user, course) pair.
    pub async fn get_progress(
        &self,
        user_id: &str,
        course_id: &str,
    ) -> Result<Option<Progress>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::PROGRESS)
            .obj()
            .one(pair_document_id(user_id, course_id))
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// All progress records of a user.
    pub async fn list_progress_for_user(&self, user_id: &str) -> Result<Vec<Progress>, AppError> {
        let user_id = user_id.to_string();
        self.get_client()?
            .fluent()
            .select()
            .from(collections::PROGRESS)
            .filter(move |q| q.field("user_id").eq(user_id.clone()))
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Number of issued certificates across all users.
    pub async fn count_issued_certificates(&self) -> Result<usize, AppError> {
        let issued: Vec<Progress> = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::PROGRESS)
            .filter(|q| q.field("certificate_issued").eq(true))
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(issued.len())
    }

    /// Atomically add a lesson to the completed set and recompute the percentage.
    ///
    /// Creates the progress record if absent. A lesson that is already in the
    /// set leaves percentage and set untouched.
    pub async fn record_lesson_atomic(
        &self,
        user_id: &str,
        course_id: &str,
        lesson_index: u32,
        total_lessons: usize,
    ) -> Result<(Progress, LessonOutcome), AppError> {
        let client = self.get_client()?;
        let doc_id = pair_document_id(user_id, course_id);
        let now = Utc::now();

        let mut transaction = self.begin_transaction().await?;

        // 1. Read current progress within the transaction
        //    This registers the document for conflict detection
        let current: Option<Progress> = self
            .transaction_reader(&transaction)?
            .fluent()
            .select()
            .by_id_in(collections::PROGRESS)
            .obj()
            .one(&doc_id)
            .await
            .map_err(|e| {
                AppError::Database(format!("Failed to read progress in transaction: {}", e))
            })?;

        let mut progress = current.unwrap_or_else(|| Progress::new(user_id, course_id, now));

        // 2. Apply the completion in memory
        let outcome = progress.mark_lesson_complete(lesson_index, total_lessons, now);

        // 3. Write back (also refreshes last_accessed for duplicates)
        client
            .fluent()
            .update()
            .in_col(collections::PROGRESS)
            .document_id(&doc_id)
            .object(&progress)
            .add_to_transaction(&mut transaction)
            .map_err(|e| {
                AppError::Database(format!("Failed to add progress to transaction: {}", e))
            })?;

        // 4. Commit the transaction atomically
        transaction
            .commit()
            .await
            .map_err(|e| AppError::Database(format!("Transaction commit failed: {}", e)))?;

        Ok((progress, outcome))
    }

    /// Atomically set the certificate-issued flag on a completed course.
    ///
    /// Returns the progress and whether the certificate was newly issued.
    pub async fn issue_certificate_atomic(
        &self,
        user_id: &str,
        course_id: &str,
    ) -> Result<(Progress, bool), AppError> {
        let client = self.get_client()?;
        let doc_id = pair_document_id(user_id, course_id);

        let mut transaction = self.begin_transaction().await?;

        let current: Option<Progress> = self
            .transaction_reader(&transaction)?
            .fluent()
            .select()
            .by_id_in(collections::PROGRESS)
            .obj()
            .one(&doc_id)
            .await
            .map_err(|e| {
                AppError::Database(format!("Failed to read progress in transaction: {}", e))
            })?;

        let Some(mut progress) = current else {
            let _ = transaction.rollback().await;
            return Err(AppError::NotFound("Progress not found".to_string()));
        };

        let newly_issued = match progress.issue_certificate(Utc::now()) {
            Ok(issued) => issued,
            Err(e) => {
                let _ = transaction.rollback().await;
                return Err(e);
            }
        };

        if !newly_issued {
            let _ = transaction.rollback().await;
            return Ok((progress, false));
        }

        client
            .fluent()
            .update()
            .in_col(collections::PROGRESS)
            .document_id(&doc_id)
            .object(&progress)
            .add_to_transaction(&mut transaction)
            .map_err(|e| {
                AppError::Database(format!("Failed to add progress to transaction: {}", e))
            })?;

        transaction
            .commit()
            .await
            .map_err(|e| AppError::Database(format!("Transaction commit failed: {}", e)))?;

        tracing::info!(user_id, course_id, "Certificate issued");

        Ok((progress, true))
    }

    // ─── Activity Operations ─────────────────────────────────────

    /// Append an activity entry.
    pub async fn add_activity(&self, activity: &Activity) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::ACTIVITIES)
            .document_id(&activity.id)
            .object(activity)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Get an activity entry by ID.
    pub async fn get_activity(&self, activity_id: &str) -> Result<Option<Activity>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::ACTIVITIES)
            .obj()
            .one(activity_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Set the read flag on one entry. Only the `read` field is written.
    pub async fn mark_activity_read(&self, activity: &Activity) -> Result<(), AppError> {
        let mut updated = activity.clone();
        updated.read = true;

        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .fields(["read"])
            .in_col(collections::ACTIVITIES)
            .document_id(&activity.id)
            .object(&updated)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Number of unread entries for a user.
    pub async fn count_unread_activities(&self, user_id: &str) -> Result<usize, AppError> {
        let owner = user_id.to_string();
        let docs = self
            .get_client()?
            .fluent()
            .select()
            .fields(["id"])
            .from(collections::ACTIVITIES)
            .filter(move |q| {
                q.for_all([
                    q.field("user_id").eq(owner.clone()),
                    q.field("read").eq(false),
                ])
            })
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(docs.len())
    }

    /// Activities for a user, newest first.
    pub async fn list_activities(
        &self,
        user_id: &str,
        unread_only: bool,
        limit: u32,
    ) -> Result<Vec<Activity>, AppError> {
        let user_id = user_id.to_string();
        let query = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::ACTIVITIES);

        let query = if unread_only {
            query.filter(move |q| {
                q.for_all([
                    q.field("user_id").eq(user_id.clone()),
                    q.field("read").eq(false),
                ])
            })
        } else {
            query.filter(move |q| q.field("user_id").eq(user_id.clone()))
        };

        query
            .order_by([("created_at", firestore::FirestoreQueryDirection::Descending)])
            .limit(limit)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Mark every unread activity of a user as read.
    ///
    /// Returns the number of entries updated.
    pub async fn mark_all_activities_read(&self, user_id: &str) -> Result<usize, AppError> {
        let owner = user_id.to_string();
        let unread: Vec<Activity> = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::ACTIVITIES)
            .filter(move |q| {
                q.for_all([
                    q.field("user_id").eq(owner.clone()),
                    q.field("read").eq(false),
                ])
            })
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let updated: Vec<Activity> = unread
            .into_iter()
            .map(|mut a| {
                a.read = true;
                a
            })
            .collect();

        let client = self.get_client()?;
        for chunk in updated.chunks(BATCH_SIZE) {
            let mut transaction = self.begin_transaction().await?;
            for activity in chunk {
                client
                    .fluent()
                    .update()
                    .in_col(collections::ACTIVITIES)
                    .document_id(&activity.id)
                    .object(activity)
                    .add_to_transaction(&mut transaction)
                    .map_err(|e| {
                        AppError::Database(format!(
                            "Failed to add activity to transaction: {}",
                            e
                        ))
                    })?;
            }
            transaction.commit().await.map_err(|e| {
                AppError::Database(format!("Failed to commit batch update: {}", e))
            })?;
        }

        tracing::debug!(user_id, count = updated.len(), "Marked activities read");
        Ok(updated.len())
    }

    // ─── Coupon Operations ───────────────────────────────────────

    /// Get a coupon by its (normalized) code.
    pub async fn get_coupon(&self, code: &str) -> Result<Option<Coupon>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::COUPONS)
            .obj()
            .one(code)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// All coupons.
    pub async fn list_coupons(&self) -> Result<Vec<Coupon>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .from(collections::COUPONS)
            .order_by([("created_at", firestore::FirestoreQueryDirection::Descending)])
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create or update a coupon.
    pub async fn upsert_coupon(&self, coupon: &Coupon) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::COUPONS)
            .document_id(&coupon.code)
            .object(coupon)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    // ─── Review Operations ───────────────────────────────────────

    /// Get a review by document ID.
    pub async fn get_review(&self, review_id: &str) -> Result<Option<Review>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::REVIEWS)
            .obj()
            .one(review_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Reviews for a course, newest first.
    pub async fn list_reviews_for_course(&self, course_id: &str) -> Result<Vec<Review>, AppError> {
        let course_id = course_id.to_string();
        self.get_client()?
            .fluent()
            .select()
            .from(collections::REVIEWS)
            .filter(move |q| q.field("course_id").eq(course_id.clone()))
            .order_by([("created_at", firestore::FirestoreQueryDirection::Descending)])
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create or update a review.
    pub async fn upsert_review(&self, review: &Review) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::REVIEWS)
            .document_id(review.document_id())
            .object(review)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Atomically record a helpfulness vote.
    pub async fn vote_review_atomic(
        &self,
        review_id: &str,
        voter_id: &str,
        helpful: bool,
    ) -> Result<Review, AppError> {
        let client = self.get_client()?;
        let mut transaction = self.begin_transaction().await?;

        let current: Option<Review> = self
            .transaction_reader(&transaction)?
            .fluent()
            .select()
            .by_id_in(collections::REVIEWS)
            .obj()
            .one(review_id)
            .await
            .map_err(|e| {
                AppError::Database(format!("Failed to read review in transaction: {}", e))
            })?;

        let Some(mut review) = current else {
            let _ = transaction.rollback().await;
            return Err(AppError::NotFound(format!("Review {} not found", review_id)));
        };

        let changed = match review.vote(voter_id, helpful) {
            Ok(changed) => changed,
            Err(e) => {
                let _ = transaction.rollback().await;
                return Err(e);
            }
        };

        if !changed {
            let _ = transaction.rollback().await;
            return Ok(review);
        }

        client
            .fluent()
            .update()
            .in_col(collections::REVIEWS)
            .document_id(review_id)
            .object(&review)
            .add_to_transaction(&mut transaction)
            .map_err(|e| {
                AppError::Database(format!("Failed to add review to transaction: {}", e))
            })?;

        transaction
            .commit()
            .await
            .map_err(|e| AppError::Database(format!("Transaction commit failed: {}", e)))?;

        Ok(review)
    }

    // ─── Helper Methods ────────────────────────────────────────────

    /// Helper to batch delete documents using transactions.
    async fn batch_delete<T, F>(
        &self,
        items: &[T],
        collection: &str,
        id_extractor: F,
    ) -> Result<(), AppError>
    where
        F: Fn(&T) -> String,
    {
        let client = self.get_client()?;

        for chunk in items.chunks(BATCH_SIZE) {
            let mut transaction = self.begin_transaction().await?;

            for item in chunk {
                let doc_id = id_extractor(item);
                client
                    .fluent()
                    .delete()
                    .from(collection)
                    .document_id(&doc_id)
                    .add_to_transaction(&mut transaction)
                    .map_err(|e| {
                        AppError::Database(format!(
                            "Failed to add deletion to transaction for {}: {}",
                            collection, e
                        ))
                    })?;
            }

            transaction.commit().await.map_err(|e| {
                AppError::Database(format!("Failed to commit batch deletion: {}", e))
            })?;
        }

        Ok(())
    }

    // ─── User Data Deletion ────────────────────────────────────────

    /// Delete ALL data for a user.
    ///
    /// Deletes progress, activities, reviews, purchases and finally the
    /// user profile. The caller is responsible for checking that the
    /// account holds no financial records worth keeping.
    ///
    /// Returns the number of documents deleted.
    pub async fn delete_user_data(&self, user_id: &str) -> Result<usize, AppError> {
        let mut deleted_count = 0;

        // 1. Progress
        let progress = self.list_progress_for_user(user_id).await?;
        let count = progress.len();
        self.batch_delete(&progress, collections::PROGRESS, Progress::document_id)
            .await?;
        deleted_count += count;
        tracing::debug!(user_id, count, "Deleted progress records");

        // 2. Activities
        let owner = user_id.to_string();
        let activities: Vec<Activity> = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::ACTIVITIES)
            .filter(move |q| q.field("user_id").eq(owner.clone()))
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        let count = activities.len();
        self.batch_delete(&activities, collections::ACTIVITIES, |a: &Activity| {
            a.id.clone()
        })
        .await?;
        deleted_count += count;
        tracing::debug!(user_id, count, "Deleted activities");

        // 3. Reviews written by the user
        let author = user_id.to_string();
        let reviews: Vec<Review> = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::REVIEWS)
            .filter(move |q| q.field("user_id").eq(author.clone()))
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        let count = reviews.len();
        self.batch_delete(&reviews, collections::REVIEWS, Review::document_id)
            .await?;
        deleted_count += count;
        tracing::debug!(user_id, count, "Deleted reviews");

        // 4. Purchases (pending / failed only reach here)
        let purchases = self.list_purchases_for_user(user_id).await?;
        let count = purchases.len();
        self.batch_delete(&purchases, collections::PURCHASES, Purchase::document_id)
            .await?;
        deleted_count += count;
        tracing::debug!(user_id, count, "Deleted purchases");

        // 5. User profile
        self.get_client()?
            .fluent()
            .delete()
            .from(collections::USERS)
            .document_id(user_id)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        deleted_count += 1;

        tracing::info!(user_id, deleted_count, "User data deletion complete");

        Ok(deleted_count)
    }
}
