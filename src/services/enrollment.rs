// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Course purchase workflow.
//!
//! Handles:
//! 1. Checkout: price, coupon discount, pending purchase, gateway session
//! 2. Settlement from either the verify endpoint or the gateway webhook
//! 3. Refunds (admin)
//!
//! Settlement is idempotent: the verify call and the webhook usually both
//! arrive for the same payment.

use crate::db::{FirestoreDb, PurchaseCompletion};
use crate::error::{AppError, Result};
use crate::id_utils::new_payment_reference;
use crate::models::{ActivityKind, Coupon, Purchase, PurchaseStatus, User};
use crate::services::payments::{PaymentClient, WebhookEvent};
use crate::services::ActivityLog;
use chrono::Utc;
use serde::Serialize;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Webhook event that settles a payment.
const CHARGE_SUCCESS_EVENT: &str = "charge.success";

/// Response to a checkout request.
#[derive(Debug, Clone, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutSession {
    pub reference: String,
    /// Hosted checkout page; absent when nothing is owed
    pub authorization_url: Option<String>,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub amount: u64,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub original_amount: u64,
    pub status: String,
}

#[derive(Clone)]
pub struct EnrollmentService {
    db: FirestoreDb,
    payments: PaymentClient,
    activity_log: ActivityLog,
    commission_percent: u64,
    callback_url: String,
}

impl EnrollmentService {
    pub fn new(
        db: FirestoreDb,
        payments: PaymentClient,
        activity_log: ActivityLog,
        commission_percent: u64,
        callback_url: String,
    ) -> Self {
        Self {
            db,
            payments,
            activity_log,
            commission_percent,
            callback_url,
        }
    }

    pub fn payments(&self) -> &PaymentClient {
        &self.payments
    }

    /// Create a pending purchase and a gateway checkout session.
    pub async fn checkout(
        &self,
        user: &User,
        course_id: &str,
        coupon_code: Option<&str>,
    ) -> Result<CheckoutSession> {
        let course = self
            .db
            .get_course(course_id)
            .await?
            .filter(|c| c.published)
            .ok_or_else(|| AppError::NotFound("Course not found".to_string()))?;

        let existing = self.db.get_purchase(&user.id, course_id).await?;
        if let Some(existing) = &existing {
            if !existing.can_retry() {
                return Err(AppError::Conflict(match existing.status {
                    PurchaseStatus::Completed => "You are already enrolled in this course",
                    _ => "This purchase was refunded; contact support to re-enroll",
                }
                .to_string()));
            }
        }

        let now = Utc::now();
        let (amount, coupon_code) = match coupon_code.map(Coupon::normalize_code) {
            Some(code) if !code.is_empty() => {
                let coupon = self
                    .db
                    .get_coupon(&code)
                    .await?
                    .ok_or_else(|| AppError::BadRequest("Invalid coupon code".to_string()))?;
                coupon.check_redeemable(now)?;
                (coupon.apply(course.price), Some(coupon.code))
            }
            _ => (course.price, None),
        };

        if let Some(pending) = existing.filter(|p| p.status == PurchaseStatus::Pending) {
            if let Some(session) = self
                .resume_pending(&pending, amount, coupon_code.as_deref())
                .await?
            {
                return Ok(session);
            }
        }

        let mut purchase = Purchase {
            user_id: user.id.clone(),
            course_id: course.id.clone(),
            status: PurchaseStatus::Pending,
            reference: new_payment_reference()?,
            amount,
            original_amount: course.price,
            coupon_code,
            authorization_url: None,
            created_at: now,
            updated_at: now,
            completed_at: None,
        };
        self.db.upsert_purchase(&purchase).await?;

        tracing::info!(
            user_id = %user.id,
            course_id,
            amount,
            coupon = ?purchase.coupon_code,
            "Checkout started"
        );

        if amount == 0 {
            self.settle(&purchase).await?;
            return Ok(CheckoutSession {
                reference: purchase.reference,
                authorization_url: None,
                amount,
                original_amount: course.price,
                status: PurchaseStatus::Completed.as_str().to_string(),
            });
        }

        let session = self
            .payments
            .initialize(&user.email, amount, &purchase.reference, &self.callback_url)
            .await?;

        purchase.authorization_url = Some(session.authorization_url);
        purchase.updated_at = Utc::now();
        self.db.upsert_purchase(&purchase).await?;

        Ok(CheckoutSession {
            reference: purchase.reference,
            authorization_url: purchase.authorization_url,
            amount,
            original_amount: course.price,
            status: PurchaseStatus::Pending.as_str().to_string(),
        })
    }

    /// Decide what happens to an existing pending purchase on a new checkout.
    ///
    /// Returns a session when the pending purchase stands: same terms hand
    /// back the same gateway session, and a reference the gateway reports as
    /// paid is settled. `None` means the pending purchase can be replaced.
    async fn resume_pending(
        &self,
        pending: &Purchase,
        amount: u64,
        coupon_code: Option<&str>,
    ) -> Result<Option<CheckoutSession>> {
        // No session was ever issued, so nothing can be paid against it
        let Some(authorization_url) = &pending.authorization_url else {
            return Ok(None);
        };

        if pending.amount == amount && pending.coupon_code.as_deref() == coupon_code {
            tracing::info!(
                user_id = %pending.user_id,
                course_id = %pending.course_id,
                reference = %pending.reference,
                "Resuming pending checkout"
            );
            return Ok(Some(CheckoutSession {
                reference: pending.reference.clone(),
                authorization_url: Some(authorization_url.clone()),
                amount: pending.amount,
                original_amount: pending.original_amount,
                status: PurchaseStatus::Pending.as_str().to_string(),
            }));
        }

        // Terms changed: the old session must be closed before it is replaced
        let transaction = self.payments.verify(&pending.reference).await?;

        if transaction.is_success() {
            if transaction.amount != pending.amount {
                tracing::warn!(
                    reference = %pending.reference,
                    expected = pending.amount,
                    paid = transaction.amount,
                    "Payment amount mismatch"
                );
                self.mark_failed(pending).await?;
                return Err(AppError::BadRequest("Payment amount mismatch".to_string()));
            }
            self.settle(pending).await?;
            return Ok(Some(CheckoutSession {
                reference: pending.reference.clone(),
                authorization_url: None,
                amount: pending.amount,
                original_amount: pending.original_amount,
                status: PurchaseStatus::Completed.as_str().to_string(),
            }));
        }

        if transaction.is_failed() {
            return Ok(None);
        }

        Err(AppError::Conflict(
            "A payment for this course is already in progress".to_string(),
        ))
    }

    /// Ask the gateway about a purchase made by `user_id` and settle it.
    pub async fn verify(&self, user_id: &str, reference: &str) -> Result<Purchase> {
        let purchase = self
            .db
            .find_purchase_by_reference(reference)
            .await?
            .filter(|p| p.user_id == user_id)
            .ok_or_else(|| AppError::NotFound("Payment not found".to_string()))?;

        if purchase.status != PurchaseStatus::Pending {
            return Ok(purchase);
        }

        let transaction = self.payments.verify(reference).await?;

        if transaction.is_success() {
            if transaction.amount != purchase.amount {
                tracing::warn!(
                    reference,
                    expected = purchase.amount,
                    paid = transaction.amount,
                    "Payment amount mismatch"
                );
                self.mark_failed(&purchase).await?;
                return Err(AppError::BadRequest("Payment amount mismatch".to_string()));
            }
            self.settle(&purchase).await?;
        } else if transaction.is_failed() {
            self.mark_failed(&purchase).await?;
        }

        self.db
            .get_purchase(&purchase.user_id, &purchase.course_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Payment not found".to_string()))
    }

    /// Handle a signed gateway webhook.
    pub async fn handle_webhook(&self, body: &[u8], signature: Option<&str>) -> Result<()> {
        let valid = signature.is_some_and(|s| self.payments.verify_webhook_signature(body, s));
        if !valid {
            tracing::warn!("Security Alert: Payment webhook signature mismatch");
            return Err(AppError::Unauthorized);
        }

        let event: WebhookEvent = serde_json::from_slice(body)
            .map_err(|e| AppError::BadRequest(format!("Invalid webhook payload: {}", e)))?;

        if event.event != CHARGE_SUCCESS_EVENT {
            tracing::debug!(event = %event.event, "Ignoring payment webhook event");
            return Ok(());
        }

        let Some(purchase) = self
            .db
            .find_purchase_by_reference(&event.data.reference)
            .await?
        else {
            tracing::warn!(reference = %event.data.reference, "Webhook for unknown payment");
            return Ok(());
        };

        if event.data.amount != purchase.amount {
            tracing::warn!(
                reference = %event.data.reference,
                expected = purchase.amount,
                paid = event.data.amount,
                "Webhook amount mismatch, not settling"
            );
            return Ok(());
        }

        self.settle(&purchase).await?;
        Ok(())
    }

    /// Complete a purchase and log the side effects. Idempotent.
    ///
    /// Returns `true` if this call completed the purchase.
    pub async fn settle(&self, purchase: &Purchase) -> Result<bool> {
        let completion = self
            .db
            .complete_purchase_atomic(
                &purchase.user_id,
                &purchase.course_id,
                self.commission_percent,
            )
            .await?;

        let Some(PurchaseCompletion {
            purchase,
            referral_credit,
        }) = completion
        else {
            return Ok(false);
        };

        let course_title = self
            .db
            .get_course(&purchase.course_id)
            .await?
            .map(|c| c.title)
            .unwrap_or_else(|| "your course".to_string());

        self.activity_log
            .record_or_warn(
                &purchase.user_id,
                ActivityKind::Enrollment,
                "Enrollment confirmed",
                format!("You are now enrolled in {}", course_title),
                Some(&purchase.course_id),
            )
            .await;

        if let Some((referrer_id, commission)) = referral_credit {
            self.activity_log
                .record_or_warn(
                    &referrer_id,
                    ActivityKind::ReferralEarned,
                    "Referral reward",
                    format!("You earned {} from a referred purchase", commission),
                    None,
                )
                .await;
        }

        Ok(true)
    }

    async fn mark_failed(&self, purchase: &Purchase) -> Result<()> {
        let mut failed = purchase.clone();
        failed.status = PurchaseStatus::Failed;
        failed.updated_at = Utc::now();
        self.db.upsert_purchase(&failed).await?;

        tracing::info!(
            user_id = %purchase.user_id,
            course_id = %purchase.course_id,
            reference = %purchase.reference,
            "Payment failed"
        );

        self.activity_log
            .record_or_warn(
                &purchase.user_id,
                ActivityKind::PaymentFailed,
                "Payment failed",
                "Your payment could not be completed. Please try again.".to_string(),
                Some(&purchase.course_id),
            )
            .await;
        Ok(())
    }

    /// Mark a completed purchase as refunded, revoking enrollment.
    ///
    /// The money movement itself happens at the gateway.
    pub async fn refund(&self, user_id: &str, course_id: &str) -> Result<Purchase> {
        let mut purchase = self
            .db
            .get_purchase(user_id, course_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Purchase not found".to_string()))?;

        if purchase.status != PurchaseStatus::Completed {
            return Err(AppError::BadRequest(format!(
                "Only completed purchases can be refunded (status: {})",
                purchase.status.as_str()
            )));
        }

        purchase.status = PurchaseStatus::Refunded;
        purchase.updated_at = Utc::now();
        self.db.upsert_purchase(&purchase).await?;

        tracing::info!(user_id, course_id, amount = purchase.amount, "Purchase refunded");

        self.activity_log
            .record_or_warn(
                user_id,
                ActivityKind::Refund,
                "Refund processed",
                "Your purchase has been refunded.".to_string(),
                Some(course_id),
            )
            .await;

        Ok(purchase)
    }
}
