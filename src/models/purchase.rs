//! Course purchase (enrollment) model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PurchaseStatus {
    Pending,
    Completed,
    Failed,
    Refunded,
}

impl PurchaseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PurchaseStatus::Pending => "pending",
            PurchaseStatus::Completed => "completed",
            PurchaseStatus::Failed => "failed",
            PurchaseStatus::Refunded => "refunded",
        }
    }
}

/// Purchase record stored in Firestore.
///
/// Document ID is `"{user_id}_{course_id}"`, so a user holds at most one
/// purchase per course. A failed purchase is overwritten by the next attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Purchase {
    pub user_id: String,
    pub course_id: String,
    pub status: PurchaseStatus,
    /// Payment-provider transaction reference (unique)
    pub reference: String,
    /// Amount charged after discounts (minor currency units)
    pub amount: u64,
    /// Course price before discounts
    pub original_amount: u64,
    #[serde(default)]
    pub coupon_code: Option<String>,
    /// Hosted checkout page issued for `reference`
    #[serde(default)]
    pub authorization_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
}

impl Purchase {
    pub fn document_id(&self) -> String {
        super::pair_document_id(&self.user_id, &self.course_id)
    }

    pub fn is_completed(&self) -> bool {
        self.status == PurchaseStatus::Completed
    }

    /// Whether a new payment attempt may replace this record.
    pub fn can_retry(&self) -> bool {
        matches!(self.status, PurchaseStatus::Failed | PurchaseStatus::Pending)
    }
}
