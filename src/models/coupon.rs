//! Discount coupon model.

use crate::error::{AppError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Coupon stored in Firestore, keyed by its uppercase code.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Coupon {
    pub code: String,
    /// 1..=100
    pub discount_percent: u8,
    /// Maximum number of redemptions (None = unlimited)
    #[serde(default)]
    pub usage_limit: Option<u32>,
    #[serde(default)]
    pub usage_count: u32,
    pub active: bool,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Coupon {
    /// Normalize a user-entered code to the stored form.
    pub fn normalize_code(code: &str) -> String {
        code.trim().to_uppercase()
    }

    /// Check the coupon can be redeemed now.
    pub fn check_redeemable(&self, now: DateTime<Utc>) -> Result<()> {
        if !self.active {
            return Err(AppError::BadRequest("Coupon is no longer valid".to_string()));
        }
        if self.expires_at.is_some_and(|expires| expires <= now) {
            return Err(AppError::BadRequest("Coupon has expired".to_string()));
        }
        if self
            .usage_limit
            .is_some_and(|limit| self.usage_count >= limit)
        {
            return Err(AppError::BadRequest("Coupon usage limit reached".to_string()));
        }
        Ok(())
    }

    /// Price after discount, rounding the discount down.
    pub fn apply(&self, price: u64) -> u64 {
        let percent = u64::from(self.discount_percent.min(100));
        price - price * percent / 100
    }
}
