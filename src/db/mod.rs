//! Database layer (Firestore).

pub mod firestore;

pub use firestore::{FirestoreDb, PurchaseCompletion};

/// Collection names as constants.
pub mod collections {
    pub const USERS: &str = "users";
    pub const COURSES: &str = "courses";
    /// Keyed by `"{user_id}_{course_id}"`
    pub const PURCHASES: &str = "purchases";
    /// Keyed by `"{user_id}_{course_id}"`
    pub const PROGRESS: &str = "progress";
    pub const ACTIVITIES: &str = "activities";
    /// Keyed by uppercase coupon code
    pub const COUPONS: &str = "coupons";
    /// Keyed by `"{user_id}_{course_id}"`
    pub const REVIEWS: &str = "reviews";
}
