//! Append-only activity log writer.

use crate::db::FirestoreDb;
use crate::error::Result;
use crate::id_utils::new_document_id;
use crate::models::{Activity, ActivityKind};
use chrono::Utc;

#[derive(Clone)]
pub struct ActivityLog {
    db: FirestoreDb,
}

impl ActivityLog {
    pub fn new(db: FirestoreDb) -> Self {
        Self { db }
    }

    /// Append an entry for `user_id`.
    pub async fn record(
        &self,
        user_id: &str,
        kind: ActivityKind,
        title: &str,
        message: String,
        course_id: Option<&str>,
    ) -> Result<Activity> {
        let mut activity = Activity::new(
            new_document_id()?,
            user_id,
            kind,
            title,
            message,
            Utc::now(),
        );
        if let Some(course_id) = course_id {
            activity = activity.with_course(course_id);
        }
        self.db.add_activity(&activity).await?;
        Ok(activity)
    }

    /// Like [`record`](Self::record), for side effects after the primary write
    /// already succeeded: failures are logged, not returned.
    pub async fn record_or_warn(
        &self,
        user_id: &str,
        kind: ActivityKind,
        title: &str,
        message: String,
        course_id: Option<&str>,
    ) {
        if let Err(e) = self.record(user_id, kind, title, message, course_id).await {
            tracing::warn!(user_id, kind = ?kind, error = %e, "Failed to record activity");
        }
    }
}
