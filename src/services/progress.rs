// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Lesson completion recording.
//!
//! Handles the workflow:
//! 1. Validate user, course, lesson index and enrollment
//! 2. Serialize concurrent completions for the same (user, course) in-process
//! 3. Add the lesson to the progress record in a Firestore transaction
//! 4. Log lesson / course completion activities

use crate::db::FirestoreDb;
use crate::error::{AppError, Result};
use crate::models::{ActivityKind, LessonOutcome, Progress};
use crate::services::ActivityLog;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Per-(user, course) locks shared across requests within this instance.
pub type ProgressLocks = Arc<DashMap<String, Arc<Mutex<()>>>>;

/// Result of a lesson completion call.
#[derive(Debug, Clone)]
pub struct LessonCompletion {
    pub progress: Progress,
    pub outcome: LessonOutcome,
}

/// Records lesson completions against progress records.
#[derive(Clone)]
pub struct ProgressRecorder {
    db: FirestoreDb,
    activity_log: ActivityLog,
    locks: ProgressLocks,
}

impl ProgressRecorder {
    pub fn new(db: FirestoreDb, activity_log: ActivityLog, locks: ProgressLocks) -> Self {
        Self {
            db,
            activity_log,
            locks,
        }
    }

    /// Mark a lesson complete for a user. Idempotent.
    pub async fn complete_lesson(
        &self,
        user_id: &str,
        course_id: &str,
        lesson_index: u32,
    ) -> Result<LessonCompletion> {
        if user_id.is_empty() || course_id.is_empty() {
            return Err(AppError::BadRequest(
                "Course ID and lesson ID are required".to_string(),
            ));
        }

        self.db
            .get_user(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

        let course = self
            .db
            .get_course(course_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Course not found".to_string()))?;

        let total_lessons = course.lesson_count();
        if lesson_index as usize >= total_lessons {
            return Err(AppError::BadRequest(format!(
                "Lesson {} does not exist in this course",
                lesson_index
            )));
        }

        let enrolled = self
            .db
            .get_purchase(user_id, course_id)
            .await?
            .is_some_and(|p| p.is_completed());
        if !enrolled {
            return Err(AppError::Forbidden(
                "You are not enrolled in this course".to_string(),
            ));
        }

        let key = format!("{}:{}", user_id, course_id);
        let result = {
            let lock = self
                .locks
                .entry(key.clone())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone();
            let _guard = lock.lock().await;

            self.db
                .record_lesson_atomic(user_id, course_id, lesson_index, total_lessons)
                .await
        };
        // Drop the lock entry once nobody else is waiting on it.
        self.locks
            .remove_if(&key, |_, lock| Arc::strong_count(lock) == 1);

        let (progress, outcome) = result?;

        if outcome.newly_completed {
            tracing::info!(
                user_id,
                course_id,
                lesson_index,
                percentage = outcome.percentage,
                "Lesson completed"
            );
            let title = course
                .lessons
                .get(lesson_index as usize)
                .map(|l| l.title.as_str())
                .unwrap_or("Lesson");
            self.activity_log
                .record_or_warn(
                    user_id,
                    ActivityKind::LessonCompleted,
                    "Lesson completed",
                    format!("You completed \"{}\" in {}", title, course.title),
                    Some(course_id),
                )
                .await;
        } else {
            tracing::debug!(
                user_id,
                course_id,
                lesson_index,
                "Lesson already completed (idempotent skip)"
            );
        }

        if outcome.course_completed {
            self.activity_log
                .record_or_warn(
                    user_id,
                    ActivityKind::CourseCompleted,
                    "Course completed",
                    format!("Congratulations! You completed {}", course.title),
                    Some(course_id),
                )
                .await;
        }

        Ok(LessonCompletion { progress, outcome })
    }
}
