// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Per-user, per-course lesson progress.
//!
//! One document per (user, course) pair, keyed by `"{user_id}_{course_id}"`.
//! The completed lesson set only ever grows, so the derived percentage never
//! regresses.

use crate::error::{AppError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Percentage at which a course counts as completed.
pub const COMPLETE_PERCENTAGE: u8 = 100;

/// Progress record stored in Firestore.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Progress {
    pub user_id: String,
    pub course_id: String,
    /// Indices of completed lessons
    #[serde(default)]
    pub lessons_completed: BTreeSet<u32>,
    /// Derived from `lessons_completed` and the course's lesson count
    #[serde(default)]
    pub percentage: u8,
    #[serde(default)]
    pub certificate_issued: bool,
    #[serde(default)]
    pub certificate_issued_at: Option<DateTime<Utc>>,
    /// When the percentage first reached 100
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    pub last_accessed: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// What a single lesson-completion call changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LessonOutcome {
    /// The lesson was not in the completed set before this call
    pub newly_completed: bool,
    /// This call moved the course to 100%
    pub course_completed: bool,
    pub percentage: u8,
}

/// `floor(completed * 100 / total)`, capped at 100. A course without lessons is 0%.
pub fn completion_percentage(completed: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    let percent = (completed.min(total) * 100) / total;
    percent as u8
}

impl Progress {
    /// Empty progress record.
    pub fn new(user_id: &str, course_id: &str, now: DateTime<Utc>) -> Self {
        Self {
            user_id: user_id.to_string(),
            course_id: course_id.to_string(),
            lessons_completed: BTreeSet::new(),
            percentage: 0,
            certificate_issued: false,
            certificate_issued_at: None,
            completed_at: None,
            last_accessed: now,
            created_at: now,
        }
    }

    pub fn document_id(&self) -> String {
        super::pair_document_id(&self.user_id, &self.course_id)
    }

    /// Record a completed lesson and recompute the percentage.
    ///
    /// Re-completing a lesson leaves the set and percentage untouched and only
    /// refreshes `last_accessed`.
    pub fn mark_lesson_complete(
        &mut self,
        lesson_index: u32,
        total_lessons: usize,
        now: DateTime<Utc>,
    ) -> LessonOutcome {
        self.last_accessed = now;

        let newly_completed = self.lessons_completed.insert(lesson_index);
        let mut course_completed = false;

        if newly_completed {
            // Indices past the end of a shortened course no longer count.
            let counted = self
                .lessons_completed
                .range(..u32::try_from(total_lessons).unwrap_or(u32::MAX))
                .count();
            let recomputed = completion_percentage(counted, total_lessons);
            // Monotonic even if the course lost lessons since the last call.
            self.percentage = self.percentage.max(recomputed);

            if self.is_complete() && self.completed_at.is_none() {
                self.completed_at = Some(now);
                course_completed = true;
            }
        }

        LessonOutcome {
            newly_completed,
            course_completed,
            percentage: self.percentage,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.percentage == COMPLETE_PERCENTAGE
    }

    /// Certificate is available only for a completed course whose certificate was issued.
    pub fn certificate_available(&self) -> bool {
        self.is_complete() && self.certificate_issued
    }

    /// Explicit issuance step.
    ///
    /// Returns `true` if the certificate was newly issued, `false` if it was
    /// already issued.
    pub fn issue_certificate(&mut self, now: DateTime<Utc>) -> Result<bool> {
        if !self.is_complete() {
            return Err(AppError::BadRequest("Course not completed".to_string()));
        }
        if self.certificate_issued {
            return Ok(false);
        }
        self.certificate_issued = true;
        self.certificate_issued_at = Some(now);
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn progress() -> Progress {
        Progress::new("u1", "c1", Utc::now())
    }

    #[test]
    fn test_percentage_floors() {
        assert_eq!(completion_percentage(1, 3), 33);
        assert_eq!(completion_percentage(2, 3), 66);
        assert_eq!(completion_percentage(3, 3), 100);
        assert_eq!(completion_percentage(0, 0), 0);
        assert_eq!(completion_percentage(5, 4), 100);
    }

    #[test]
    fn test_first_lesson_creates_partial_progress() {
        let mut p = progress();
        let outcome = p.mark_lesson_complete(0, 4, Utc::now());

        assert!(outcome.newly_completed);
        assert!(!outcome.course_completed);
        assert_eq!(p.percentage, 25);
        assert_eq!(p.document_id(), "u1_c1");
    }

    #[test]
    fn test_duplicate_completion_is_noop() {
        let mut p = progress();
        p.mark_lesson_complete(1, 4, Utc::now());
        let before = p.lessons_completed.clone();

        let outcome = p.mark_lesson_complete(1, 4, Utc::now());

        assert!(!outcome.newly_completed);
        assert_eq!(p.lessons_completed, before);
        assert_eq!(p.percentage, 25);
    }

    #[test]
    fn test_completion_stamped_once() {
        let mut p = progress();
        p.mark_lesson_complete(0, 2, Utc::now());
        let outcome = p.mark_lesson_complete(1, 2, Utc::now());
        assert!(outcome.course_completed);
        let stamped = p.completed_at;
        assert!(stamped.is_some());

        let again = p.mark_lesson_complete(1, 2, Utc::now());
        assert!(!again.course_completed);
        assert_eq!(p.completed_at, stamped);
    }

    #[test]
    fn test_issue_requires_completion() {
        let mut p = progress();
        p.mark_lesson_complete(0, 2, Utc::now());
        assert!(matches!(
            p.issue_certificate(Utc::now()),
            Err(AppError::BadRequest(_))
        ));

        p.mark_lesson_complete(1, 2, Utc::now());
        assert!(p.issue_certificate(Utc::now()).unwrap());
        assert!(!p.issue_certificate(Utc::now()).unwrap());
        assert!(p.certificate_available());
    }

    #[test]
    fn test_shortened_course_ignores_removed_lessons() {
        let mut p = progress();
        p.mark_lesson_complete(2, 4, Utc::now());
        p.mark_lesson_complete(3, 4, Utc::now());
        assert_eq!(p.percentage, 50);

        // Course now has only lessons 0 and 1
        let outcome = p.mark_lesson_complete(0, 2, Utc::now());
        assert!(!outcome.course_completed);
        assert_eq!(p.percentage, 50);
        assert!(p.completed_at.is_none());

        let outcome = p.mark_lesson_complete(1, 2, Utc::now());
        assert!(outcome.course_completed);
        assert_eq!(p.percentage, 100);
    }

    #[test]
    fn test_issued_flag_alone_is_not_available() {
        let mut p = progress();
        p.percentage = 80;
        p.certificate_issued = true;
        assert!(!p.certificate_available());
    }
}
