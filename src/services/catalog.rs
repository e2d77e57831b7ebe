// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Course/progress aggregation for catalog listings and detail pages.
//!
//! Pure functions: callers fetch courses, purchases and progress records and
//! this module joins them into view models. A course without a progress
//! record counts as 0%.

use crate::models::{Course, Progress, Purchase};
use crate::time_utils::format_duration_minutes;
use serde::Serialize;
use std::collections::HashMap;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Label summarizing a user's relationship to a course.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub enum Badge {
    Completed,
    #[serde(rename = "In Progress")]
    InProgress,
    Enrolled,
}

/// Completed > In Progress > Enrolled > none.
pub fn select_badge(enrolled: bool, percentage: u8) -> Option<Badge> {
    if !enrolled {
        return None;
    }
    Some(match percentage {
        100.. => Badge::Completed,
        1..=99 => Badge::InProgress,
        0 => Badge::Enrolled,
    })
}

/// Catalog entry as seen by one user.
#[derive(Debug, Clone, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "camelCase")]
pub struct CourseView {
    pub id: String,
    pub title: String,
    pub description: String,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub price: u64,
    pub thumbnail: Option<String>,
    pub category: Option<String>,
    pub lesson_count: usize,
    pub total_minutes: u32,
    /// e.g. "1h 5m"
    pub duration: String,
    pub enrolled: bool,
    pub completed: bool,
    pub progress: u8,
    pub badge: Option<Badge>,
}

/// Lesson entry on the course detail page.
#[derive(Debug, Clone, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "camelCase")]
pub struct LessonView {
    pub index: u32,
    pub title: String,
    pub duration_minutes: u32,
    pub duration: String,
    pub completed: bool,
    /// Only present for enrolled users
    pub video_url: Option<String>,
    /// Only present for enrolled users
    pub content: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "camelCase")]
pub struct CourseDetail {
    #[serde(flatten)]
    pub course: CourseView,
    pub lessons: Vec<LessonView>,
    pub certificate_issued: bool,
}

/// Build the view for one course.
pub fn build_course_view(
    course: &Course,
    purchase: Option<&Purchase>,
    progress: Option<&Progress>,
) -> CourseView {
    let enrolled = purchase.is_some_and(Purchase::is_completed);
    let percentage = progress.map(|p| p.percentage).unwrap_or(0);
    let total_minutes = course.total_minutes();

    CourseView {
        id: course.id.clone(),
        title: course.title.clone(),
        description: course.description.clone(),
        price: course.price,
        thumbnail: course.thumbnail.clone(),
        category: course.category.clone(),
        lesson_count: course.lesson_count(),
        total_minutes,
        duration: format_duration_minutes(total_minutes),
        enrolled,
        completed: percentage == 100,
        progress: percentage,
        badge: select_badge(enrolled, percentage),
    }
}

/// Build views for a list of courses, preserving course order.
///
/// `purchases` and `progress` should belong to a single user.
pub fn build_course_views(
    courses: &[Course],
    purchases: &[Purchase],
    progress: &[Progress],
) -> Vec<CourseView> {
    let purchases_by_course: HashMap<&str, &Purchase> = purchases
        .iter()
        .map(|p| (p.course_id.as_str(), p))
        .collect();
    let progress_by_course: HashMap<&str, &Progress> = progress
        .iter()
        .map(|p| (p.course_id.as_str(), p))
        .collect();

    courses
        .iter()
        .map(|course| {
            build_course_view(
                course,
                purchases_by_course.get(course.id.as_str()).copied(),
                progress_by_course.get(course.id.as_str()).copied(),
            )
        })
        .collect()
}

/// Build the detail view; lesson media is withheld from non-enrolled users.
pub fn build_course_detail(
    course: &Course,
    purchase: Option<&Purchase>,
    progress: Option<&Progress>,
) -> CourseDetail {
    let view = build_course_view(course, purchase, progress);
    let enrolled = view.enrolled;

    let lessons = course
        .lessons
        .iter()
        .enumerate()
        .map(|(index, lesson)| {
            let index = index as u32;
            let minutes = lesson.minutes();
            LessonView {
                index,
                title: lesson.title.clone(),
                duration_minutes: minutes,
                duration: format_duration_minutes(minutes),
                completed: progress.is_some_and(|p| p.lessons_completed.contains(&index)),
                video_url: lesson.video_url.clone().filter(|_| enrolled),
                content: lesson.content.clone().filter(|_| enrolled),
            }
        })
        .collect();

    CourseDetail {
        course: view,
        lessons,
        certificate_issued: progress.is_some_and(|p| p.certificate_issued),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Lesson, PurchaseStatus};
    use chrono::Utc;

    fn course(id: &str, durations: &[Option<u32>]) -> Course {
        let now = Utc::now();
        Course {
            id: id.to_string(),
            title: format!("Course {}", id),
            description: String::new(),
            price: 5_000,
            thumbnail: None,
            category: None,
            published: true,
            lessons: durations
                .iter()
                .enumerate()
                .map(|(i, d)| Lesson {
                    title: format!("Lesson {}", i),
                    video_url: Some(format!("video-{}", i)),
                    content: None,
                    duration_minutes: *d,
                })
                .collect(),
            created_at: now,
            updated_at: now,
        }
    }

    fn purchase(course_id: &str, status: PurchaseStatus) -> Purchase {
        let now = Utc::now();
        Purchase {
            user_id: "u1".to_string(),
            course_id: course_id.to_string(),
            status,
            reference: "ref".to_string(),
            amount: 5_000,
            original_amount: 5_000,
            coupon_code: None,
            authorization_url: None,
            created_at: now,
            updated_at: now,
            completed_at: None,
        }
    }

    fn progress(course_id: &str, percentage: u8) -> Progress {
        let mut p = Progress::new("u1", course_id, Utc::now());
        p.percentage = percentage;
        p
    }

    #[test]
    fn test_badge_priority() {
        assert_eq!(select_badge(true, 0), Some(Badge::Enrolled));
        assert_eq!(select_badge(true, 50), Some(Badge::InProgress));
        assert_eq!(select_badge(true, 100), Some(Badge::Completed));
        assert_eq!(select_badge(false, 0), None);
        assert_eq!(select_badge(false, 100), None);
    }

    #[test]
    fn test_badge_serializes_with_space() {
        let json = serde_json::to_string(&Badge::InProgress).unwrap();
        assert_eq!(json, "\"In Progress\"");
    }

    #[test]
    fn test_views_join_by_course() {
        let courses = vec![course("a", &[None]), course("b", &[Some(5), Some(5)])];
        let purchases = vec![purchase("b", PurchaseStatus::Completed)];
        let progress = vec![progress("b", 50)];

        let views = build_course_views(&courses, &purchases, &progress);

        assert_eq!(views[0].id, "a");
        assert!(!views[0].enrolled);
        assert_eq!(views[0].progress, 0);
        assert_eq!(views[0].badge, None);

        assert!(views[1].enrolled);
        assert_eq!(views[1].duration, "10m");
        assert_eq!(views[1].badge, Some(Badge::InProgress));
    }

    #[test]
    fn test_pending_purchase_is_not_enrollment() {
        let c = course("a", &[None]);
        let p = purchase("a", PurchaseStatus::Pending);
        let view = build_course_view(&c, Some(&p), None);
        assert!(!view.enrolled);
        assert_eq!(view.badge, None);
    }

    #[test]
    fn test_detail_hides_media_when_not_enrolled() {
        let c = course("a", &[Some(10), Some(10), Some(45)]);
        let detail = build_course_detail(&c, None, None);
        assert_eq!(detail.course.duration, "1h 5m");
        assert!(detail.lessons.iter().all(|l| l.video_url.is_none()));

        let p = purchase("a", PurchaseStatus::Completed);
        let mut pr = progress("a", 33);
        pr.lessons_completed.insert(1);
        let detail = build_course_detail(&c, Some(&p), Some(&pr));
        assert_eq!(detail.lessons[0].video_url.as_deref(), Some("video-0"));
        assert!(detail.lessons[1].completed);
        assert!(!detail.lessons[0].completed);
    }
}
