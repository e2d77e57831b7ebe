// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Course catalog model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Duration assumed for a lesson that does not declare one.
pub const DEFAULT_LESSON_MINUTES: u32 = 10;

/// A single lesson. Lessons are identified by their index in the course.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lesson {
    pub title: String,
    /// Video reference (URL or provider ID)
    #[serde(default)]
    pub video_url: Option<String>,
    /// Text content
    #[serde(default)]
    pub content: Option<String>,
    /// Duration in minutes
    #[serde(default)]
    pub duration_minutes: Option<u32>,
}

impl Lesson {
    pub fn minutes(&self) -> u32 {
        self.duration_minutes.unwrap_or(DEFAULT_LESSON_MINUTES)
    }
}

/// Course stored in Firestore.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Course {
    /// Document ID
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// Price in minor currency units
    pub price: u64,
    #[serde(default)]
    pub thumbnail: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    /// Unpublished courses are hidden from the catalog and cannot be bought
    #[serde(default)]
    pub published: bool,
    #[serde(default)]
    pub lessons: Vec<Lesson>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Course {
    pub fn lesson_count(&self) -> usize {
        self.lessons.len()
    }

    /// Sum of lesson durations in minutes.
    pub fn total_minutes(&self) -> u32 {
        self.lessons.iter().map(Lesson::minutes).sum()
    }
}
