//! Course review model with helpfulness votes.

use crate::error::{AppError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Review stored in Firestore, one per (user, course).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Review {
    pub user_id: String,
    pub user_name: String,
    pub course_id: String,
    /// 1..=5
    pub rating: u8,
    #[serde(default)]
    pub comment: String,
    /// IDs of users who found the review helpful
    #[serde(default)]
    pub helpful_votes: BTreeSet<String>,
    /// IDs of users who did not
    #[serde(default)]
    pub not_helpful_votes: BTreeSet<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Review {
    pub fn document_id(&self) -> String {
        super::pair_document_id(&self.user_id, &self.course_id)
    }

    /// Record a vote. A voter sits in at most one of the two sets.
    ///
    /// Returns `false` if the vote was already recorded.
    pub fn vote(&mut self, voter_id: &str, helpful: bool) -> Result<bool> {
        if voter_id == self.user_id {
            return Err(AppError::BadRequest(
                "You cannot vote on your own review".to_string(),
            ));
        }

        let (add_to, remove_from) = if helpful {
            (&mut self.helpful_votes, &mut self.not_helpful_votes)
        } else {
            (&mut self.not_helpful_votes, &mut self.helpful_votes)
        };
        remove_from.remove(voter_id);
        Ok(add_to.insert(voter_id.to_string()))
    }
}

/// Mean rating rounded to one decimal place; 0 when there are no reviews.
pub fn average_rating(reviews: &[Review]) -> f64 {
    if reviews.is_empty() {
        return 0.0;
    }
    let sum: u32 = reviews.iter().map(|r| u32::from(r.rating)).sum();
    let mean = f64::from(sum) / reviews.len() as f64;
    (mean * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn review(rating: u8) -> Review {
        Review {
            user_id: "author".to_string(),
            user_name: "Author".to_string(),
            course_id: "c1".to_string(),
            rating,
            comment: String::new(),
            helpful_votes: BTreeSet::new(),
            not_helpful_votes: BTreeSet::new(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_double_vote_not_counted() {
        let mut r = review(5);
        assert!(r.vote("v1", true).unwrap());
        assert!(!r.vote("v1", true).unwrap());
        assert_eq!(r.helpful_votes.len(), 1);
    }

    #[test]
    fn test_switching_vote_moves_voter() {
        let mut r = review(5);
        r.vote("v1", true).unwrap();
        r.vote("v1", false).unwrap();
        assert!(r.helpful_votes.is_empty());
        assert!(r.not_helpful_votes.contains("v1"));
    }

    #[test]
    fn test_author_cannot_vote() {
        let mut r = review(4);
        assert!(r.vote("author", true).is_err());
    }

    #[test]
    fn test_average_rating() {
        assert_eq!(average_rating(&[]), 0.0);
        assert_eq!(average_rating(&[review(5), review(4), review(4)]), 4.3);
    }
}
