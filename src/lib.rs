// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Coursely: backend API for a paid-course e-learning platform
//!
//! Students buy courses, work through lessons, and earn certificates once
//! a course is complete. Anyone can verify a certificate by its ID.

pub mod config;
pub mod db;
pub mod error;
pub mod id_utils;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use db::FirestoreDb;
use services::{ActivityLog, EnrollmentService, ProgressRecorder};

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub db: FirestoreDb,
    pub activity_log: ActivityLog,
    pub progress: ProgressRecorder,
    pub enrollment: EnrollmentService,
}

impl AppState {
    /// Wire services around a database handle.
    pub fn new(config: Config, db: FirestoreDb, locks: services::ProgressLocks) -> Self {
        let activity_log = ActivityLog::new(db.clone());
        let progress = ProgressRecorder::new(db.clone(), activity_log.clone(), locks);
        let payments = services::PaymentClient::new(
            config.payment_base_url.clone(),
            config.payment_secret_key.clone(),
        );
        let enrollment = EnrollmentService::new(
            db.clone(),
            payments,
            activity_log.clone(),
            config.referral_commission_percent,
            format!("{}/payment/callback", config.frontend_url),
        );

        Self {
            config,
            db,
            activity_log,
            progress,
            enrollment,
        }
    }
}
