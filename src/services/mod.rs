// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod activity_log;
pub mod catalog;
pub mod certificates;
pub mod enrollment;
pub mod password;
pub mod payments;
pub mod progress;

pub use activity_log::ActivityLog;
pub use enrollment::EnrollmentService;
pub use payments::PaymentClient;
pub use progress::{ProgressLocks, ProgressRecorder};
