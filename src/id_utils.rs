// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Random identifiers for documents, payment references and referral codes.
//!
//! IDs are lowercase hex and never contain `-`, which keeps the
//! `"{user_id}-{course_id}"` certificate identifier unambiguous.

use crate::error::{AppError, Result};
use ring::rand::{SecureRandom, SystemRandom};

const DOCUMENT_ID_BYTES: usize = 12;
const REFERENCE_BYTES: usize = 16;
const REFERRAL_CODE_BYTES: usize = 4;

fn random_bytes<const N: usize>() -> Result<[u8; N]> {
    let mut bytes = [0u8; N];
    SystemRandom::new()
        .fill(&mut bytes)
        .map_err(|_| AppError::Internal(anyhow::anyhow!("System RNG failure")))?;
    Ok(bytes)
}

/// New document ID (24 hex chars).
pub fn new_document_id() -> Result<String> {
    Ok(hex::encode(random_bytes::<DOCUMENT_ID_BYTES>()?))
}

/// New payment reference (32 hex chars).
pub fn new_payment_reference() -> Result<String> {
    Ok(hex::encode(random_bytes::<REFERENCE_BYTES>()?))
}

/// New referral code (8 uppercase hex chars).
pub fn new_referral_code() -> Result<String> {
    Ok(hex::encode_upper(random_bytes::<REFERRAL_CODE_BYTES>()?))
}
