// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application configuration loaded from environment variables.

use std::env;

/// Default referral commission (percent of the amount paid).
pub const DEFAULT_REFERRAL_COMMISSION_PERCENT: u64 = 10;

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    // --- Environment Variables (non-sensitive) ---
    /// Frontend URL (CORS origin and payment callback target)
    pub frontend_url: String,
    /// Public URL of this API
    pub api_url: String,
    /// GCP project ID (Firestore)
    pub gcp_project_id: String,
    /// Server port
    pub port: u16,
    /// Payment gateway base URL
    pub payment_base_url: String,
    /// Percent of a referred purchase credited to the referrer
    pub referral_commission_percent: u64,

    // --- Secrets ---
    /// JWT signing key for session tokens (raw bytes)
    pub jwt_signing_key: Vec<u8>,
    /// Payment gateway secret key (API auth and webhook signatures)
    pub payment_secret_key: String,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let port = env::var("PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse()
            .unwrap_or(8080);

        let referral_commission_percent = match env::var("REFERRAL_COMMISSION_PERCENT") {
            Ok(raw) => {
                let percent: u64 = raw
                    .trim()
                    .parse()
                    .map_err(|_| ConfigError::Invalid("REFERRAL_COMMISSION_PERCENT"))?;
                if percent > 100 {
                    return Err(ConfigError::Invalid("REFERRAL_COMMISSION_PERCENT"));
                }
                percent
            }
            Err(_) => DEFAULT_REFERRAL_COMMISSION_PERCENT,
        };

        Ok(Self {
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
            api_url: env::var("API_URL").unwrap_or_else(|_| format!("http://localhost:{}", port)),
            gcp_project_id: env::var("GCP_PROJECT_ID").unwrap_or_else(|_| "local-dev".to_string()),
            port,
            payment_base_url: env::var("PAYMENT_BASE_URL")
                .unwrap_or_else(|_| "https://api.paystack.co".to_string()),
            referral_commission_percent,

            jwt_signing_key: env::var("JWT_SIGNING_KEY")
                .map_err(|_| ConfigError::Missing("JWT_SIGNING_KEY"))?
                .into_bytes(),
            payment_secret_key: env::var("PAYMENT_SECRET_KEY")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("PAYMENT_SECRET_KEY"))?,
        })
    }

    /// Config for tests only.
    pub fn test_default() -> Self {
        Self {
            frontend_url: "http://localhost:5173".to_string(),
            api_url: "http://localhost:8080".to_string(),
            gcp_project_id: "test-project".to_string(),
            port: 8080,
            payment_base_url: "http://127.0.0.1:9".to_string(),
            referral_commission_percent: DEFAULT_REFERRAL_COMMISSION_PERCENT,
            jwt_signing_key: b"test_jwt_key_32_bytes_minimum!!".to_vec(),
            payment_secret_key: "sk_test_secret".to_string(),
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),
}
