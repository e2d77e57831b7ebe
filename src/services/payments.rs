// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Payment gateway client (Paystack-compatible API).
//!
//! Handles:
//! - Transaction initialization (returns the hosted checkout URL)
//! - Transaction verification by reference
//! - Webhook signature verification (HMAC-SHA512 of the raw body)

use crate::error::AppError;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha512;

type HmacSha512 = Hmac<Sha512>;

/// Header carrying the webhook signature.
pub const SIGNATURE_HEADER: &str = "x-paystack-signature";

/// Gateway envelope: `{status, message, data}`.
#[derive(Debug, Deserialize)]
struct GatewayResponse<T> {
    status: bool,
    #[serde(default)]
    message: String,
    data: Option<T>,
}

/// Checkout session created by the gateway.
#[derive(Debug, Clone, Deserialize)]
pub struct InitializedPayment {
    pub authorization_url: String,
    pub access_code: String,
    pub reference: String,
}

/// Transaction state reported by the gateway.
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayTransaction {
    /// "success", "failed", "abandoned", "ongoing", ...
    pub status: String,
    pub reference: String,
    /// Amount in minor currency units
    pub amount: u64,
}

impl GatewayTransaction {
    pub fn is_success(&self) -> bool {
        self.status == "success"
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.status.as_str(), "failed" | "abandoned" | "reversed")
    }
}

/// Webhook event payload (only the fields we use).
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEvent {
    pub event: String,
    pub data: WebhookData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookData {
    pub reference: String,
    #[serde(default)]
    pub amount: u64,
}

#[derive(Serialize)]
struct InitializeRequest<'a> {
    email: &'a str,
    amount: u64,
    reference: &'a str,
    callback_url: &'a str,
}

/// Payment gateway API client.
#[derive(Clone)]
pub struct PaymentClient {
    http: reqwest::Client,
    base_url: String,
    secret_key: String,
}

impl PaymentClient {
    pub fn new(base_url: String, secret_key: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            secret_key,
        }
    }

    /// Start a hosted checkout for `amount` (minor units).
    pub async fn initialize(
        &self,
        email: &str,
        amount: u64,
        reference: &str,
        callback_url: &str,
    ) -> Result<InitializedPayment, AppError> {
        let url = format!("{}/transaction/initialize", self.base_url);

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.secret_key)
            .json(&InitializeRequest {
                email,
                amount,
                reference,
                callback_url,
            })
            .send()
            .await
            .map_err(|e| AppError::PaymentGateway(e.to_string()))?;

        self.check_response_json(response).await
    }

    /// Look up a transaction by reference.
    pub async fn verify(&self, reference: &str) -> Result<GatewayTransaction, AppError> {
        let url = format!("{}/transaction/verify/{}", self.base_url, reference);

        let response = self
            .http
            .get(&url)
            .bearer_auth(&self.secret_key)
            .send()
            .await
            .map_err(|e| AppError::PaymentGateway(e.to_string()))?;

        self.check_response_json(response).await
    }

    /// Check the webhook signature against the raw request body.
    pub fn verify_webhook_signature(&self, body: &[u8], signature_hex: &str) -> bool {
        verify_signature(self.secret_key.as_bytes(), body, signature_hex)
    }

    async fn check_response_json<T: serde::de::DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, AppError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::PaymentGateway(format!(
                "HTTP {}: {}",
                status.as_u16(),
                body
            )));
        }

        let envelope: GatewayResponse<T> = response
            .json()
            .await
            .map_err(|e| AppError::PaymentGateway(format!("Invalid response body: {}", e)))?;

        if !envelope.status {
            return Err(AppError::PaymentGateway(envelope.message));
        }

        envelope
            .data
            .ok_or_else(|| AppError::PaymentGateway("Response missing data".to_string()))
    }
}

/// Constant-time HMAC-SHA512 check of `body` against a hex signature.
pub fn verify_signature(secret: &[u8], body: &[u8], signature_hex: &str) -> bool {
    let Ok(expected) = hex::decode(signature_hex.trim()) else {
        return false;
    };
    let Ok(mut mac) = HmacSha512::new_from_slice(secret) else {
        return false;
    };
    mac.update(body);
    mac.verify_slice(&expected).is_ok()
}

/// Hex HMAC-SHA512 signature of `body` (used by tests and local tooling).
pub fn sign_payload(secret: &[u8], body: &[u8]) -> Option<String> {
    let mut mac = HmacSha512::new_from_slice(secret).ok()?;
    mac.update(body);
    Some(hex::encode(mac.finalize().into_bytes()))
}
