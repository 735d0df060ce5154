use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::channels::models::ChannelPayment;

// ========== REQUEST MODELS ==========

/// Dry-run allocation of an amount
#[derive(Debug, Deserialize)]
pub struct PlanRequest {
    pub amount: Decimal,
}

/// Send an amount to an account, split across channels
#[derive(Debug, Deserialize, Validate)]
pub struct SendPaymentRequest {
    #[validate(range(min = 1, message = "account must be positive"))]
    pub account: i64,
    pub amount: Decimal,
}

/// Send an amount to an account through one channel
#[derive(Debug, Deserialize, Validate)]
pub struct ChannelPaymentRequest {
    #[validate(range(min = 1, message = "account must be positive"))]
    pub account: i64,
    pub amount: Decimal,
    pub channel_id: Option<u64>,
    #[validate(length(min = 1, message = "channel_point must not be empty"))]
    pub channel_point: Option<String>,
}

fn default_limit() -> usize {
    10
}

/// Paging over payment history
#[derive(Debug, Deserialize, Validate)]
pub struct PaymentListQuery {
    #[serde(default)]
    pub offset: usize,
    #[serde(default = "default_limit")]
    #[validate(range(max = 1000, message = "limit must be at most 1000"))]
    pub limit: usize,
}

// ========== RESPONSE MODELS ==========

#[derive(Debug, Serialize)]
pub struct PlanResponse {
    pub amount: Decimal,
    pub payments: Vec<ChannelPayment>,
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
}
