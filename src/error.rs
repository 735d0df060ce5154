use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;

use crate::channels::models::FundingFailure;

/// Top-level error type for the entire application
#[derive(Error, Debug)]
pub enum AppError {
    #[error("{}", .0.error_message)]
    Funding(Box<FundingFailure>),

    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("No invoice was issued for channel {0}")]
    MissingInvoice(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Reasons a payment cannot be split across the current channel set.
///
/// All of them are deterministic for a given amount, snapshot and floor.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AllocationError {
    #[error("Amount to pay must be positive, got {0}")]
    NonPositiveAmount(Decimal),

    #[error("Open channels total local balance {total_local} is less than amount to pay {amount}")]
    InsufficientBalance { total_local: Decimal, amount: Decimal },

    #[error("Unable to find last channel to distribute rest amount {amount_left}")]
    NoTerminalChannelFound { amount_left: Decimal },

    #[error("Last channel LocalBalance {local_balance} is less than left amount {amount_left}")]
    LastChannelInsufficientBalance {
        local_balance: Decimal,
        amount_left: Decimal,
    },

    #[error("Share {share} for channel {channel_point} exceeds its local balance {local_balance}")]
    ChannelShareExceedsBalance {
        channel_point: String,
        share: Decimal,
        local_balance: Decimal,
    },

    #[error("Decimal overflow while computing share for channel {0}")]
    Overflow(String),
}

/// Failures reported by the node or the settlement API
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Node error: {0}")]
    Node(String),

    #[error("Settlement API error: {0}")]
    Settlement(String),

    #[error("Request rejected with status {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("Remote error: {0}")]
    Remote(String),

    #[error("Payment failed on channel {channel_id}: {reason}")]
    PaymentFailed { channel_id: u64, reason: String },
}

/// API error response structure
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub error_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let message = self.to_string();
        let (status, error_code, details) = match self {
            AppError::Funding(failure) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "FUNDING_FAILED",
                serde_json::to_value(*failure).ok(),
            ),
            AppError::InvalidInput(_) => (StatusCode::BAD_REQUEST, "INVALID_INPUT", None),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND", None),
            AppError::MissingInvoice(channel_point) => (
                StatusCode::BAD_GATEWAY,
                "MISSING_INVOICE",
                Some(serde_json::json!({ "channel_point": channel_point })),
            ),
            AppError::Provider(ProviderError::Rejected { status, .. }) => (
                StatusCode::BAD_GATEWAY,
                "PROVIDER_REJECTED",
                Some(serde_json::json!({ "upstream_status": status })),
            ),
            AppError::Provider(_) => (StatusCode::BAD_GATEWAY, "PROVIDER_ERROR", None),
            AppError::Config(_) | AppError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                None,
            ),
        };

        let body = Json(ErrorResponse {
            error: message,
            error_code: error_code.to_string(),
            details,
        });

        (status, body).into_response()
    }
}

impl From<reqwest::Error> for AppError {
    fn from(error: reqwest::Error) -> Self {
        AppError::Provider(ProviderError::Remote(format!("HTTP request error: {}", error)))
    }
}

impl From<config::ConfigError> for AppError {
    fn from(error: config::ConfigError) -> Self {
        AppError::Config(error.to_string())
    }
}

/// Result type alias for the application
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_allocation_messages_carry_quantities() {
        let err = AllocationError::InsufficientBalance {
            total_local: dec!(0.03),
            amount: dec!(0.03000001),
        };
        assert_eq!(
            err.to_string(),
            "Open channels total local balance 0.03 is less than amount to pay 0.03000001"
        );

        let err = AllocationError::NoTerminalChannelFound { amount_left: dec!(0.00006001) };
        assert_eq!(
            err.to_string(),
            "Unable to find last channel to distribute rest amount 0.00006001"
        );
    }

    #[test]
    fn test_status_mapping() {
        let response = AppError::InvalidInput("bad".into()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = AppError::Provider(ProviderError::Node("down".into())).into_response();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);

        let response = AppError::Funding(Box::new(FundingFailure {
            error_message: AllocationError::NonPositiveAmount(Decimal::ZERO).to_string(),
            min_payment_amount: "0.00006".to_string(),
            funding_channels: Vec::new(),
        }))
        .into_response();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }
}
