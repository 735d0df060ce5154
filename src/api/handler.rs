use std::sync::Arc;

use axum::{
    extract::{Query, State},
    Json,
};
use tracing::info;
use validator::Validate;

use super::models::*;
use crate::{
    adapters::traits::RemoteNode,
    channels::models::{Channel, ChannelPayment, PaymentRecord, PaymentResult},
    error::{AppError, AppResult},
    payment::{ChannelSelector, PaymentSender},
};

#[derive(Clone)]
pub struct AppState {
    pub sender: Arc<PaymentSender>,
}

fn validate<T: Validate>(request: &T) -> AppResult<()> {
    request
        .validate()
        .map_err(|e| AppError::InvalidInput(format!("Validation failed: {}", e)))
}

/// GET /health
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        timestamp: chrono::Utc::now(),
    })
}

/// Active channel snapshot
/// GET /channels
pub async fn list_channels(State(state): State<AppState>) -> AppResult<Json<Vec<Channel>>> {
    let channels = state.sender.active_channels().await?;
    Ok(Json(channels))
}

/// Settlement nodes available to open channels with
/// GET /nodes
pub async fn list_nodes(State(state): State<AppState>) -> AppResult<Json<Vec<RemoteNode>>> {
    let nodes = state.sender.remote_nodes().await?;
    Ok(Json(nodes))
}

/// GET /payments?offset&limit
pub async fn list_payments(
    State(state): State<AppState>,
    Query(query): Query<PaymentListQuery>,
) -> AppResult<Json<Vec<PaymentRecord>>> {
    validate(&query)?;
    let payments = state.sender.payments(query.offset, query.limit).await?;
    Ok(Json(payments))
}

/// Split an amount without paying
/// POST /payments/plan
pub async fn plan_payment(
    State(state): State<AppState>,
    Json(request): Json<PlanRequest>,
) -> AppResult<Json<PlanResponse>> {
    let payments = state.sender.plan(request.amount).await?;
    Ok(Json(PlanResponse {
        amount: request.amount,
        payments,
    }))
}

/// POST /payments
pub async fn send_payment(
    State(state): State<AppState>,
    Json(request): Json<SendPaymentRequest>,
) -> AppResult<Json<PaymentResult>> {
    validate(&request)?;
    info!("Sending payment of {} to account {}", request.amount, request.account);

    let result = state.sender.send(request.account, request.amount).await?;
    Ok(Json(result))
}

/// POST /payments/channel
pub async fn send_channel_payment(
    State(state): State<AppState>,
    Json(request): Json<ChannelPaymentRequest>,
) -> AppResult<Json<ChannelPayment>> {
    validate(&request)?;

    let selector = ChannelSelector {
        channel_id: request.channel_id,
        channel_point: request.channel_point,
    };
    let payment = state
        .sender
        .send_via_channel(request.account, request.amount, &selector)
        .await?;
    Ok(Json(payment))
}
