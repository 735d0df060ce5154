use async_trait::async_trait;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::channels::models::{Channel, PaymentRecord};
use crate::error::{AppResult, ProviderError};

/// Invoice issued by the settlement API for one of our channels
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Invoice {
    pub node_id: String,
    pub payment_request: String,
    pub chan_point: String,
}

/// Global limits reported by the settlement API
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Limits {
    #[serde(default)]
    pub min_channel_capacity: Decimal,
    pub min_payment_amount: Decimal,
    #[serde(default = "default_reserve_multiplier")]
    pub channel_reserve_multiplier: Decimal,
}

fn default_reserve_multiplier() -> Decimal {
    dec!(1)
}

/// Remote node of the settlement service, parsed from `pubkey@host:port`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RemoteNode {
    pub pub_key: String,
    pub address: String,
}

impl RemoteNode {
    pub fn parse(address: &str) -> AppResult<Self> {
        match address.split_once('@') {
            Some((pub_key, host)) if !pub_key.is_empty() && !host.is_empty() && !host.contains('@') => Ok(Self {
                pub_key: pub_key.to_string(),
                address: address.to_string(),
            }),
            _ => Err(ProviderError::Settlement(format!(
                "Received node address {:?} is in invalid format",
                address
            ))
            .into()),
        }
    }
}

/// The local node: source of channel snapshots and executor of payments.
#[async_trait]
pub trait NodeChannelProvider: Send + Sync {
    /// Active channels right now
    async fn list_active_channels(&self) -> AppResult<Vec<Channel>>;

    /// Pay `payment_request` for `amount`, forcing the first hop over `channel_id`
    async fn pay(&self, payment_request: &str, amount: Decimal, channel_id: u64) -> AppResult<()>;

    /// Outgoing payment history, newest first
    async fn list_payments(&self, offset: usize, limit: usize) -> AppResult<Vec<PaymentRecord>>;
}

/// The counterparty service that is paid through the channels.
#[async_trait]
pub trait SettlementApi: Send + Sync {
    /// One invoice per requested channel point
    async fn issue_invoices(&self, account_id: i64, channel_points: &[String]) -> AppResult<Vec<Invoice>>;

    async fn limits(&self) -> AppResult<Limits>;

    /// `pubkey@host:port` addresses of the remote nodes
    async fn remote_addresses(&self) -> AppResult<Vec<String>>;
}
