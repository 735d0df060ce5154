use std::time::Duration;

use async_trait::async_trait;
use chrono::TimeZone;
use reqwest::Client;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::adapters::traits::NodeChannelProvider;
use crate::channels::models::{Channel, ChannelState, PaymentRecord};
use crate::error::{AppError, AppResult, ProviderError};

const MACAROON_HEADER: &str = "Grpc-Metadata-macaroon";

/// Amounts on the node are integer satoshis
pub fn satoshi_to_btc(sat: i64) -> Decimal {
    Decimal::new(sat, 8)
}

/// Whole satoshis only. Sub-satoshi digits are an error, never truncated.
pub fn btc_to_satoshi(btc: Decimal) -> AppResult<i64> {
    let sat = btc
        .checked_mul(Decimal::new(100_000_000, 0))
        .ok_or_else(|| AppError::InvalidInput(format!("Amount {} out of satoshi range", btc)))?;
    if !sat.fract().is_zero() {
        return Err(AppError::InvalidInput(format!(
            "Amount {} is finer than one satoshi",
            btc
        )));
    }
    sat.to_i64()
        .ok_or_else(|| AppError::InvalidInput(format!("Amount {} out of satoshi range", btc)))
}

/// Channel as returned by `GET /v1/channels`. int64 fields are JSON strings.
#[derive(Debug, Deserialize)]
struct LndChannel {
    #[serde(default)]
    active: bool,
    remote_pubkey: String,
    channel_point: String,
    chan_id: String,
    #[serde(default)]
    capacity: Option<String>,
    #[serde(default)]
    local_balance: Option<String>,
    #[serde(default)]
    remote_balance: Option<String>,
    #[serde(default)]
    local_chan_reserve_sat: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ListChannelsResponse {
    #[serde(default)]
    channels: Vec<LndChannel>,
}

#[derive(Debug, Serialize)]
struct SendRequest<'a> {
    payment_request: &'a str,
    amt: String,
    outgoing_chan_id: String,
}

#[derive(Debug, Deserialize)]
struct SendResponse {
    #[serde(default)]
    payment_error: String,
}

/// Payment as returned by `GET /v1/payments`
#[derive(Debug, Deserialize)]
struct LndPayment {
    #[serde(default)]
    value_sat: Option<String>,
    #[serde(default)]
    creation_date: Option<String>,
    #[serde(default)]
    path: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ListPaymentsResponse {
    #[serde(default)]
    payments: Vec<LndPayment>,
}

impl TryFrom<LndPayment> for PaymentRecord {
    type Error = AppError;

    fn try_from(p: LndPayment) -> AppResult<Self> {
        let raw = p.creation_date.as_deref().unwrap_or("0");
        let timestamp = raw
            .parse::<i64>()
            .ok()
            .and_then(|secs| chrono::Utc.timestamp_opt(secs, 0).single())
            .ok_or_else(|| ProviderError::Node(format!("Invalid creation_date value {:?}", raw)))?;

        Ok(PaymentRecord {
            node: p.path.into_iter().next().unwrap_or_default(),
            timestamp,
            amount: parse_sat("value_sat", p.value_sat.as_deref())?,
        })
    }
}

fn parse_sat(field: &str, value: Option<&str>) -> AppResult<Decimal> {
    let raw = value.unwrap_or("0");
    let sat = raw
        .parse::<i64>()
        .map_err(|e| ProviderError::Node(format!("Invalid {} value {:?}: {}", field, raw, e)))?;
    Ok(satoshi_to_btc(sat))
}

impl TryFrom<LndChannel> for Channel {
    type Error = AppError;

    fn try_from(c: LndChannel) -> AppResult<Self> {
        let id = c
            .chan_id
            .parse::<u64>()
            .map_err(|e| ProviderError::Node(format!("Invalid chan_id {:?}: {}", c.chan_id, e)))?;

        Ok(Channel {
            id,
            node: c.remote_pubkey,
            channel_point: c.channel_point,
            status: if c.active { ChannelState::Active } else { ChannelState::Inactive },
            capacity: parse_sat("capacity", c.capacity.as_deref())?,
            local_balance: parse_sat("local_balance", c.local_balance.as_deref())?,
            remote_balance: parse_sat("remote_balance", c.remote_balance.as_deref())?,
            local_reserved: parse_sat("local_chan_reserve_sat", c.local_chan_reserve_sat.as_deref())?,
        })
    }
}

/// Local node reached over its REST gateway
pub struct LndRestClient {
    client: Client,
    base_url: String,
    macaroon_hex: Option<String>,
}

impl LndRestClient {
    pub fn new(base_url: &str, macaroon_hex: Option<String>, timeout: Duration) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Config(format!("Unable to build node HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            macaroon_hex,
        })
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let builder = self.client.request(method, format!("{}{}", self.base_url, path));
        match &self.macaroon_hex {
            Some(macaroon) => builder.header(MACAROON_HEADER, macaroon),
            None => builder,
        }
    }

    async fn read_ok(response: reqwest::Response) -> AppResult<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(ProviderError::Rejected { status: status.as_u16(), body }.into())
    }
}

#[async_trait]
impl NodeChannelProvider for LndRestClient {
    #[instrument(skip(self))]
    async fn list_active_channels(&self) -> AppResult<Vec<Channel>> {
        let response = self
            .request(reqwest::Method::GET, "/v1/channels?active_only=true")
            .send()
            .await?;
        let body: ListChannelsResponse = Self::read_ok(response).await?.json().await?;

        let channels = body
            .channels
            .into_iter()
            .map(Channel::try_from)
            .collect::<AppResult<Vec<_>>>()?;

        debug!("Node reported {} active channels", channels.len());
        Ok(channels)
    }

    #[instrument(skip(self, payment_request))]
    async fn pay(&self, payment_request: &str, amount: Decimal, channel_id: u64) -> AppResult<()> {
        let request = SendRequest {
            payment_request,
            amt: btc_to_satoshi(amount)?.to_string(),
            outgoing_chan_id: channel_id.to_string(),
        };

        let response = self
            .request(reqwest::Method::POST, "/v1/channels/transactions")
            .json(&request)
            .send()
            .await?;
        let body: SendResponse = Self::read_ok(response).await?.json().await?;

        if !body.payment_error.is_empty() {
            return Err(ProviderError::PaymentFailed {
                channel_id,
                reason: body.payment_error,
            }
            .into());
        }

        info!("✓ Paid {} through channel {}", amount, channel_id);
        Ok(())
    }

    #[instrument(skip(self))]
    async fn list_payments(&self, offset: usize, limit: usize) -> AppResult<Vec<PaymentRecord>> {
        let response = self.request(reqwest::Method::GET, "/v1/payments").send().await?;
        let body: ListPaymentsResponse = Self::read_ok(response).await?.json().await?;

        let records = body
            .payments
            .into_iter()
            .map(PaymentRecord::try_from)
            .collect::<AppResult<Vec<_>>>()?;

        debug!("Node reported {} payments", records.len());
        Ok(PaymentRecord::page(records, offset, limit))
    }
}
