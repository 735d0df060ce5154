// In-memory collaborators for tests

use std::collections::HashSet;
use std::sync::Mutex;

use async_trait::async_trait;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::adapters::traits::{Invoice, Limits, NodeChannelProvider, SettlementApi};
use crate::channels::models::{Channel, PaymentRecord};
use crate::error::{AppResult, ProviderError};

pub struct MockNode {
    pub channels: Vec<Channel>,
    /// Channel ids whose payments fail
    pub failing: HashSet<u64>,
    pub paid: Mutex<Vec<(String, Decimal, u64)>>,
    pub history: Vec<PaymentRecord>,
}

impl MockNode {
    pub fn new(channels: Vec<Channel>) -> Self {
        Self {
            channels,
            failing: HashSet::new(),
            paid: Mutex::new(Vec::new()),
            history: Vec::new(),
        }
    }

    pub fn with_history(mut self, history: Vec<PaymentRecord>) -> Self {
        self.history = history;
        self
    }

    pub fn failing_on(mut self, channel_id: u64) -> Self {
        self.failing.insert(channel_id);
        self
    }

    pub fn paid(&self) -> Vec<(String, Decimal, u64)> {
        self.paid.lock().unwrap().clone()
    }
}

#[async_trait]
impl NodeChannelProvider for MockNode {
    async fn list_active_channels(&self) -> AppResult<Vec<Channel>> {
        Ok(self.channels.clone())
    }

    async fn pay(&self, payment_request: &str, amount: Decimal, channel_id: u64) -> AppResult<()> {
        if self.failing.contains(&channel_id) {
            return Err(ProviderError::PaymentFailed {
                channel_id,
                reason: "no route".to_string(),
            }
            .into());
        }
        self.paid
            .lock()
            .unwrap()
            .push((payment_request.to_string(), amount, channel_id));
        Ok(())
    }

    async fn list_payments(&self, offset: usize, limit: usize) -> AppResult<Vec<PaymentRecord>> {
        Ok(PaymentRecord::page(self.history.clone(), offset, limit))
    }
}

pub struct MockSettlement {
    pub limits: Limits,
    pub addresses: Vec<String>,
    /// Channel point the API "forgets" to invoice
    pub skip_point: Option<String>,
    pub requested: Mutex<Vec<(i64, Vec<String>)>>,
}

impl MockSettlement {
    pub fn new(min_payment_amount: Decimal) -> Self {
        Self {
            limits: Limits {
                min_channel_capacity: dec!(0.001),
                min_payment_amount,
                channel_reserve_multiplier: dec!(1),
            },
            addresses: Vec::new(),
            skip_point: None,
            requested: Mutex::new(Vec::new()),
        }
    }

    pub fn with_address(mut self, address: &str) -> Self {
        self.addresses.push(address.to_string());
        self
    }

    pub fn requested(&self) -> Vec<(i64, Vec<String>)> {
        self.requested.lock().unwrap().clone()
    }
}

#[async_trait]
impl SettlementApi for MockSettlement {
    async fn issue_invoices(&self, account_id: i64, channel_points: &[String]) -> AppResult<Vec<Invoice>> {
        self.requested
            .lock()
            .unwrap()
            .push((account_id, channel_points.to_vec()));

        Ok(channel_points
            .iter()
            .filter(|p| self.skip_point.as_deref() != Some(p.as_str()))
            .map(|p| Invoice {
                node_id: "02remote".to_string(),
                payment_request: format!("lnbc-{}", p),
                chan_point: p.clone(),
            })
            .collect())
    }

    async fn limits(&self) -> AppResult<Limits> {
        Ok(self.limits.clone())
    }

    async fn remote_addresses(&self) -> AppResult<Vec<String>> {
        Ok(self.addresses.clone())
    }
}
