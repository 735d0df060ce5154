// Payment sender - turns an amount into per-channel payments
//
// Send flow:
// 1. Read limits from the settlement API
// 2. Snapshot active channels from the node
// 3. Split the amount between channels
// 4. Issue one invoice per planned channel
// 5. Pay every invoice concurrently, each over its own channel
// 6. Report successful and failed channel payments separately

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::join_all;
use rust_decimal::Decimal;
use tracing::{error, info, instrument, warn};

use crate::adapters::traits::{Invoice, Limits, NodeChannelProvider, RemoteNode, SettlementApi};
use crate::channels::allocator::{ChannelPaymentAllocator, SATOSHI_PRECISION};
use crate::channels::models::{Channel, ChannelPayment, FundingFailure, PaymentRecord, PaymentResult};
use crate::error::{AppError, AppResult};

/// Channel to force a single-channel payment through
#[derive(Debug, Clone, Default)]
pub struct ChannelSelector {
    pub channel_id: Option<u64>,
    pub channel_point: Option<String>,
}

impl ChannelSelector {
    fn is_empty(&self) -> bool {
        self.channel_id.map_or(true, |id| id == 0)
            && self.channel_point.as_deref().map_or(true, str::is_empty)
    }

    fn describe(&self) -> String {
        match (&self.channel_point, self.channel_id) {
            (Some(point), _) if !point.is_empty() => point.clone(),
            (_, Some(id)) => id.to_string(),
            _ => String::new(),
        }
    }
}

pub struct PaymentSender {
    node: Arc<dyn NodeChannelProvider>,
    settlement: Arc<dyn SettlementApi>,
    round_precision: u32,
}

impl PaymentSender {
    pub fn new(
        node: Arc<dyn NodeChannelProvider>,
        settlement: Arc<dyn SettlementApi>,
        round_precision: u32,
    ) -> Self {
        // Shares finer than a satoshi cannot be paid
        if round_precision > SATOSHI_PRECISION {
            warn!(
                "Round precision {} capped at satoshi precision {}",
                round_precision, SATOSHI_PRECISION
            );
        }
        Self {
            node,
            settlement,
            round_precision: round_precision.min(SATOSHI_PRECISION),
        }
    }

    pub async fn active_channels(&self) -> AppResult<Vec<Channel>> {
        self.node.list_active_channels().await
    }

    /// Past outgoing payments, newest first
    pub async fn payments(&self, offset: usize, limit: usize) -> AppResult<Vec<PaymentRecord>> {
        self.node.list_payments(offset, limit).await
    }

    /// Settlement nodes channels may be opened with
    pub async fn remote_nodes(&self) -> AppResult<Vec<RemoteNode>> {
        let addresses = self.settlement.remote_addresses().await?;
        addresses.iter().map(|a| RemoteNode::parse(a)).collect()
    }

    /// Plan a payment without issuing invoices or paying anything
    #[instrument(skip(self))]
    pub async fn plan(&self, amount: Decimal) -> AppResult<Vec<ChannelPayment>> {
        let limits = self.checked_limits(amount).await?;
        let channels = self.node.list_active_channels().await?;
        self.allocate(amount, &channels, &limits)
    }

    /// Pay `amount` to `account_id`, split across all active channels
    #[instrument(skip(self))]
    pub async fn send(&self, account_id: i64, amount: Decimal) -> AppResult<PaymentResult> {
        validate_account(account_id)?;
        let limits = self.checked_limits(amount).await?;
        let channels = self.node.list_active_channels().await?;
        let plan = self.allocate(amount, &channels, &limits)?;

        info!("🔄 Sending {} to account {} over {} channels", amount, account_id, plan.len());

        let points: Vec<String> = plan.iter().map(|p| p.channel_point.clone()).collect();
        let invoices = self.settlement.issue_invoices(account_id, &points).await?;
        let by_point = index_invoices(invoices);

        // No payment leaves before every planned channel has its invoice
        let mut instructions = Vec::with_capacity(plan.len());
        for payment in plan {
            let invoice = by_point
                .get(&payment.channel_point)
                .ok_or_else(|| AppError::MissingInvoice(payment.channel_point.clone()))?;
            instructions.push((payment, invoice.payment_request.clone()));
        }

        let outcomes = join_all(instructions.into_iter().map(|(payment, request)| async move {
            let outcome = self.node.pay(&request, payment.amount, payment.id).await;
            (payment, outcome)
        }))
        .await;

        let mut result = PaymentResult {
            successful: Vec::new(),
            errors: Vec::new(),
            sent_at: chrono::Utc::now(),
        };
        for (mut payment, outcome) in outcomes {
            match outcome {
                Ok(()) => result.successful.push(payment),
                Err(e) => {
                    error!(
                        "Error {} on sending payment on {} over {}",
                        e, payment.amount, payment.channel_point
                    );
                    payment.error = Some(e.to_string());
                    result.errors.push(payment);
                }
            }
        }

        info!(
            "✓ Payment to account {} finished: {} successful, {} failed, {} sent",
            account_id,
            result.successful.len(),
            result.errors.len(),
            result.total_sent()
        );
        Ok(result)
    }

    /// Pay `amount` to `account_id` through one specific channel
    #[instrument(skip(self))]
    pub async fn send_via_channel(
        &self,
        account_id: i64,
        amount: Decimal,
        selector: &ChannelSelector,
    ) -> AppResult<ChannelPayment> {
        validate_account(account_id)?;
        if selector.is_empty() {
            return Err(AppError::InvalidInput(
                "Either channel-id or channel-point required".to_string(),
            ));
        }

        let channels = self.node.list_active_channels().await?;
        let channel = channels
            .into_iter()
            .find(|c| c.matches(selector.channel_id, selector.channel_point.as_deref()))
            .ok_or_else(|| AppError::NotFound(format!("Channel {} not found", selector.describe())))?;

        let addresses = self.settlement.remote_addresses().await?;
        if !is_settlement_node(&addresses, &channel.node) {
            return Err(AppError::InvalidInput(
                "Specified channel should be an open active channel with a settlement node".to_string(),
            ));
        }

        let limits = self.checked_limits(amount).await?;
        let reserved = channel.local_reserved * limits.channel_reserve_multiplier;
        let max_payment_amount = channel.local_balance - reserved;
        if amount > max_payment_amount {
            return Err(AppError::InvalidInput(format!(
                "Amount {} is greater than (local_balance {} - reserved {}) = {}",
                amount, channel.local_balance, reserved, max_payment_amount
            )));
        }

        let invoices = self
            .settlement
            .issue_invoices(account_id, std::slice::from_ref(&channel.channel_point))
            .await?;
        let invoice = invoices
            .into_iter()
            .next()
            .ok_or_else(|| AppError::MissingInvoice(channel.channel_point.clone()))?;

        self.node.pay(&invoice.payment_request, amount, channel.id).await?;

        info!("✓ Sent {} to {} over {}", amount, invoice.node_id, channel.channel_point);
        Ok(ChannelPayment::for_channel(&channel, amount))
    }

    async fn checked_limits(&self, amount: Decimal) -> AppResult<Limits> {
        if amount.normalize().scale() > SATOSHI_PRECISION {
            return Err(AppError::InvalidInput(format!("Amount {} is finer than one satoshi", amount)));
        }
        let limits = self.settlement.limits().await?;
        if amount < limits.min_payment_amount {
            return Err(AppError::InvalidInput(format!(
                "Amount should be greater or equal to min payment amount {}",
                limits.min_payment_amount
            )));
        }
        Ok(limits)
    }

    fn allocate(&self, amount: Decimal, channels: &[Channel], limits: &Limits) -> AppResult<Vec<ChannelPayment>> {
        let allocator = ChannelPaymentAllocator::new(limits.min_payment_amount, self.round_precision);
        allocator.allocate(amount, channels).map_err(|e| {
            warn!("Unable to fund payment of {}: {}", amount, e);
            AppError::Funding(Box::new(FundingFailure {
                error_message: e.to_string(),
                min_payment_amount: limits.min_payment_amount.to_string(),
                funding_channels: channels.to_vec(),
            }))
        })
    }
}

fn validate_account(account_id: i64) -> AppResult<()> {
    if account_id <= 0 {
        return Err(AppError::InvalidInput("Invalid account".to_string()));
    }
    Ok(())
}

/// `node` is the pubkey part of one of the `pubkey@host:port` addresses
fn is_settlement_node(addresses: &[String], node: &str) -> bool {
    !node.is_empty()
        && addresses
            .iter()
            .filter_map(|a| RemoteNode::parse(a).ok())
            .any(|n| n.pub_key == node)
}

fn index_invoices(invoices: Vec<Invoice>) -> HashMap<String, Invoice> {
    invoices.into_iter().map(|i| (i.chan_point.clone(), i)).collect()
}
