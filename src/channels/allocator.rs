use rust_decimal::{Decimal, RoundingStrategy};
use tracing::{debug, warn};

use crate::channels::models::{Channel, ChannelPayment};
use crate::error::AllocationError;

/// Satoshi precision of BTC amounts
pub const SATOSHI_PRECISION: u32 = 8;

/// Splits a payment between open channels with exact per-channel amounts.
///
/// 1. Channels with `local_balance < min_payment_amount` are not funded.
/// 2. The rest are funded smallest-first with shares proportional to
///    `local_balance / total_local`, rounded to `round_precision`. A share
///    below the floor is raised to the floor.
/// 3. Once less than twice the floor is left, the remainder goes to the first
///    remaining channel able to carry all of it.
/// 4. The channel with the highest balance takes whatever is left.
#[derive(Debug, Clone)]
pub struct ChannelPaymentAllocator {
    min_payment_amount: Decimal,
    double_min_payment_amount: Decimal,
    round_precision: u32,
}

/// Where the distribution loop is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Proportional,
    TerminalSearch,
    Completed,
}

impl ChannelPaymentAllocator {
    pub fn new(min_payment_amount: Decimal, round_precision: u32) -> Self {
        Self {
            min_payment_amount,
            double_min_payment_amount: min_payment_amount * Decimal::TWO,
            round_precision,
        }
    }

    pub fn min_payment_amount(&self) -> Decimal {
        self.min_payment_amount
    }

    /// Build a payment plan for `amount` over `channels`.
    ///
    /// Either every unit of `amount` is placed or an error is returned;
    /// partial plans are never produced. `channels` is left untouched.
    pub fn allocate(&self, amount: Decimal, channels: &[Channel]) -> Result<Vec<ChannelPayment>, AllocationError> {
        if amount <= Decimal::ZERO {
            return Err(AllocationError::NonPositiveAmount(amount));
        }

        // Filter channels and calc total local balance
        let mut funding: Vec<&Channel> = channels
            .iter()
            .filter(|c| c.local_balance >= self.min_payment_amount)
            .collect();
        let total_local: Decimal = funding.iter().map(|c| c.local_balance).sum();

        if amount > total_local {
            warn!(
                "Open channels total local balance {} is less than amount to pay {}",
                total_local, amount
            );
            return Err(AllocationError::InsufficientBalance { total_local, amount });
        }

        // Highest balance last, so it absorbs the rounding remainder
        funding.sort_by(|a, b| a.local_balance.cmp(&b.local_balance));

        let mut plan = Vec::with_capacity(funding.len());
        let mut amount_left = amount;
        let mut mode = Mode::Proportional;
        let last = funding.len().saturating_sub(1);

        for (i, channel) in funding.iter().enumerate() {
            if amount_left.is_zero() {
                mode = Mode::Completed;
            } else if amount_left < self.double_min_payment_amount {
                mode = Mode::TerminalSearch;
            }

            match mode {
                Mode::Completed => break,
                Mode::TerminalSearch => {
                    let terminal = funding[i..]
                        .iter()
                        .find(|c| c.local_balance >= amount_left)
                        .ok_or(AllocationError::NoTerminalChannelFound { amount_left })?;
                    plan.push(ChannelPayment::for_channel(terminal, amount_left));
                    mode = Mode::Completed;
                    break;
                }
                Mode::Proportional if i < last => {
                    let share = self.proportional_share(amount, channel, total_local)?.min(amount_left);
                    if share > channel.local_balance {
                        return Err(AllocationError::ChannelShareExceedsBalance {
                            channel_point: channel.channel_point.clone(),
                            share,
                            local_balance: channel.local_balance,
                        });
                    }
                    if share.is_zero() {
                        continue;
                    }
                    amount_left -= share;
                    plan.push(ChannelPayment::for_channel(channel, share));
                }
                Mode::Proportional => {
                    if amount_left > channel.local_balance {
                        return Err(AllocationError::LastChannelInsufficientBalance {
                            local_balance: channel.local_balance,
                            amount_left,
                        });
                    }
                    plan.push(ChannelPayment::for_channel(channel, amount_left));
                    mode = Mode::Completed;
                }
            }
        }

        debug!(?mode, payments = plan.len(), "Allocated {} over {} channels", amount, funding.len());
        Ok(plan)
    }

    /// `amount * local_balance / total_local`, rounded and raised to the floor
    fn proportional_share(
        &self,
        amount: Decimal,
        channel: &Channel,
        total_local: Decimal,
    ) -> Result<Decimal, AllocationError> {
        let share = amount
            .checked_mul(channel.local_balance)
            .and_then(|v| v.checked_div(total_local))
            .ok_or_else(|| AllocationError::Overflow(channel.channel_point.clone()))?
            .round_dp_with_strategy(self.round_precision, RoundingStrategy::MidpointAwayFromZero);

        Ok(share.max(self.min_payment_amount))
    }
}
