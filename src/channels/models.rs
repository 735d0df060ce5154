use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ChannelState {
    #[default]
    Active,
    Inactive,
}

/// Snapshot of an open channel as reported by the local node.
///
/// Snapshots are read-only: nothing downstream of the node provider
/// mutates them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Channel {
    pub id: u64,
    pub node: String,
    /// Funding outpoint, `txid:output_index`
    pub channel_point: String,
    #[serde(default)]
    pub status: ChannelState,
    #[serde(default)]
    pub capacity: Decimal,
    pub local_balance: Decimal,
    #[serde(default)]
    pub remote_balance: Decimal,
    /// Reserve the node must keep on its side of the channel
    #[serde(default)]
    pub local_reserved: Decimal,
}

impl Channel {
    pub fn new(id: u64, channel_point: impl Into<String>, node: impl Into<String>, local_balance: Decimal) -> Self {
        Self {
            id,
            node: node.into(),
            channel_point: channel_point.into(),
            status: ChannelState::Active,
            capacity: local_balance,
            local_balance,
            remote_balance: Decimal::ZERO,
            local_reserved: Decimal::ZERO,
        }
    }

    /// Whether this channel is one of the given selectors.
    /// A zero id or empty point never matches.
    pub fn matches(&self, channel_id: Option<u64>, channel_point: Option<&str>) -> bool {
        let by_id = channel_id.map_or(false, |id| id != 0 && self.id == id);
        let by_point = channel_point.map_or(false, |p| !p.is_empty() && self.channel_point == p);
        by_id || by_point
    }
}

/// A single channel's share of a payment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChannelPayment {
    pub id: u64,
    pub channel_point: String,
    pub node: String,
    pub amount: Decimal,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub error: Option<String>,
}

impl ChannelPayment {
    pub fn for_channel(channel: &Channel, amount: Decimal) -> Self {
        Self {
            id: channel.id,
            channel_point: channel.channel_point.clone(),
            node: channel.node.clone(),
            amount,
            error: None,
        }
    }
}

/// Outcome of a multi-channel send. A failed entry carries its error and
/// never affects the others.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentResult {
    pub successful: Vec<ChannelPayment>,
    pub errors: Vec<ChannelPayment>,
    pub sent_at: chrono::DateTime<chrono::Utc>,
}

impl PaymentResult {
    pub fn total_sent(&self) -> Decimal {
        self.successful.iter().map(|p| p.amount).sum()
    }
}

/// Diagnostic body returned when a payment cannot be split across channels.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FundingFailure {
    pub error_message: String,
    pub min_payment_amount: String,
    pub funding_channels: Vec<Channel>,
}

/// A past outgoing payment as recorded by the node
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PaymentRecord {
    /// First hop of the route
    pub node: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub amount: Decimal,
}

impl PaymentRecord {
    /// Newest first, then `limit` records starting at `offset`.
    /// An offset past the end gives an empty page.
    pub fn page(mut records: Vec<PaymentRecord>, offset: usize, limit: usize) -> Vec<PaymentRecord> {
        records.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        records.into_iter().skip(offset).take(limit).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_channel_matches_selectors() {
        let channel = Channel::new(7, "abcd:1", "02ff", dec!(0.01));

        assert!(channel.matches(Some(7), None));
        assert!(channel.matches(None, Some("abcd:1")));
        assert!(channel.matches(Some(3), Some("abcd:1")));
        assert!(!channel.matches(Some(0), Some("")));
        assert!(!channel.matches(None, None));
    }

    #[test]
    fn test_payment_error_is_omitted_when_absent() {
        let channel = Channel::new(1, "aa:0", "02aa", dec!(0.5));
        let payment = ChannelPayment::for_channel(&channel, dec!(0.1));

        let json = serde_json::to_value(&payment).unwrap();
        assert!(json.get("error").is_none());
        assert_eq!(json["channel_point"], "aa:0");
        assert_eq!(json["amount"], "0.1");
    }

    #[test]
    fn test_total_sent_counts_only_successes() {
        let channel = Channel::new(1, "aa:0", "02aa", dec!(0.5));
        let mut failed = ChannelPayment::for_channel(&channel, dec!(0.2));
        failed.error = Some("no route".to_string());

        let result = PaymentResult {
            successful: vec![
                ChannelPayment::for_channel(&channel, dec!(0.1)),
                ChannelPayment::for_channel(&channel, dec!(0.05)),
            ],
            errors: vec![failed],
            sent_at: chrono::Utc::now(),
        };

        assert_eq!(result.total_sent(), dec!(0.15));
    }

    fn record(node: &str, secs: i64) -> PaymentRecord {
        use chrono::TimeZone;
        PaymentRecord {
            node: node.to_string(),
            timestamp: chrono::Utc.timestamp_opt(secs, 0).unwrap(),
            amount: dec!(0.0001),
        }
    }

    #[test]
    fn test_payment_page_is_newest_first() {
        let records = vec![record("a", 100), record("b", 300), record("c", 200)];

        let page = PaymentRecord::page(records.clone(), 0, 2);
        let nodes: Vec<&str> = page.iter().map(|r| r.node.as_str()).collect();
        assert_eq!(nodes, vec!["b", "c"]);

        // Limit running past the end is clamped
        let page = PaymentRecord::page(records.clone(), 1, 10);
        let nodes: Vec<&str> = page.iter().map(|r| r.node.as_str()).collect();
        assert_eq!(nodes, vec!["c", "a"]);

        assert!(PaymentRecord::page(records.clone(), 3, 10).is_empty());
        assert!(PaymentRecord::page(records, 0, 0).is_empty());
    }
}
