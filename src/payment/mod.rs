pub mod sender;

pub use sender::{ChannelSelector, PaymentSender};
