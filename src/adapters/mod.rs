pub mod traits;
pub mod lnd;
pub mod settlement;
#[cfg(test)]
pub mod mock;

pub use lnd::LndRestClient;
pub use settlement::SettlementRestClient;
pub use traits::{NodeChannelProvider, SettlementApi};
