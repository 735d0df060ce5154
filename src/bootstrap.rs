use std::sync::Arc;

use tracing::{info, warn};

use crate::{
    adapters::{LndRestClient, NodeChannelProvider, SettlementApi, SettlementRestClient},
    api::handler::AppState,
    config::Config,
    error::AppResult,
    payment::PaymentSender,
};

pub fn initialize_app_state(config: &Config) -> AppResult<AppState> {
    info!("Initializing application components ...");

    if config.api_key.is_none() {
        warn!("⚠️  DACCS_API_KEY not set - settlement API calls are unauthenticated");
    }
    let settlement: Arc<dyn SettlementApi> = Arc::new(SettlementRestClient::new(
        &config.api_url,
        config.api_key.clone(),
        config.request_timeout(),
    )?);
    info!("✅ Settlement API client initialized: {}", config.api_url);

    if config.lnd_macaroon_hex.is_none() {
        warn!("⚠️  LND_MACAROON_HEX not set - node calls carry no macaroon");
    }
    let node: Arc<dyn NodeChannelProvider> = Arc::new(LndRestClient::new(
        &config.lnd_rest_url,
        config.lnd_macaroon_hex.clone(),
        config.request_timeout(),
    )?);
    info!("✅ Node client initialized: {}", config.lnd_rest_url);

    let sender = Arc::new(PaymentSender::new(node, settlement, config.round_precision));

    Ok(AppState { sender })
}
