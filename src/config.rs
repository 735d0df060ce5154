use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;

use crate::channels::SATOSHI_PRECISION;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub bind_address: String,
    pub api_url: String,
    pub api_key: Option<String>,
    pub lnd_rest_url: String,
    pub lnd_macaroon_hex: Option<String>,
    pub round_precision: u32,
    pub request_timeout_secs: u64,
}

impl Config {
    pub fn from_env() -> Result<Self, config::ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self, config::ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let round_precision = parse_or(&lookup, "ROUND_PRECISION", SATOSHI_PRECISION)?;
        // The node only moves whole satoshis
        if round_precision > SATOSHI_PRECISION {
            return Err(config::ConfigError::Message(format!(
                "ROUND_PRECISION {} exceeds satoshi precision {}",
                round_precision, SATOSHI_PRECISION
            )));
        }

        Ok(Self {
            bind_address: lookup("BIND_ADDRESS").unwrap_or_else(|| "0.0.0.0:8080".to_string()),
            api_url: lookup("DACCS_API_URL")
                .unwrap_or_else(|| "https://api.xena.exchange/daccs/".to_string()),
            api_key: lookup("DACCS_API_KEY").filter(|k| !k.is_empty()),
            lnd_rest_url: lookup("LND_REST_URL")
                .unwrap_or_else(|| "https://127.0.0.1:8080".to_string()),
            lnd_macaroon_hex: lookup("LND_MACAROON_HEX").filter(|m| !m.is_empty()),
            round_precision,
            request_timeout_secs: parse_or(&lookup, "REQUEST_TIMEOUT_SECS", 30)?,
        })
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T, config::ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| config::ConfigError::Message(format!("{} has invalid value {:?}: {}", key, raw, e))),
        None => Ok(default),
    }
}
