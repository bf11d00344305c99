//! Configuration from environment variables.

use std::time::Duration;

use crate::chains::{resolve_chain, ChainId, SEPOLIA_CHAIN_ID};
use crate::error::PayError;
use crate::memo::DEFAULT_GEMINI_MODEL;

/// Runtime configuration for the payment client.
#[derive(Debug, Clone)]
pub struct PayConfig {
    /// Hex private key of the local wallet (env: EVM_PRIVATE_KEY).
    pub private_key: Option<String>,
    /// Chain the wallet starts on, by id or name (env: CRYPTOPAY_CHAIN, default: Sepolia).
    pub chain_id: ChainId,
    /// RPC endpoint override for the starting chain (env: RPC_URL).
    pub rpc_url: Option<String>,
    /// SQLite file for transaction history (default: ./cryptopay.db).
    pub db_path: String,
    /// Gemini API key (env: GEMINI_API_KEY). Memo generation is unavailable without it.
    pub gemini_api_key: Option<String>,
    /// Gemini model (default: gemini-2.5-flash).
    pub gemini_model: String,
    /// How long success/failure notices stay up (default: 5s).
    pub notice_timeout: Duration,
    /// Give up waiting for a receipt after this long (default: 120s).
    pub confirmation_timeout: Duration,
    /// Receipt polling interval (default: 1500ms).
    pub poll_interval: Duration,
}

impl PayConfig {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, PayError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, PayError> {
        let var = |name: &str| lookup(name).filter(|s| !s.is_empty());

        let chain_id = match var("CRYPTOPAY_CHAIN") {
            Some(raw) => match resolve_chain(&raw) {
                Some(chain) => chain.id,
                None => raw.parse::<ChainId>().map_err(PayError::Config)?,
            },
            None => SEPOLIA_CHAIN_ID,
        };

        let secs = |name: &str, default: u64| -> Result<Duration, PayError> {
            match var(name) {
                Some(raw) => raw
                    .parse()
                    .map(Duration::from_secs)
                    .map_err(|e| PayError::Config(format!("invalid {name} '{raw}': {e}"))),
                None => Ok(Duration::from_secs(default)),
            }
        };

        let poll_interval = match var("CRYPTOPAY_POLL_MS") {
            Some(raw) => raw
                .parse()
                .map(Duration::from_millis)
                .map_err(|e| PayError::Config(format!("invalid CRYPTOPAY_POLL_MS '{raw}': {e}")))?,
            None => Duration::from_millis(1500),
        };

        Ok(Self {
            private_key: var("EVM_PRIVATE_KEY"),
            chain_id,
            rpc_url: var("RPC_URL"),
            db_path: var("CRYPTOPAY_DB_PATH").unwrap_or_else(|| "./cryptopay.db".to_string()),
            gemini_api_key: var("GEMINI_API_KEY"),
            gemini_model: var("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string()),
            notice_timeout: secs("CRYPTOPAY_NOTICE_SECS", 5)?,
            confirmation_timeout: secs("CRYPTOPAY_CONFIRM_TIMEOUT_SECS", 120)?,
            poll_interval,
        })
    }
}
