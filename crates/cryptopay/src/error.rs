use alloy::primitives::TxHash;
use thiserror::Error;

use crate::amount::AmountError;
use crate::chains::ChainId;

/// EIP-1193 code for a request the user declined.
pub const USER_REJECTED_CODE: i64 = 4001;

/// EIP-1193 code for a chain the wallet has not been told about.
pub const UNRECOGNIZED_CHAIN_CODE: i64 = 4902;

/// Message shown when a failure carries nothing more useful.
pub const FALLBACK_FAILURE_MESSAGE: &str = "Transaction failed.";

/// Errors reported by a wallet provider.
#[derive(Debug, Clone, Error)]
pub enum WalletError {
    #[error("no wallet provider available")]
    Unavailable,

    #[error("wallet is not connected")]
    NotConnected,

    #[error("user rejected the request")]
    UserRejected,

    #[error("unrecognized chain {0}")]
    UnrecognizedChain(ChainId),

    /// Structured JSON-RPC error returned by the wallet or node.
    #[error("wallet request failed (code {code}): {message}")]
    Rpc { code: i64, message: String },

    #[error("transaction prepared for chain {requested} but the wallet is on {active}")]
    ChainMismatch { requested: ChainId, active: ChainId },

    #[error("transaction {0} reverted")]
    Reverted(TxHash),

    #[error("timed out: {0}")]
    Timeout(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("{0}")]
    Other(String),
}

impl WalletError {
    /// Build from a raw JSON-RPC error code and message.
    pub fn from_rpc(code: i64, message: impl Into<String>) -> Self {
        match code {
            USER_REJECTED_CODE => WalletError::UserRejected,
            _ => WalletError::Rpc {
                code,
                message: message.into(),
            },
        }
    }

    /// EIP-1193 style numeric code, when the error has one.
    pub fn code(&self) -> Option<i64> {
        match self {
            WalletError::UserRejected => Some(USER_REJECTED_CODE),
            WalletError::UnrecognizedChain(_) => Some(UNRECOGNIZED_CHAIN_CODE),
            WalletError::Rpc { code, .. } => Some(*code),
            _ => None,
        }
    }

    pub fn is_unrecognized_chain(&self) -> bool {
        self.code() == Some(UNRECOGNIZED_CHAIN_CODE)
    }

    /// The provider's own nested message, if the failure carried one.
    pub fn nested_message(&self) -> Option<&str> {
        match self {
            WalletError::Rpc { message, .. } if !message.trim().is_empty() => Some(message),
            _ => None,
        }
    }

    /// Human-readable message: nested provider message, else the generic
    /// error text, else [`FALLBACK_FAILURE_MESSAGE`].
    pub fn user_message(&self) -> String {
        if let Some(nested) = self.nested_message() {
            return nested.to_string();
        }
        let generic = self.to_string();
        if generic.trim().is_empty() {
            FALLBACK_FAILURE_MESSAGE.to_string()
        } else {
            generic
        }
    }
}

/// Errors returned by payment-flow operations.
#[derive(Debug, Error)]
pub enum PayError {
    /// A required field is missing or malformed. No network call was made.
    #[error("{0}")]
    Validation(String),

    #[error("no wallet connected")]
    ProviderUnavailable,

    #[error("transaction was rejected in the wallet")]
    UserRejected,

    #[error("{0}")]
    BroadcastFailed(String),

    #[error("unsupported network; switch to a supported network")]
    UnsupportedChain(Option<ChainId>),

    #[error("a transaction is already in flight")]
    Busy,

    #[error("a transaction is awaiting confirmation; confirm or cancel it first")]
    Confirming,

    #[error("nothing is awaiting confirmation")]
    NotConfirming,

    #[error("wallet account or network changed since confirmation; review the payment again")]
    ScopeChanged,

    #[error("memo generation failed: {0}")]
    Memo(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<WalletError> for PayError {
    fn from(err: WalletError) -> Self {
        match err {
            WalletError::Unavailable | WalletError::NotConnected => PayError::ProviderUnavailable,
            WalletError::UserRejected => PayError::UserRejected,
            other => PayError::BroadcastFailed(other.user_message()),
        }
    }
}

impl From<AmountError> for PayError {
    fn from(err: AmountError) -> Self {
        PayError::Validation(err.to_string())
    }
}

#[cfg(feature = "full")]
impl From<rusqlite::Error> for PayError {
    fn from(err: rusqlite::Error) -> Self {
        PayError::Storage(err.to_string())
    }
}
