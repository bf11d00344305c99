//! The wallet capability the payment flow is written against.
//!
//! Signing, broadcast, chain management and session handling all live behind
//! [`WalletProvider`]. The flow never touches keys or RPC transport directly.

use std::future::Future;

use alloy::primitives::{Address, Bytes, TxHash, U256};
use tokio::sync::broadcast;

use crate::chains::{AddChainParams, ChainId};
use crate::error::WalletError;

/// Parameters of a native-currency transfer handed to the wallet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxRequest {
    /// Chain the transfer was prepared for; wallets refuse to sign on another.
    pub chain_id: ChainId,
    pub to: Address,
    /// Value in minor units of the chain's native currency.
    pub value: U256,
    /// Raw payload bytes (the memo), absent when there is no memo.
    pub data: Option<Bytes>,
}

/// Outcome of a mined transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxReceipt {
    pub hash: TxHash,
    pub block_number: Option<u64>,
    /// `false` when the transaction was mined but reverted.
    pub success: bool,
}

/// Change notifications emitted by a wallet provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalletEvent {
    /// New account list; empty means the wallet disconnected.
    AccountsChanged(Vec<Address>),
    ChainChanged(ChainId),
}

/// A connected (or connectable) wallet.
pub trait WalletProvider: Send + Sync {
    /// Authenticate and expose an account.
    fn connect(&self) -> impl Future<Output = Result<Address, WalletError>> + Send;

    fn disconnect(&self) -> impl Future<Output = Result<(), WalletError>> + Send;

    /// Currently exposed account, `None` when disconnected.
    fn active_account(&self) -> impl Future<Output = Result<Option<Address>, WalletError>> + Send;

    fn active_chain(&self) -> impl Future<Output = Result<ChainId, WalletError>> + Send;

    /// Ask the wallet to switch networks. Fails with code 4902
    /// ([`WalletError::UnrecognizedChain`]) when the wallet does not know `chain_id`.
    fn switch_chain(
        &self,
        chain_id: ChainId,
    ) -> impl Future<Output = Result<(), WalletError>> + Send;

    /// Teach the wallet a new network definition.
    fn add_chain(
        &self,
        params: &AddChainParams,
    ) -> impl Future<Output = Result<(), WalletError>> + Send;

    /// Sign and broadcast a transfer. Returns the transaction hash once the
    /// node has accepted it.
    fn sign_and_send(
        &self,
        tx: &TxRequest,
    ) -> impl Future<Output = Result<TxHash, WalletError>> + Send;

    /// Wait until `hash` is mined.
    fn wait_for_confirmation(
        &self,
        hash: TxHash,
    ) -> impl Future<Output = Result<TxReceipt, WalletError>> + Send;

    /// Subscribe to account/chain change notifications.
    fn subscribe(&self) -> broadcast::Receiver<WalletEvent>;
}
