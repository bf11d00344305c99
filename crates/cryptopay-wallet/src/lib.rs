//! Local-key wallet for cryptopay.
//!
//! [`LocalWallet`] signs with a [`PrivateKeySigner`] and talks to chains over
//! HTTP JSON-RPC. It behaves like a browser wallet toward the payment flow:
//! it only knows the chains it was given or asked to add, reports unknown
//! chains with code 4902 and announces account and chain changes as
//! [`WalletEvent`]s.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use alloy::network::{EthereumWallet, TransactionBuilder};
use alloy::primitives::{Address, TxHash};
use alloy::providers::{Provider, ProviderBuilder};
use alloy::rpc::types::TransactionRequest;
use alloy::signers::local::PrivateKeySigner;
use alloy::transports::TransportError;
use dashmap::DashMap;
use tokio::sync::broadcast;
use tokio::time::Instant;
use url::Url;

use cryptopay::chains::{AddChainParams, Chain, ChainId};
use cryptopay::{TxReceipt, TxRequest, WalletError, WalletEvent, WalletProvider};

/// Default time to wait for a receipt.
pub const DEFAULT_CONFIRMATION_TIMEOUT: Duration = Duration::from_secs(120);

/// Default receipt polling interval.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(1500);

/// Bound on the broadcast call itself, before a hash exists.
const SEND_TIMEOUT: Duration = Duration::from_secs(30);

pub struct LocalWallet {
    signer: PrivateKeySigner,
    chains: DashMap<ChainId, Url>,
    active_chain: AtomicU64,
    connected: AtomicBool,
    /// Chain each broadcast went to and when, until its receipt is resolved
    /// or the entry outlives twice the confirmation timeout.
    sent: DashMap<TxHash, (ChainId, Instant)>,
    events: broadcast::Sender<WalletEvent>,
    confirmation_timeout: Duration,
    poll_interval: Duration,
}

impl LocalWallet {
    /// Create a wallet that knows `chain`, reached through `rpc_url` or the
    /// chain's first public endpoint. The wallet starts disconnected.
    pub fn new(
        signer: PrivateKeySigner,
        chain: &Chain,
        rpc_url: Option<&str>,
    ) -> Result<Self, WalletError> {
        let raw = rpc_url
            .or_else(|| chain.rpc_urls.first().copied())
            .ok_or_else(|| WalletError::Other(format!("no RPC endpoint for {}", chain.name)))?;
        let url = parse_rpc_url(raw)?;

        let (events, _) = broadcast::channel(16);
        let chains = DashMap::new();
        chains.insert(chain.id, url);

        Ok(Self {
            signer,
            chains,
            active_chain: AtomicU64::new(chain.id.as_u64()),
            connected: AtomicBool::new(false),
            sent: DashMap::new(),
            events,
            confirmation_timeout: DEFAULT_CONFIRMATION_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
        })
    }

    pub fn with_confirmation(mut self, timeout: Duration, poll_interval: Duration) -> Self {
        self.confirmation_timeout = timeout;
        self.poll_interval = poll_interval;
        self
    }

    pub fn address(&self) -> Address {
        self.signer.address()
    }

    pub fn knows_chain(&self, chain_id: ChainId) -> bool {
        self.chains.contains_key(&chain_id)
    }

    fn current_chain(&self) -> ChainId {
        ChainId(self.active_chain.load(Ordering::SeqCst))
    }

    fn rpc_url(&self, chain_id: ChainId) -> Result<Url, WalletError> {
        self.chains
            .get(&chain_id)
            .map(|url| url.value().clone())
            .ok_or(WalletError::UnrecognizedChain(chain_id))
    }

    fn remember_sent(&self, hash: TxHash, chain_id: ChainId) {
        let retention = self.confirmation_timeout * 2;
        self.sent.retain(|_, (_, sent_at)| sent_at.elapsed() < retention);
        self.sent.insert(hash, (chain_id, Instant::now()));
    }

    fn emit(&self, event: WalletEvent) {
        // No listeners is fine.
        let _ = self.events.send(event);
    }
}

fn parse_rpc_url(raw: &str) -> Result<Url, WalletError> {
    let url = Url::parse(raw)
        .map_err(|e| WalletError::Other(format!("invalid RPC URL '{raw}': {e}")))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(WalletError::Other(format!(
            "unsupported RPC URL scheme '{other}' in '{raw}'"
        ))),
    }
}

/// JSON-RPC error payloads keep their code; anything else is a transport failure.
fn map_rpc_error(err: TransportError) -> WalletError {
    match err.as_error_resp() {
        Some(payload) => WalletError::from_rpc(payload.code, payload.message.to_string()),
        None => WalletError::Transport(err.to_string()),
    }
}

impl WalletProvider for LocalWallet {
    async fn connect(&self) -> Result<Address, WalletError> {
        let address = self.address();
        if !self.connected.swap(true, Ordering::SeqCst) {
            tracing::info!(account = %address, "wallet connected");
            self.emit(WalletEvent::AccountsChanged(vec![address]));
        }
        Ok(address)
    }

    async fn disconnect(&self) -> Result<(), WalletError> {
        if self.connected.swap(false, Ordering::SeqCst) {
            tracing::info!("wallet disconnected");
            self.emit(WalletEvent::AccountsChanged(Vec::new()));
        }
        Ok(())
    }

    async fn active_account(&self) -> Result<Option<Address>, WalletError> {
        Ok(self
            .connected
            .load(Ordering::SeqCst)
            .then(|| self.address()))
    }

    async fn active_chain(&self) -> Result<ChainId, WalletError> {
        Ok(self.current_chain())
    }

    async fn switch_chain(&self, chain_id: ChainId) -> Result<(), WalletError> {
        if !self.knows_chain(chain_id) {
            return Err(WalletError::UnrecognizedChain(chain_id));
        }
        let previous = self.active_chain.swap(chain_id.as_u64(), Ordering::SeqCst);
        if previous != chain_id.as_u64() {
            self.emit(WalletEvent::ChainChanged(chain_id));
        }
        Ok(())
    }

    async fn add_chain(&self, params: &AddChainParams) -> Result<(), WalletError> {
        let raw = params
            .rpc_urls
            .first()
            .ok_or_else(|| WalletError::Other("chain definition has no RPC URL".to_string()))?;
        let url = parse_rpc_url(raw)?;

        let provider = ProviderBuilder::new().connect_http(url.clone());
        let reported = provider.get_chain_id().await.map_err(map_rpc_error)?;
        if reported != params.chain_id.as_u64() {
            return Err(WalletError::Other(format!(
                "RPC endpoint reports chain {} but {} was requested",
                ChainId(reported),
                params.chain_id
            )));
        }

        tracing::info!(
            chain = %params.chain_id,
            name = %params.chain_name,
            rpc = %url,
            "chain added"
        );
        self.chains.insert(params.chain_id, url);
        Ok(())
    }

    async fn sign_and_send(&self, tx: &TxRequest) -> Result<TxHash, WalletError> {
        if !self.connected.load(Ordering::SeqCst) {
            return Err(WalletError::NotConnected);
        }
        let chain_id = self.current_chain();
        if tx.chain_id != chain_id {
            return Err(WalletError::ChainMismatch {
                requested: tx.chain_id,
                active: chain_id,
            });
        }
        let url = self.rpc_url(chain_id)?;

        let provider = ProviderBuilder::new()
            .wallet(EthereumWallet::from(self.signer.clone()))
            .connect_http(url);

        let mut request = TransactionRequest::default()
            .with_from(self.address())
            .with_to(tx.to)
            .with_value(tx.value);
        if let Some(data) = &tx.data {
            request = request.with_input(data.clone());
        }

        let pending = tokio::time::timeout(SEND_TIMEOUT, provider.send_transaction(request))
            .await
            .map_err(|_| {
                WalletError::Timeout(format!(
                    "broadcast timed out after {}s",
                    SEND_TIMEOUT.as_secs()
                ))
            })?
            .map_err(map_rpc_error)?;

        let hash = *pending.tx_hash();
        self.remember_sent(hash, chain_id);
        tracing::debug!(hash = %hash, chain = %chain_id, "broadcast accepted");
        Ok(hash)
    }

    async fn wait_for_confirmation(&self, hash: TxHash) -> Result<TxReceipt, WalletError> {
        let chain_id = self
            .sent
            .remove(&hash)
            .map(|(_, (chain_id, _))| chain_id)
            .unwrap_or_else(|| self.current_chain());
        let provider = ProviderBuilder::new().connect_http(self.rpc_url(chain_id)?);
        let poll_interval = self.poll_interval;

        let receipt = tokio::time::timeout(self.confirmation_timeout, async {
            loop {
                match provider.get_transaction_receipt(hash).await {
                    Ok(Some(receipt)) => return Ok(receipt),
                    Ok(None) => {}
                    Err(e) if e.as_error_resp().is_some() => return Err(map_rpc_error(e)),
                    Err(e) => {
                        tracing::debug!(hash = %hash, error = %e, "receipt poll failed, retrying")
                    }
                }
                tokio::time::sleep(poll_interval).await;
            }
        })
        .await
        .map_err(|_| {
            WalletError::Timeout(format!(
                "no receipt for {hash} after {}s",
                self.confirmation_timeout.as_secs()
            ))
        })??;

        Ok(TxReceipt {
            hash,
            block_number: receipt.block_number,
            success: receipt.status(),
        })
    }

    fn subscribe(&self) -> broadcast::Receiver<WalletEvent> {
        self.events.subscribe()
    }
}
