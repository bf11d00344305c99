#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU8, AtomicUsize, Ordering};
use std::sync::Mutex;

use alloy::primitives::{Address, TxHash};
use tokio::sync::{broadcast, watch};

use cryptopay::chains::AddChainParams;
use cryptopay::{
    ChainId, TxReceipt, TxRequest, TxStatus, WalletError, WalletEvent, WalletProvider,
};

pub const RECIPIENT: &str = "0xabcdef0123456789abcdef0123456789abcdef01";

/// Scripted wallet: records every request, answers from queued results.
pub struct MockWallet {
    account: Mutex<Option<Address>>,
    chain: Mutex<ChainId>,
    known_chains: Mutex<Vec<ChainId>>,
    send_results: Mutex<VecDeque<Result<TxHash, WalletError>>>,
    confirm_results: Mutex<VecDeque<Result<bool, WalletError>>>,
    next_hash: AtomicU8,
    sign_calls: AtomicUsize,
    requests: Mutex<Vec<TxRequest>>,
    added_chains: Mutex<Vec<AddChainParams>>,
    status_watch: Mutex<Option<watch::Receiver<TxStatus>>>,
    observed: Mutex<Vec<TxStatus>>,
    events: broadcast::Sender<WalletEvent>,
}

impl MockWallet {
    pub fn new(account: Address, chain: ChainId) -> Self {
        let (events, _) = broadcast::channel(16);
        Self {
            account: Mutex::new(Some(account)),
            chain: Mutex::new(chain),
            known_chains: Mutex::new(vec![chain]),
            send_results: Mutex::new(VecDeque::new()),
            confirm_results: Mutex::new(VecDeque::new()),
            next_hash: AtomicU8::new(1),
            sign_calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
            added_chains: Mutex::new(Vec::new()),
            status_watch: Mutex::new(None),
            observed: Mutex::new(Vec::new()),
            events,
        }
    }

    pub fn account() -> Address {
        Address::repeat_byte(0x11)
    }

    /// Queue the outcome of the next `sign_and_send`.
    pub fn script_send(&self, result: Result<TxHash, WalletError>) {
        self.send_results.lock().unwrap().push_back(result);
    }

    /// Queue the outcome of the next `wait_for_confirmation`; `Ok(false)` is a revert.
    pub fn script_confirmation(&self, result: Result<bool, WalletError>) {
        self.confirm_results.lock().unwrap().push_back(result);
    }

    pub fn know_chain(&self, chain: ChainId) {
        self.known_chains.lock().unwrap().push(chain);
    }

    /// Record the executor status each time confirmation is awaited.
    pub fn watch_status(&self, status: watch::Receiver<TxStatus>) {
        *self.status_watch.lock().unwrap() = Some(status);
    }

    pub fn observed(&self) -> Vec<TxStatus> {
        self.observed.lock().unwrap().clone()
    }

    pub fn sign_calls(&self) -> usize {
        self.sign_calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<TxRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn added_chains(&self) -> Vec<AddChainParams> {
        self.added_chains.lock().unwrap().clone()
    }

    pub fn emit(&self, event: WalletEvent) {
        let _ = self.events.send(event);
    }

    pub fn listeners(&self) -> usize {
        self.events.receiver_count()
    }
}

impl WalletProvider for MockWallet {
    async fn connect(&self) -> Result<Address, WalletError> {
        let account = Self::account();
        *self.account.lock().unwrap() = Some(account);
        self.emit(WalletEvent::AccountsChanged(vec![account]));
        Ok(account)
    }

    async fn disconnect(&self) -> Result<(), WalletError> {
        *self.account.lock().unwrap() = None;
        self.emit(WalletEvent::AccountsChanged(vec![]));
        Ok(())
    }

    async fn active_account(&self) -> Result<Option<Address>, WalletError> {
        Ok(*self.account.lock().unwrap())
    }

    async fn active_chain(&self) -> Result<ChainId, WalletError> {
        Ok(*self.chain.lock().unwrap())
    }

    async fn switch_chain(&self, chain_id: ChainId) -> Result<(), WalletError> {
        if !self.known_chains.lock().unwrap().contains(&chain_id) {
            return Err(WalletError::UnrecognizedChain(chain_id));
        }
        *self.chain.lock().unwrap() = chain_id;
        self.emit(WalletEvent::ChainChanged(chain_id));
        Ok(())
    }

    async fn add_chain(&self, params: &AddChainParams) -> Result<(), WalletError> {
        self.added_chains.lock().unwrap().push(params.clone());
        self.known_chains.lock().unwrap().push(params.chain_id);
        Ok(())
    }

    async fn sign_and_send(&self, tx: &TxRequest) -> Result<TxHash, WalletError> {
        let active = *self.chain.lock().unwrap();
        if tx.chain_id != active {
            return Err(WalletError::ChainMismatch {
                requested: tx.chain_id,
                active,
            });
        }
        self.sign_calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(tx.clone());
        match self.send_results.lock().unwrap().pop_front() {
            Some(result) => result,
            None => Ok(TxHash::repeat_byte(
                self.next_hash.fetch_add(1, Ordering::SeqCst),
            )),
        }
    }

    async fn wait_for_confirmation(&self, hash: TxHash) -> Result<TxReceipt, WalletError> {
        if let Some(status) = self.status_watch.lock().unwrap().as_ref() {
            self.observed.lock().unwrap().push(status.borrow().clone());
        }
        let success = match self.confirm_results.lock().unwrap().pop_front() {
            Some(result) => result?,
            None => true,
        };
        Ok(TxReceipt {
            hash,
            block_number: Some(1),
            success,
        })
    }

    fn subscribe(&self) -> broadcast::Receiver<WalletEvent> {
        self.events.subscribe()
    }
}
