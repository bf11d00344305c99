//! Session state: the connected account and the wallet's active chain.
//!
//! Kept in a `watch` channel so any number of readers see the latest value.
//! [`Session::attach`] subscribes to a wallet's change notifications; the
//! returned [`SessionSubscription`] unsubscribes when dropped.

use std::sync::Arc;

use alloy::primitives::Address;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;

use crate::chains::{find_chain, Chain, ChainId};
use crate::error::PayError;
use crate::history::HistoryScope;
use crate::wallet::{WalletEvent, WalletProvider};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionState {
    pub account: Option<Address>,
    pub chain_id: Option<ChainId>,
}

impl SessionState {
    /// The active chain, if it is one we support.
    pub fn current_chain(&self) -> Option<&'static Chain> {
        self.chain_id.and_then(find_chain)
    }

    /// History scope for this session; `None` until both parts are known.
    pub fn history_scope(&self) -> Option<HistoryScope> {
        Some(HistoryScope::new(self.account?, self.chain_id?))
    }

    fn apply(&mut self, event: &WalletEvent) {
        match event {
            WalletEvent::AccountsChanged(accounts) => match accounts.first() {
                Some(account) => self.account = Some(*account),
                // The wallet stays on its network while disconnected.
                None => {
                    tracing::info!("wallet disconnected");
                    self.account = None;
                }
            },
            WalletEvent::ChainChanged(chain_id) => self.chain_id = Some(*chain_id),
        }
    }
}

/// Shared, observable session state.
#[derive(Clone)]
pub struct Session {
    state: Arc<watch::Sender<SessionState>>,
}

impl Session {
    pub fn new() -> Self {
        let (state, _) = watch::channel(SessionState::default());
        Self {
            state: Arc::new(state),
        }
    }

    pub fn snapshot(&self) -> SessionState {
        *self.state.borrow()
    }

    pub fn watch(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    /// Re-read account and chain from the wallet.
    pub async fn refresh<W: WalletProvider>(&self, wallet: &W) -> Result<SessionState, PayError> {
        let account = wallet.active_account().await?;
        let chain_id = match account {
            Some(_) => Some(wallet.active_chain().await?),
            None => None,
        };
        let state = SessionState { account, chain_id };
        self.state.send_replace(state);
        Ok(state)
    }

    /// Apply a single wallet notification.
    pub fn apply(&self, event: &WalletEvent) {
        self.state.send_if_modified(|state| {
            let before = *state;
            state.apply(event);
            before != *state
        });
    }

    pub fn clear(&self) {
        self.state.send_replace(SessionState::default());
    }

    /// Follow `wallet`'s account/chain notifications until the returned
    /// subscription is dropped.
    pub fn attach<W: WalletProvider>(&self, wallet: &W) -> SessionSubscription {
        let mut events = wallet.subscribe();
        let session = self.clone();
        let task = tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) => {
                        tracing::debug!(?event, "wallet event");
                        session.apply(&event);
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "missed wallet events");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });
        SessionSubscription { task }
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

/// Live subscription to wallet notifications. Dropping it unsubscribes.
pub struct SessionSubscription {
    task: JoinHandle<()>,
}

impl SessionSubscription {
    pub fn unsubscribe(self) {}
}

impl Drop for SessionSubscription {
    fn drop(&mut self) {
        self.task.abort();
    }
}
