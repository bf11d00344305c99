//! Transaction lifecycle: `Idle → Sending → Pending → (Success | Failed)`.
//!
//! Terminal states are shown for [`NOTICE_TIMEOUT`] and then fall back to
//! `Idle`. Transitions are published on a `watch` channel so a front end can
//! render them as they happen.

use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::TxHash;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::draft::ConfirmedTransaction;
use crate::error::{PayError, WalletError};
use crate::history::TransactionRecord;
use crate::wallet::WalletProvider;

/// How long a success or failure notice stays up.
pub const NOTICE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TxStatus {
    #[default]
    Idle,
    /// Waiting for the wallet to sign and the node to accept.
    Sending,
    /// Broadcast; waiting to be mined.
    Pending { hash: TxHash, explorer_url: String },
    Success { hash: TxHash, explorer_url: String },
    Failed { message: String },
}

impl TxStatus {
    /// A transaction is in flight; submission is disabled.
    pub fn is_busy(&self) -> bool {
        matches!(self, TxStatus::Sending | TxStatus::Pending { .. })
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, TxStatus::Success { .. } | TxStatus::Failed { .. })
    }

    pub fn hash(&self) -> Option<TxHash> {
        match self {
            TxStatus::Pending { hash, .. } | TxStatus::Success { hash, .. } => Some(*hash),
            _ => None,
        }
    }
}

/// Drives a confirmed transaction through the wallet, one at a time.
pub struct TransactionExecutor {
    status: Arc<watch::Sender<TxStatus>>,
    notice_timeout: Duration,
    dismiss: Option<JoinHandle<()>>,
}

impl TransactionExecutor {
    pub fn new() -> Self {
        Self::with_notice_timeout(NOTICE_TIMEOUT)
    }

    pub fn with_notice_timeout(notice_timeout: Duration) -> Self {
        let (status, _) = watch::channel(TxStatus::Idle);
        Self {
            status: Arc::new(status),
            notice_timeout,
            dismiss: None,
        }
    }

    pub fn status(&self) -> TxStatus {
        self.status.borrow().clone()
    }

    /// Subscribe to status transitions.
    pub fn watch(&self) -> watch::Receiver<TxStatus> {
        self.status.subscribe()
    }

    pub fn is_busy(&self) -> bool {
        self.status.borrow().is_busy()
    }

    /// Sign, broadcast and wait for `tx` to be mined.
    ///
    /// Returns the record to append to history on success. Every failure
    /// also lands in [`TxStatus::Failed`] with a readable message.
    pub async fn execute<W: WalletProvider>(
        &mut self,
        wallet: &W,
        tx: &ConfirmedTransaction,
    ) -> Result<TransactionRecord, PayError> {
        if self.is_busy() {
            return Err(PayError::Busy);
        }
        if let Some(dismiss) = self.dismiss.take() {
            dismiss.abort();
        }

        self.status.send_replace(TxStatus::Sending);
        tracing::info!(
            to = %tx.to(),
            amount = %tx.amount(),
            chain = %tx.chain().id,
            "sending transaction"
        );

        let hash = match wallet.sign_and_send(&tx.to_request()).await {
            Ok(hash) => hash,
            Err(e) => return Err(self.fail(e)),
        };

        let explorer_url = tx.chain().tx_url(hash);
        tracing::info!(hash = %hash, explorer = %explorer_url, "transaction broadcast");
        self.status.send_replace(TxStatus::Pending {
            hash,
            explorer_url: explorer_url.clone(),
        });

        match wallet.wait_for_confirmation(hash).await {
            Ok(receipt) if receipt.success => {
                tracing::info!(
                    hash = %hash,
                    block = ?receipt.block_number,
                    "transaction confirmed"
                );
            }
            Ok(_) => return Err(self.fail(WalletError::Reverted(hash))),
            Err(e) => return Err(self.fail(e)),
        }

        self.status.send_replace(TxStatus::Success { hash, explorer_url });
        self.schedule_dismiss();

        Ok(TransactionRecord {
            hash,
            recipient: tx.recipient().to_string(),
            amount: tx.amount().to_string(),
            memo: tx.memo().map(str::to_string),
        })
    }

    fn fail(&mut self, err: WalletError) -> PayError {
        let message = err.user_message();
        tracing::warn!(error = %err, "transaction failed");
        self.status.send_replace(TxStatus::Failed { message });
        self.schedule_dismiss();
        PayError::from(err)
    }

    /// Return a terminal state to `Idle` once the notice has been shown.
    fn schedule_dismiss(&mut self) {
        let status = Arc::clone(&self.status);
        let timeout = self.notice_timeout;
        self.dismiss = Some(tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            status.send_if_modified(|s| {
                if s.is_terminal() {
                    *s = TxStatus::Idle;
                    true
                } else {
                    false
                }
            });
        }));
    }
}

impl Default for TransactionExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for TransactionExecutor {
    fn drop(&mut self) {
        if let Some(dismiss) = self.dismiss.take() {
            dismiss.abort();
        }
    }
}
