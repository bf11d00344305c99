//! The payment form: draft editing, the confirmation step, execution and the
//! scoped history shown under the form.
//!
//! ```text
//! Editing --submit--> Confirming --confirm--> (executor) --> Editing
//!    ^                    |
//!    +------cancel--------+
//! ```

use std::sync::Arc;

use tokio::sync::watch;

use crate::chains::Chain;
use crate::draft::{ConfirmedTransaction, TransactionDraft};
use crate::error::PayError;
use crate::executor::{TransactionExecutor, TxStatus};
use crate::history::{load_history, record_transaction, History, TransactionRecord};
use crate::memo::{memo_context, MemoGenerator, MemoStatus};
use crate::session::SessionState;
use crate::store::KeyValueStore;
use crate::wallet::WalletProvider;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormStage {
    Editing,
    /// The user is reviewing this snapshot; edits are refused.
    Confirming(ConfirmedTransaction),
}

pub struct PaymentForm {
    draft: TransactionDraft,
    stage: FormStage,
    executor: TransactionExecutor,
    store: Arc<dyn KeyValueStore>,
    session: SessionState,
    history: History,
    memo_status: MemoStatus,
}

impl PaymentForm {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self::with_executor(store, TransactionExecutor::new())
    }

    pub fn with_executor(store: Arc<dyn KeyValueStore>, executor: TransactionExecutor) -> Self {
        Self {
            draft: TransactionDraft::default(),
            stage: FormStage::Editing,
            executor,
            store,
            session: SessionState::default(),
            history: History::new(),
            memo_status: MemoStatus::Idle,
        }
    }

    pub fn draft(&self) -> &TransactionDraft {
        &self.draft
    }

    pub fn stage(&self) -> &FormStage {
        &self.stage
    }

    pub fn set_recipient(&mut self, recipient: &str) -> Result<(), PayError> {
        self.ensure_editable()?;
        self.draft.set_recipient(recipient);
        Ok(())
    }

    pub fn set_amount(&mut self, amount: &str) -> Result<(), PayError> {
        self.ensure_editable()?;
        self.draft.set_amount(amount);
        Ok(())
    }

    pub fn set_memo(&mut self, memo: &str) -> Result<(), PayError> {
        self.ensure_editable()?;
        self.draft.set_memo(memo);
        Ok(())
    }

    fn ensure_editable(&self) -> Result<(), PayError> {
        if self.executor.is_busy() {
            return Err(PayError::Busy);
        }
        if matches!(self.stage, FormStage::Confirming(_)) {
            return Err(PayError::Confirming);
        }
        Ok(())
    }

    /// Take in a new session snapshot, reloading history when the
    /// (account, chain) scope changed.
    pub fn sync_session(&mut self, state: SessionState) {
        if state == self.session {
            return;
        }
        let scope_changed = state.history_scope() != self.session.history_scope();
        self.session = state;
        if scope_changed {
            self.reload_history();
        }
    }

    fn reload_history(&mut self) {
        self.history = match (self.session.history_scope(), self.session.current_chain()) {
            (Some(scope), Some(_)) => {
                let history = load_history(self.store.as_ref(), &scope);
                tracing::debug!(
                    key = %scope.storage_key(),
                    records = history.len(),
                    "loaded history"
                );
                history
            }
            _ => History::new(),
        };
    }

    pub fn session(&self) -> &SessionState {
        &self.session
    }

    /// The active chain, if supported.
    pub fn current_chain(&self) -> Option<&'static Chain> {
        self.session.current_chain()
    }

    /// Whether the submit action is enabled.
    pub fn can_submit(&self) -> bool {
        self.draft.is_complete()
            && self.session.account.is_some()
            && self.current_chain().is_some()
            && !self.executor.is_busy()
            && matches!(self.stage, FormStage::Editing)
    }

    /// Validate the draft and open the confirmation step.
    pub fn submit(&mut self) -> Result<&ConfirmedTransaction, PayError> {
        self.ensure_editable()?;
        let tx = ConfirmedTransaction::from_draft(
            &self.draft,
            self.session.account,
            self.current_chain(),
        )?;
        tracing::debug!(to = %tx.to(), amount = tx.amount(), "awaiting confirmation");
        self.stage = FormStage::Confirming(tx);
        self.pending_confirmation().ok_or(PayError::NotConfirming)
    }

    pub fn pending_confirmation(&self) -> Option<&ConfirmedTransaction> {
        match &self.stage {
            FormStage::Confirming(tx) => Some(tx),
            FormStage::Editing => None,
        }
    }

    /// Close the confirmation step, leaving the draft as it was.
    pub fn cancel(&mut self) -> Result<(), PayError> {
        match self.stage {
            FormStage::Confirming(_) => {
                self.stage = FormStage::Editing;
                Ok(())
            }
            FormStage::Editing => Err(PayError::NotConfirming),
        }
    }

    /// Send the transaction under review.
    ///
    /// On success the record is persisted under the scope captured at
    /// submission and the draft is cleared. On failure the draft is kept and
    /// the status carries the message.
    pub async fn confirm<W: WalletProvider>(
        &mut self,
        wallet: &W,
    ) -> Result<TransactionRecord, PayError> {
        if self.executor.is_busy() {
            return Err(PayError::Busy);
        }
        let tx = match std::mem::replace(&mut self.stage, FormStage::Editing) {
            FormStage::Confirming(tx) => tx,
            FormStage::Editing => return Err(PayError::NotConfirming),
        };

        // The snapshot's value and explorer belong to the scope it was taken in.
        if self.session.history_scope() != Some(*tx.scope()) {
            tracing::warn!(
                confirmed = %tx.chain().id,
                active = ?self.session.chain_id,
                "session changed during confirmation, payment not sent"
            );
            return Err(PayError::ScopeChanged);
        }

        let record = self.executor.execute(wallet, &tx).await?;

        let scope = *tx.scope();
        let visible = self.session.history_scope() == Some(scope);
        match record_transaction(self.store.as_ref(), &scope, record.clone()) {
            Ok(history) if visible => self.history = history,
            Ok(_) => {}
            Err(e) => {
                tracing::error!(
                    key = %scope.storage_key(),
                    error = %e,
                    "failed to persist transaction history"
                );
                if visible {
                    self.history.push(record.clone());
                }
            }
        }

        self.draft.clear();
        self.memo_status = MemoStatus::Idle;
        Ok(record)
    }

    /// Fill the memo field from `generator`.
    ///
    /// Generator errors leave the memo untouched and are reported through
    /// [`MemoStatus::Failed`], not as an `Err`.
    pub async fn generate_memo<M: MemoGenerator>(
        &mut self,
        generator: &M,
    ) -> Result<MemoStatus, PayError> {
        self.ensure_editable()?;
        if !self.draft.is_complete() {
            return Err(PayError::Validation(
                "recipient and amount are required to generate a memo".to_string(),
            ));
        }

        let symbol = self.current_chain().map(|c| c.native_currency.symbol);
        let context = memo_context(self.draft.amount(), symbol, self.draft.recipient());
        self.memo_status = MemoStatus::Generating;

        match generator.generate_memo(&context).await {
            Ok(memo) => {
                self.draft.set_memo(&memo);
                self.memo_status = MemoStatus::Generated;
            }
            Err(e) => {
                tracing::warn!(error = %e, "memo generation failed");
                self.memo_status = MemoStatus::Failed;
            }
        }
        Ok(self.memo_status)
    }

    pub fn memo_status(&self) -> MemoStatus {
        self.memo_status
    }

    /// Transactions for the active scope, newest first.
    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn status(&self) -> TxStatus {
        self.executor.status()
    }

    pub fn watch_status(&self) -> watch::Receiver<TxStatus> {
        self.executor.watch()
    }
}
