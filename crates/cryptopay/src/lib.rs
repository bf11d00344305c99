//! Wallet-connected native-currency payments on EVM chains.
//!
//! A [`PaymentForm`] holds the draft the user is typing, takes an immutable
//! snapshot when it is submitted and, once confirmed, drives it through a
//! [`WalletProvider`] with the [`TransactionExecutor`]:
//! `Idle → Sending → Pending → (Success | Failed)`. Successful transactions
//! are kept in a capped, newest-first history scoped per (account, chain).
//!
//! # Pieces
//!
//! - **Chains** ([`chains`]): the supported-chain registry (Sepolia, Polygon, BNB Smart Chain)
//! - **Session** ([`Session`]): connected account and active chain, fed by wallet events
//! - **Chain switch** ([`switch_chain`]): switch with an add-chain fallback on code 4902
//! - **Memos** ([`MemoGenerator`]): short AI memos that fail closed
//!
//! # Quick example
//!
//! ```no_run
//! use std::sync::Arc;
//! use cryptopay::{InMemoryStore, PaymentForm, Session, WalletProvider};
//!
//! # async fn pay<W: WalletProvider>(wallet: W) -> Result<(), cryptopay::PayError> {
//! let session = Session::new();
//! session.refresh(&wallet).await?;
//!
//! let mut form = PaymentForm::new(Arc::new(InMemoryStore::new()));
//! form.sync_session(session.snapshot());
//! form.set_recipient("0xabcdef0123456789abcdef0123456789abcdef01")?;
//! form.set_amount("0.01")?;
//! form.submit()?;
//! let record = form.confirm(&wallet).await?;
//! println!("sent {}", record.hash);
//! # Ok(())
//! # }
//! ```

// Core types
pub mod amount;
pub mod chains;
pub mod error;
pub mod wallet;

// Payment flow
pub mod draft;
pub mod executor;
pub mod form;
pub mod history;
pub mod session;
pub mod store;
pub mod switch;

// Memos and configuration
pub mod config;
#[cfg(feature = "full")]
pub mod gemini;
pub mod memo;

pub use chains::{find_chain, resolve_chain, Chain, ChainId, SUPPORTED_CHAINS};
pub use config::PayConfig;
pub use draft::{ConfirmedTransaction, TransactionDraft};
pub use error::{PayError, WalletError};
pub use executor::{TransactionExecutor, TxStatus};
pub use form::{FormStage, PaymentForm};
pub use history::{History, HistoryScope, TransactionRecord, MAX_HISTORY};
pub use memo::{MemoGenerator, MemoStatus, DEFAULT_GEMINI_MODEL, FALLBACK_MEMO};
pub use session::{Session, SessionState, SessionSubscription};
pub use store::{InMemoryStore, KeyValueStore};
pub use switch::{switch_chain, SwitchOutcome};
pub use wallet::{TxReceipt, TxRequest, WalletEvent, WalletProvider};

#[cfg(feature = "full")]
pub use gemini::GeminiMemoClient;
#[cfg(feature = "full")]
pub use store::SqliteStore;
