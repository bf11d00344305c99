mod common;

use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::U256;
use common::{MockWallet, RECIPIENT};

use cryptopay::chains::{BSC_CHAIN_ID, POLYGON_CHAIN_ID, SEPOLIA_CHAIN_ID};
use cryptopay::{
    switch_chain, ChainId, InMemoryStore, KeyValueStore, PayError, PaymentForm, Session,
    SessionState, SwitchOutcome, TransactionExecutor, TxStatus, WalletError, WalletEvent,
    WalletProvider, MAX_HISTORY,
};

fn session_on(chain_id: ChainId) -> SessionState {
    SessionState {
        account: Some(MockWallet::account()),
        chain_id: Some(chain_id),
    }
}

fn form_on(chain_id: ChainId) -> PaymentForm {
    let mut form = PaymentForm::new(Arc::new(InMemoryStore::new()));
    form.sync_session(session_on(chain_id));
    form
}

fn fill(form: &mut PaymentForm, amount: &str, memo: &str) {
    form.set_recipient(RECIPIENT).unwrap();
    form.set_amount(amount).unwrap();
    form.set_memo(memo).unwrap();
}

// -- Submission gating --

#[tokio::test]
async fn test_empty_fields_never_sign() {
    let wallet = MockWallet::new(MockWallet::account(), SEPOLIA_CHAIN_ID);
    let mut form = form_on(SEPOLIA_CHAIN_ID);

    form.set_amount("1").unwrap();
    assert!(matches!(form.submit(), Err(PayError::Validation(_))));
    assert!(matches!(form.confirm(&wallet).await, Err(PayError::NotConfirming)));

    form.set_amount("").unwrap();
    form.set_recipient(RECIPIENT).unwrap();
    assert!(matches!(form.submit(), Err(PayError::Validation(_))));

    assert_eq!(wallet.sign_calls(), 0);
    assert_eq!(form.status(), TxStatus::Idle);
}

#[tokio::test]
async fn test_unsupported_chain_blocks_submit() {
    let mut form = form_on(ChainId(1));
    fill(&mut form, "1", "");
    assert!(!form.can_submit());
    assert!(matches!(form.submit(), Err(PayError::UnsupportedChain(None))));
}

#[tokio::test]
async fn test_snapshot_survives_edits_and_cancel() {
    let mut form = form_on(SEPOLIA_CHAIN_ID);
    fill(&mut form, "1.5", "pizza");
    let snapshot = form.submit().unwrap().clone();

    assert!(form.set_recipient("0x0000000000000000000000000000000000000001").is_err());
    assert!(form.set_amount("100").is_err());
    assert!(form.set_memo("changed").is_err());
    assert_eq!(form.pending_confirmation(), Some(&snapshot));

    form.cancel().unwrap();
    assert!(form.pending_confirmation().is_none());
    assert_eq!(form.draft().recipient(), RECIPIENT);
    assert_eq!(form.draft().amount(), "1.5");
    assert_eq!(form.draft().memo(), "pizza");
}

// -- Execution --

#[tokio::test]
async fn test_successful_send() {
    let wallet = MockWallet::new(MockWallet::account(), SEPOLIA_CHAIN_ID);
    let mut form = form_on(SEPOLIA_CHAIN_ID);
    wallet.watch_status(form.watch_status());

    fill(&mut form, "1.5", "For the pizza crusade");
    form.submit().unwrap();
    let record = form.confirm(&wallet).await.unwrap();

    let requests = wallet.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(
        requests[0].value,
        U256::from(1_500_000_000_000_000_000u128)
    );
    assert_eq!(
        requests[0].data.as_ref().map(|d| d.to_vec()),
        Some(b"For the pizza crusade".to_vec())
    );

    // Pending carried the broadcast hash before the receipt was awaited.
    let observed = wallet.observed();
    assert_eq!(observed.len(), 1);
    assert_eq!(observed[0].hash(), Some(record.hash));
    assert!(matches!(&observed[0], TxStatus::Pending { .. }));

    match form.status() {
        TxStatus::Success { hash, explorer_url } => {
            assert_eq!(hash, record.hash);
            assert_eq!(explorer_url, format!("https://sepolia.etherscan.io/tx/{hash}"));
        }
        other => panic!("expected success, got {other:?}"),
    }

    assert_eq!(form.history().newest(), Some(&record));
    assert_eq!(record.memo.as_deref(), Some("For the pizza crusade"));
    assert!(form.draft().recipient().is_empty());
    assert!(form.draft().amount().is_empty());
    assert!(form.draft().memo().is_empty());
}

#[tokio::test]
async fn test_history_capped_newest_first() {
    let wallet = MockWallet::new(MockWallet::account(), SEPOLIA_CHAIN_ID);
    let mut form = form_on(SEPOLIA_CHAIN_ID);

    let mut hashes = Vec::new();
    for i in 1..=7 {
        fill(&mut form, &i.to_string(), "");
        form.submit().unwrap();
        hashes.push(form.confirm(&wallet).await.unwrap().hash);
        assert!(form.history().len() <= MAX_HISTORY);
    }

    let history = form.history();
    assert_eq!(history.len(), MAX_HISTORY);
    assert_eq!(history.newest().map(|r| r.hash), hashes.last().copied());
    assert_eq!(history.records()[0].amount, "7");
    assert_eq!(history.records()[4].amount, "3");
}

#[tokio::test]
async fn test_history_scoped_per_chain() {
    let store: Arc<dyn KeyValueStore> = Arc::new(InMemoryStore::new());
    let wallet = MockWallet::new(MockWallet::account(), SEPOLIA_CHAIN_ID);
    let mut form = PaymentForm::new(Arc::clone(&store));

    form.sync_session(session_on(SEPOLIA_CHAIN_ID));
    fill(&mut form, "1", "");
    form.submit().unwrap();
    let sepolia = form.confirm(&wallet).await.unwrap();

    form.sync_session(session_on(POLYGON_CHAIN_ID));
    assert!(form.history().is_empty());
    fill(&mut form, "2", "");
    form.submit().unwrap();
    let polygon = form.confirm(&wallet).await.unwrap();
    assert_eq!(form.history().records(), &[polygon.clone()]);

    form.sync_session(session_on(SEPOLIA_CHAIN_ID));
    assert_eq!(form.history().records(), &[sepolia]);

    // A fresh form over the same store sees the persisted records.
    let mut reopened = PaymentForm::new(store);
    reopened.sync_session(session_on(POLYGON_CHAIN_ID));
    assert_eq!(reopened.history().records(), &[polygon]);
}

#[tokio::test]
async fn test_chain_change_during_review_never_signs() {
    let wallet = MockWallet::new(MockWallet::account(), SEPOLIA_CHAIN_ID);
    wallet.know_chain(BSC_CHAIN_ID);
    let mut form = form_on(SEPOLIA_CHAIN_ID);
    fill(&mut form, "1", "");
    form.submit().unwrap();

    // The wallet moves to another network while the user is reviewing.
    wallet.switch_chain(BSC_CHAIN_ID).await.unwrap();
    form.sync_session(session_on(BSC_CHAIN_ID));
    let err = form.confirm(&wallet).await.unwrap_err();
    assert!(matches!(err, PayError::ScopeChanged));

    assert_eq!(wallet.sign_calls(), 0);
    assert_eq!(form.status(), TxStatus::Idle);
    assert!(form.pending_confirmation().is_none());
    assert_eq!(form.draft().amount(), "1");
    assert!(form.history().is_empty());
    form.sync_session(session_on(SEPOLIA_CHAIN_ID));
    assert!(form.history().is_empty());
}

#[tokio::test]
async fn test_wallet_refuses_request_for_other_chain() {
    let wallet = MockWallet::new(MockWallet::account(), BSC_CHAIN_ID);
    let mut form = form_on(SEPOLIA_CHAIN_ID);
    fill(&mut form, "1", "");
    form.submit().unwrap();

    // The form never heard about the switch; the request still names Sepolia.
    let err = form.confirm(&wallet).await.unwrap_err();
    assert!(matches!(err, PayError::BroadcastFailed(_)));
    assert_eq!(wallet.sign_calls(), 0);
    assert!(matches!(form.status(), TxStatus::Failed { .. }));
    assert!(form.history().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_user_rejection_notice_then_idle() {
    let wallet = MockWallet::new(MockWallet::account(), SEPOLIA_CHAIN_ID);
    let mut form = form_on(SEPOLIA_CHAIN_ID);
    wallet.script_send(Err(WalletError::from_rpc(4001, "User denied transaction signature.")));

    fill(&mut form, "1", "keep me");
    form.submit().unwrap();
    let err = form.confirm(&wallet).await.unwrap_err();
    assert!(matches!(err, PayError::UserRejected));

    assert!(matches!(form.status(), TxStatus::Failed { .. }));
    assert!(form.history().is_empty());
    assert_eq!(form.draft().memo(), "keep me");
    assert!(form.pending_confirmation().is_none());

    tokio::time::sleep(Duration::from_secs(6)).await;
    assert_eq!(form.status(), TxStatus::Idle);
}

#[tokio::test]
async fn test_broadcast_failure_prefers_nested_message() {
    let wallet = MockWallet::new(MockWallet::account(), SEPOLIA_CHAIN_ID);
    let mut form = form_on(SEPOLIA_CHAIN_ID);
    wallet.script_send(Err(WalletError::from_rpc(
        -32000,
        "insufficient funds for gas * price + value",
    )));

    fill(&mut form, "1", "");
    form.submit().unwrap();
    let err = form.confirm(&wallet).await.unwrap_err();
    assert!(matches!(err, PayError::BroadcastFailed(_)));
    assert_eq!(
        form.status(),
        TxStatus::Failed {
            message: "insufficient funds for gas * price + value".to_string()
        }
    );
}

#[tokio::test]
async fn test_reverted_transaction_not_recorded() {
    let wallet = MockWallet::new(MockWallet::account(), SEPOLIA_CHAIN_ID);
    let mut form = form_on(SEPOLIA_CHAIN_ID);
    wallet.script_confirmation(Ok(false));

    fill(&mut form, "1", "");
    form.submit().unwrap();
    assert!(form.confirm(&wallet).await.is_err());
    assert!(matches!(form.status(), TxStatus::Failed { .. }));
    assert!(form.history().is_empty());
    assert_eq!(form.draft().amount(), "1");
}

#[tokio::test(start_paused = true)]
async fn test_new_send_after_notice() {
    let wallet = MockWallet::new(MockWallet::account(), SEPOLIA_CHAIN_ID);
    let mut form = PaymentForm::with_executor(
        Arc::new(InMemoryStore::new()),
        TransactionExecutor::with_notice_timeout(Duration::from_secs(1)),
    );
    form.sync_session(session_on(SEPOLIA_CHAIN_ID));

    fill(&mut form, "1", "");
    form.submit().unwrap();
    let first = form.confirm(&wallet).await.unwrap();

    // A second send replaces the pending notice.
    fill(&mut form, "2", "");
    form.submit().unwrap();
    let second = form.confirm(&wallet).await.unwrap();
    assert_ne!(first.hash, second.hash);
    assert_eq!(form.status().hash(), Some(second.hash));

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(form.status(), TxStatus::Idle);
}

// -- Chain switching --

#[tokio::test]
async fn test_switch_known_chain() {
    let wallet = MockWallet::new(MockWallet::account(), SEPOLIA_CHAIN_ID);
    wallet.know_chain(POLYGON_CHAIN_ID);
    assert_eq!(switch_chain(&wallet, POLYGON_CHAIN_ID).await, SwitchOutcome::Switched);
    assert!(wallet.added_chains().is_empty());
}

#[tokio::test]
async fn test_switch_unknown_chain_adds_definition() {
    let wallet = MockWallet::new(MockWallet::account(), SEPOLIA_CHAIN_ID);
    assert_eq!(switch_chain(&wallet, BSC_CHAIN_ID).await, SwitchOutcome::ChainAdded);

    let added = wallet.added_chains();
    assert_eq!(added.len(), 1);
    assert_eq!(added[0].chain_id, BSC_CHAIN_ID);
    assert_eq!(added[0].native_currency.symbol, "BNB");

    // The retried switch now succeeds.
    assert_eq!(switch_chain(&wallet, BSC_CHAIN_ID).await, SwitchOutcome::Switched);
}

#[tokio::test]
async fn test_switch_to_unlisted_chain_fails_softly() {
    let wallet = MockWallet::new(MockWallet::account(), SEPOLIA_CHAIN_ID);
    let outcome = switch_chain(&wallet, ChainId(1)).await;
    assert!(matches!(outcome, SwitchOutcome::Failed(_)));
    assert!(wallet.added_chains().is_empty());
}

// -- Session --

#[tokio::test]
async fn test_session_follows_wallet_until_dropped() {
    let wallet = MockWallet::new(MockWallet::account(), SEPOLIA_CHAIN_ID);
    wallet.know_chain(POLYGON_CHAIN_ID);
    let session = Session::new();
    session.refresh(&wallet).await.unwrap();
    assert_eq!(session.snapshot(), session_on(SEPOLIA_CHAIN_ID));

    let mut changes = session.watch();
    let subscription = session.attach(&wallet);
    assert_eq!(wallet.listeners(), 1);

    wallet.emit(WalletEvent::ChainChanged(POLYGON_CHAIN_ID));
    tokio::time::timeout(Duration::from_secs(1), changes.changed())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(session.snapshot().chain_id, Some(POLYGON_CHAIN_ID));

    let mut form = form_on(SEPOLIA_CHAIN_ID);
    form.sync_session(session.snapshot());
    assert_eq!(form.current_chain().map(|c| c.name), Some("Polygon"));

    drop(subscription);
    for _ in 0..5 {
        tokio::task::yield_now().await;
    }
    assert_eq!(wallet.listeners(), 0);

    wallet.emit(WalletEvent::AccountsChanged(vec![]));
    for _ in 0..5 {
        tokio::task::yield_now().await;
    }
    assert_eq!(session.snapshot().chain_id, Some(POLYGON_CHAIN_ID));
}

#[tokio::test]
async fn test_disconnect_clears_session_and_history() {
    let wallet = MockWallet::new(MockWallet::account(), SEPOLIA_CHAIN_ID);
    let session = Session::new();
    session.refresh(&wallet).await.unwrap();

    let mut form = form_on(SEPOLIA_CHAIN_ID);
    fill(&mut form, "1", "");
    form.submit().unwrap();
    form.confirm(&wallet).await.unwrap();
    assert_eq!(form.history().len(), 1);

    let mut changes = session.watch();
    let _subscription = session.attach(&wallet);
    wallet.disconnect().await.unwrap();
    tokio::time::timeout(Duration::from_secs(1), changes.changed())
        .await
        .unwrap()
        .unwrap();

    assert_eq!(session.snapshot().account, None);
    assert_eq!(session.snapshot().chain_id, Some(SEPOLIA_CHAIN_ID));

    form.sync_session(session.snapshot());
    assert!(form.history().is_empty());
    assert!(!form.can_submit());
}

#[tokio::test]
async fn test_reconnect_keeps_chain() {
    let wallet = MockWallet::new(MockWallet::account(), SEPOLIA_CHAIN_ID);
    let session = Session::new();
    session.refresh(&wallet).await.unwrap();
    let mut changes = session.watch();
    let _subscription = session.attach(&wallet);

    wallet.disconnect().await.unwrap();
    tokio::time::timeout(Duration::from_secs(1), changes.changed())
        .await
        .unwrap()
        .unwrap();
    wallet.connect().await.unwrap();
    tokio::time::timeout(Duration::from_secs(1), changes.changed())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(session.snapshot(), session_on(SEPOLIA_CHAIN_ID));

    let mut form = PaymentForm::new(Arc::new(InMemoryStore::new()));
    form.sync_session(session.snapshot());
    fill(&mut form, "1", "");
    assert!(form.can_submit());
    form.submit().unwrap();
    form.confirm(&wallet).await.unwrap();
    assert_eq!(wallet.sign_calls(), 1);
}
