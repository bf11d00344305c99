mod cli;

use std::io::{BufRead, Write};
use std::sync::Arc;

use alloy::signers::local::PrivateKeySigner;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cryptopay::{
    find_chain, resolve_chain, switch_chain, Chain, GeminiMemoClient, KeyValueStore,
    PayConfig, PayError, PaymentForm, Session, SessionState, SqliteStore, SwitchOutcome,
    TransactionExecutor, TxStatus, WalletProvider, SUPPORTED_CHAINS,
};
use cryptopay_wallet::LocalWallet;

use cli::{Cli, Command};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli.command).await {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

async fn run(command: Command) -> Result<(), PayError> {
    match command {
        Command::Chains => {
            list_chains();
            Ok(())
        }
        Command::Send {
            to,
            amount,
            memo,
            ai_memo,
            chain,
            yes,
        } => {
            let (config, wallet) = load()?;
            let target = target_chain(&config, chain.as_deref())?;
            send(&config, &wallet, target, &to, &amount, memo.as_deref(), ai_memo, yes).await
        }
        Command::History { chain } => {
            let (config, wallet) = load()?;
            let target = target_chain(&config, chain.as_deref())?;
            show_history(&config, &wallet, target)
        }
        Command::Memo { to, amount, chain } => {
            let (config, wallet) = load()?;
            let target = target_chain(&config, chain.as_deref())?;
            memo_only(&config, &wallet, target, &to, &amount).await
        }
        Command::Switch { chain } => {
            let (_, wallet) = load()?;
            let target = resolve(&chain)?;
            let session = Session::new();
            wallet.connect().await?;
            activate_chain(&wallet, &session, target).await?;
            println!("Active chain: {} ({})", target.name, target.id);
            Ok(())
        }
    }
}

fn load() -> Result<(PayConfig, LocalWallet), PayError> {
    let config = PayConfig::from_env()?;
    let wallet = build_wallet(&config)?;
    Ok((config, wallet))
}

fn list_chains() {
    for chain in SUPPORTED_CHAINS {
        println!(
            "{:<10} {:<16} {:<6} {}",
            chain.id.to_string(),
            chain.name,
            chain.native_currency.symbol,
            chain.explorer_url
        );
    }
}

fn resolve(reference: &str) -> Result<&'static Chain, PayError> {
    resolve_chain(reference).ok_or_else(|| {
        PayError::Config(format!(
            "unknown chain '{reference}'; run `cryptopay chains` for the supported list"
        ))
    })
}

fn target_chain(config: &PayConfig, reference: Option<&str>) -> Result<&'static Chain, PayError> {
    match reference {
        Some(reference) => resolve(reference),
        None => {
            find_chain(config.chain_id).ok_or(PayError::UnsupportedChain(Some(config.chain_id)))
        }
    }
}

fn build_wallet(config: &PayConfig) -> Result<LocalWallet, PayError> {
    let key = config
        .private_key
        .as_deref()
        .ok_or_else(|| PayError::Config("EVM_PRIVATE_KEY is required".to_string()))?;
    let signer: PrivateKeySigner = key
        .parse()
        .map_err(|_| PayError::Config("invalid EVM_PRIVATE_KEY".to_string()))?;

    let chain =
        find_chain(config.chain_id).ok_or(PayError::UnsupportedChain(Some(config.chain_id)))?;
    let wallet = LocalWallet::new(signer, chain, config.rpc_url.as_deref())?
        .with_confirmation(config.confirmation_timeout, config.poll_interval);
    Ok(wallet)
}

fn open_store(config: &PayConfig) -> Result<Arc<dyn KeyValueStore>, PayError> {
    let store = SqliteStore::open(&config.db_path)?;
    tracing::debug!(path = %config.db_path, "history store opened");
    Ok(Arc::new(store))
}

/// Switch the wallet to `target`, retrying once after the chain was added.
async fn activate_chain(
    wallet: &LocalWallet,
    session: &Session,
    target: &'static Chain,
) -> Result<(), PayError> {
    if session.refresh(wallet).await?.chain_id == Some(target.id) {
        return Ok(());
    }

    let mut outcome = switch_chain(wallet, target.id).await;
    if outcome == SwitchOutcome::ChainAdded {
        println!("Added {} to the wallet.", target.name);
        outcome = switch_chain(wallet, target.id).await;
    }

    match outcome {
        SwitchOutcome::Switched => {
            session.refresh(wallet).await?;
            Ok(())
        }
        SwitchOutcome::ChainAdded => Err(PayError::UnsupportedChain(Some(target.id))),
        SwitchOutcome::Failed(message) => {
            eprintln!("Could not switch to {}: {message}", target.name);
            Err(PayError::UnsupportedChain(Some(target.id)))
        }
    }
}

async fn connected_form(
    config: &PayConfig,
    wallet: &LocalWallet,
    session: &Session,
    target: &'static Chain,
) -> Result<PaymentForm, PayError> {
    wallet.connect().await?;
    activate_chain(wallet, session, target).await?;

    let executor = TransactionExecutor::with_notice_timeout(config.notice_timeout);
    let mut form = PaymentForm::with_executor(open_store(config)?, executor);
    form.sync_session(session.snapshot());
    Ok(form)
}

#[allow(clippy::too_many_arguments)]
async fn send(
    config: &PayConfig,
    wallet: &LocalWallet,
    target: &'static Chain,
    to: &str,
    amount: &str,
    memo: Option<&str>,
    ai_memo: bool,
    yes: bool,
) -> Result<(), PayError> {
    let session = Session::new();
    let _subscription = session.attach(wallet);
    let mut form = connected_form(config, wallet, &session, target).await?;

    form.set_recipient(to)?;
    form.set_amount(amount)?;
    if let Some(memo) = memo {
        form.set_memo(memo)?;
    }
    if ai_memo {
        let generator = GeminiMemoClient::new(config.gemini_api_key.clone(), &config.gemini_model);
        let status = form.generate_memo(&generator).await?;
        println!("{}", status.message());
    }

    form.sync_session(session.snapshot());
    let tx = form.submit()?;
    println!("Confirm Transaction");
    println!("  To:      {}", tx.recipient());
    println!(
        "  Amount:  {} {} ({} units)",
        tx.formatted_value(),
        tx.chain().native_currency.symbol,
        tx.value()
    );
    if let Some(memo) = tx.memo() {
        println!("  Memo:    {memo}");
    }
    println!("  Network: {}", tx.chain().name);

    if !yes && !prompt_confirm()? {
        form.cancel()?;
        println!("Cancelled.");
        return Ok(());
    }

    let mut status = form.watch_status();
    let printer = tokio::spawn(async move {
        while status.changed().await.is_ok() {
            match &*status.borrow_and_update() {
                TxStatus::Sending => println!("Sending..."),
                TxStatus::Pending { hash, explorer_url } => {
                    println!("Pending: {hash}");
                    println!("  {explorer_url}");
                }
                _ => {}
            }
        }
    });

    let result = form.confirm(wallet).await;
    printer.abort();

    match (result, form.status()) {
        (Ok(_), TxStatus::Success { explorer_url, .. }) => {
            println!("Success! View on explorer: {explorer_url}");
        }
        (Err(_), TxStatus::Failed { message }) => {
            println!("Failed: {message}");
        }
        (Ok(record), _) => println!("Success! {}", record.hash),
        (Err(e), _) => return Err(e),
    }

    print_history(&form, target);
    Ok(())
}

fn prompt_confirm() -> Result<bool, PayError> {
    print!("Confirm & Send? [y/N] ");
    std::io::stdout()
        .flush()
        .map_err(|e| PayError::Config(format!("stdout: {e}")))?;

    let mut line = String::new();
    std::io::stdin()
        .lock()
        .read_line(&mut line)
        .map_err(|e| PayError::Config(format!("stdin: {e}")))?;
    Ok(matches!(line.trim().to_ascii_lowercase().as_str(), "y" | "yes"))
}

fn show_history(
    config: &PayConfig,
    wallet: &LocalWallet,
    target: &'static Chain,
) -> Result<(), PayError> {
    let mut form = PaymentForm::new(open_store(config)?);
    form.sync_session(SessionState {
        account: Some(wallet.address()),
        chain_id: Some(target.id),
    });
    print_history(&form, target);
    Ok(())
}

fn print_history(form: &PaymentForm, chain: &Chain) {
    println!("Recent transactions on {}:", chain.name);
    if form.history().is_empty() {
        println!("  (none)");
        return;
    }
    for record in form.history().iter() {
        println!(
            "  {} {} to {}",
            record.amount, chain.native_currency.symbol, record.recipient
        );
        if let Some(memo) = &record.memo {
            println!("    \"{memo}\"");
        }
        println!("    {}", chain.tx_url(record.hash));
    }
}

async fn memo_only(
    config: &PayConfig,
    wallet: &LocalWallet,
    target: &'static Chain,
    to: &str,
    amount: &str,
) -> Result<(), PayError> {
    let generator = GeminiMemoClient::new(config.gemini_api_key.clone(), &config.gemini_model);
    if !generator.is_configured() {
        return Err(PayError::Config("GEMINI_API_KEY is not set".to_string()));
    }

    let mut form = PaymentForm::new(Arc::new(cryptopay::InMemoryStore::new()));
    form.sync_session(SessionState {
        account: Some(wallet.address()),
        chain_id: Some(target.id),
    });
    form.set_recipient(to)?;
    form.set_amount(amount)?;

    let status = form.generate_memo(&generator).await?;
    eprintln!("{}", status.message());
    println!("{}", form.draft().memo());
    Ok(())
}
