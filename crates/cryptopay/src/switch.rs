use crate::chains::{find_chain, ChainId};
use crate::wallet::WalletProvider;

/// What happened when a chain switch was requested.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SwitchOutcome {
    Switched,
    /// The wallet did not know the chain; its definition was added and the
    /// switch has to be requested again.
    ChainAdded,
    /// Logged, never fatal.
    Failed(String),
}

/// Ask the wallet to switch to `target`, falling back to adding the chain
/// definition when the wallet reports it as unrecognized (code 4902).
pub async fn switch_chain<W: WalletProvider>(wallet: &W, target: ChainId) -> SwitchOutcome {
    let err = match wallet.switch_chain(target).await {
        Ok(()) => {
            tracing::info!(chain = %target, "switched chain");
            return SwitchOutcome::Switched;
        }
        Err(e) => e,
    };

    if !err.is_unrecognized_chain() {
        tracing::error!(chain = %target, error = %err, "failed to switch chain");
        return SwitchOutcome::Failed(err.user_message());
    }

    let Some(chain) = find_chain(target) else {
        tracing::warn!(chain = %target, "wallet does not know chain and it is not supported");
        return SwitchOutcome::Failed(format!("unsupported chain {target}"));
    };

    match wallet.add_chain(&chain.add_chain_params()).await {
        Ok(()) => {
            tracing::info!(chain = %target, name = chain.name, "added chain to wallet");
            SwitchOutcome::ChainAdded
        }
        Err(e) => {
            tracing::error!(chain = %target, error = %e, "failed to add chain");
            SwitchOutcome::Failed(e.user_message())
        }
    }
}
