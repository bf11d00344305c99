//! Command-line arguments.

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "cryptopay")]
#[command(version, about = "Send native-currency payments from a local key", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List supported chains
    Chains,

    /// Send a payment
    Send {
        /// Recipient address
        #[arg(long)]
        to: String,

        /// Amount in the chain's native currency, e.g. 0.01
        #[arg(long)]
        amount: String,

        /// Memo attached as transaction data
        #[arg(long, conflicts_with = "ai_memo")]
        memo: Option<String>,

        /// Ask Gemini for a memo (needs GEMINI_API_KEY)
        #[arg(long)]
        ai_memo: bool,

        /// Chain id or name to send on (defaults to CRYPTOPAY_CHAIN)
        #[arg(long)]
        chain: Option<String>,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Show recent transactions for this account
    History {
        /// Chain id or name (defaults to CRYPTOPAY_CHAIN)
        #[arg(long)]
        chain: Option<String>,
    },

    /// Generate a memo without sending
    Memo {
        #[arg(long)]
        to: String,

        #[arg(long)]
        amount: String,

        #[arg(long)]
        chain: Option<String>,
    },

    /// Switch the wallet to another chain, adding it if needed
    Switch {
        /// Chain id or name
        chain: String,
    },
}
