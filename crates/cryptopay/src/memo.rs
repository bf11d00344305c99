//! Memo generation: prompt building, response clean-up and the generator seam.

use std::future::Future;

use crate::error::PayError;

/// Model asked for memos unless configured otherwise.
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash";

/// Memo used when the text API fails.
pub const FALLBACK_MEMO: &str = "AI memo failed... but the thought counts!";

/// A source of short payment memos.
pub trait MemoGenerator: Send + Sync {
    /// Produce a memo for `context`. Returns an error only when the generator
    /// cannot be used at all (e.g. not configured); API failures fail closed
    /// with [`FALLBACK_MEMO`].
    fn generate_memo(&self, context: &str)
        -> impl Future<Output = Result<String, PayError>> + Send;
}

/// Progress of the last memo request, for display next to the memo field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MemoStatus {
    #[default]
    Idle,
    Generating,
    Generated,
    Failed,
}

impl MemoStatus {
    pub fn message(&self) -> &'static str {
        match self {
            MemoStatus::Idle => "",
            MemoStatus::Generating => "Generating memo...",
            MemoStatus::Generated => "Memo generated!",
            MemoStatus::Failed => "AI failed :(",
        }
    }
}

/// Describe the payment for the text model.
pub fn memo_context(amount: &str, symbol: Option<&str>, recipient: &str) -> String {
    format!(
        "A payment of {amount} {} to {recipient}",
        symbol.unwrap_or("crypto")
    )
}

pub fn memo_prompt(context: &str) -> String {
    format!(
        "Generate a short, witty, or funny memo for a crypto payment. The context is: '{context}'. \
         Keep it under 10 words. Examples: \"For the pizza crusade\", \"Avocado toast fund\", \"To the moon!\"."
    )
}

/// Trim model output and strip quote characters.
pub fn clean_memo(raw: &str) -> String {
    raw.trim().chars().filter(|c| *c != '"' && *c != '\'').collect()
}
