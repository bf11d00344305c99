//! The editable draft and the immutable snapshot taken at confirmation.

use alloy::primitives::{Address, Bytes, U256};

use crate::amount::{format_units, parse_units, sanitize_amount_input};
use crate::chains::Chain;
use crate::error::PayError;
use crate::history::HistoryScope;
use crate::wallet::TxRequest;

/// Form fields as the user is typing them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransactionDraft {
    recipient: String,
    amount: String,
    memo: String,
}

impl TransactionDraft {
    pub fn new(recipient: &str, amount: &str, memo: &str) -> Self {
        let mut draft = Self::default();
        draft.set_recipient(recipient);
        draft.set_amount(amount);
        draft.set_memo(memo);
        draft
    }

    pub fn recipient(&self) -> &str {
        &self.recipient
    }

    pub fn amount(&self) -> &str {
        &self.amount
    }

    pub fn memo(&self) -> &str {
        &self.memo
    }

    pub fn set_recipient(&mut self, recipient: &str) {
        self.recipient = recipient.trim().to_string();
    }

    /// Non-numeric characters are dropped as they are entered.
    pub fn set_amount(&mut self, amount: &str) {
        self.amount = sanitize_amount_input(amount);
    }

    pub fn set_memo(&mut self, memo: &str) {
        self.memo = memo.to_string();
    }

    /// Both required fields are filled in.
    pub fn is_complete(&self) -> bool {
        !self.recipient.is_empty() && !self.amount.is_empty()
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

/// Snapshot of a draft the user is reviewing. Never changes once taken.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmedTransaction {
    recipient: String,
    to: Address,
    amount: String,
    value: U256,
    memo: Option<String>,
    scope: HistoryScope,
    chain: &'static Chain,
}

impl ConfirmedTransaction {
    /// Validate `draft` against the active chain and take the snapshot.
    ///
    /// Nothing here touches the network.
    pub fn from_draft(
        draft: &TransactionDraft,
        account: Option<Address>,
        chain: Option<&'static Chain>,
    ) -> Result<Self, PayError> {
        if !draft.is_complete() {
            return Err(PayError::Validation(
                "recipient and amount are required".to_string(),
            ));
        }
        let chain = chain.ok_or(PayError::UnsupportedChain(None))?;
        let account = account.ok_or(PayError::ProviderUnavailable)?;

        let to: Address = draft.recipient.parse().map_err(|e| {
            PayError::Validation(format!("invalid recipient '{}': {e}", draft.recipient))
        })?;
        let value = parse_units(&draft.amount, chain.native_currency.decimals)?;
        let memo = Some(draft.memo.clone()).filter(|m| !m.is_empty());

        Ok(Self {
            recipient: draft.recipient.clone(),
            to,
            amount: draft.amount.clone(),
            value,
            memo,
            scope: HistoryScope::new(account, chain.id),
            chain,
        })
    }

    /// Recipient as the user typed it.
    pub fn recipient(&self) -> &str {
        &self.recipient
    }

    pub fn to(&self) -> Address {
        self.to
    }

    /// Decimal amount as the user typed it.
    pub fn amount(&self) -> &str {
        &self.amount
    }

    /// Amount in minor units.
    pub fn value(&self) -> U256 {
        self.value
    }

    /// The parsed value rendered back in whole units, e.g. `"1.50"` as `"1.5"`.
    pub fn formatted_value(&self) -> String {
        format_units(self.value, self.chain.native_currency.decimals)
    }

    pub fn memo(&self) -> Option<&str> {
        self.memo.as_deref()
    }

    pub fn chain(&self) -> &'static Chain {
        self.chain
    }

    /// The (account, chain) pair the transaction belongs to.
    pub fn scope(&self) -> &HistoryScope {
        &self.scope
    }

    /// Transfer parameters for the wallet; the memo travels as UTF-8 bytes.
    pub fn to_request(&self) -> TxRequest {
        TxRequest {
            chain_id: self.chain.id,
            to: self.to,
            value: self.value,
            data: self
                .memo
                .as_ref()
                .map(|m| Bytes::copy_from_slice(m.as_bytes())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chains::{find_chain, SEPOLIA_CHAIN_ID};

    const RECIPIENT: &str = "0xabcdef0123456789abcdef0123456789abcdef01";

    fn account() -> Option<Address> {
        Some(Address::repeat_byte(0x11))
    }

    #[test]
    fn test_amount_input_sanitized() {
        let mut draft = TransactionDraft::default();
        draft.set_amount("1,5 ETH");
        assert_eq!(draft.amount(), "15");
        draft.set_amount("0.25");
        assert_eq!(draft.amount(), "0.25");
    }

    #[test]
    fn test_incomplete_draft_rejected() {
        let chain = find_chain(SEPOLIA_CHAIN_ID);
        let draft = TransactionDraft::new("", "1", "");
        let err = ConfirmedTransaction::from_draft(&draft, account(), chain).unwrap_err();
        assert!(matches!(err, PayError::Validation(_)));
        let draft = TransactionDraft::new(RECIPIENT, "", "");
        let err = ConfirmedTransaction::from_draft(&draft, account(), chain).unwrap_err();
        assert!(matches!(err, PayError::Validation(_)));
    }

    #[test]
    fn test_unsupported_chain_rejected() {
        let draft = TransactionDraft::new(RECIPIENT, "1", "");
        let err = ConfirmedTransaction::from_draft(&draft, account(), None).unwrap_err();
        assert!(matches!(err, PayError::UnsupportedChain(None)));
    }

    #[test]
    fn test_missing_account_rejected() {
        let draft = TransactionDraft::new(RECIPIENT, "1", "");
        let err = ConfirmedTransaction::from_draft(&draft, None, find_chain(SEPOLIA_CHAIN_ID))
            .unwrap_err();
        assert!(matches!(err, PayError::ProviderUnavailable));
    }

    #[test]
    fn test_bad_recipient_rejected() {
        let draft = TransactionDraft::new("0x1234", "1", "");
        let err = ConfirmedTransaction::from_draft(&draft, account(), find_chain(SEPOLIA_CHAIN_ID))
            .unwrap_err();
        assert!(matches!(err, PayError::Validation(_)));
    }

    #[test]
    fn test_snapshot_request() {
        let draft = TransactionDraft::new(RECIPIENT, "1.5", "For the pizza crusade");
        let tx = ConfirmedTransaction::from_draft(&draft, account(), find_chain(SEPOLIA_CHAIN_ID))
            .unwrap();

        let request = tx.to_request();
        assert_eq!(request.chain_id, SEPOLIA_CHAIN_ID);
        assert_eq!(request.to, RECIPIENT.parse::<Address>().unwrap());
        assert_eq!(
            request.value,
            U256::from(15u8) * U256::from(10u8).pow(U256::from(17u8))
        );
        assert_eq!(request.data.unwrap().to_vec(), b"For the pizza crusade".to_vec());
        assert_eq!(tx.scope().chain_id, SEPOLIA_CHAIN_ID);
    }

    #[test]
    fn test_empty_memo_has_no_data() {
        let draft = TransactionDraft::new(RECIPIENT, "1", "");
        let tx = ConfirmedTransaction::from_draft(&draft, account(), find_chain(SEPOLIA_CHAIN_ID))
            .unwrap();
        assert!(tx.memo().is_none());
        assert!(tx.to_request().data.is_none());
    }

    #[test]
    fn test_formatted_value_normalizes_input() {
        let draft = TransactionDraft::new(RECIPIENT, "1.50", "");
        let tx = ConfirmedTransaction::from_draft(&draft, account(), find_chain(SEPOLIA_CHAIN_ID))
            .unwrap();
        assert_eq!(tx.amount(), "1.50");
        assert_eq!(tx.formatted_value(), "1.5");

        let draft = TransactionDraft::new(RECIPIENT, ".25", "");
        let tx = ConfirmedTransaction::from_draft(&draft, account(), find_chain(SEPOLIA_CHAIN_ID))
            .unwrap();
        assert_eq!(tx.formatted_value(), "0.25");
    }
}
