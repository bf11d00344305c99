//! Decimal amount <-> minor unit conversion.
//!
//! Integer-only: the decimal string is split on the point and each part is
//! scaled separately. No f64 anywhere in the pipeline.

use alloy::primitives::U256;

/// Errors converting a decimal amount string into minor units.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AmountError {
    #[error("amount is empty")]
    Empty,

    #[error("invalid amount '{0}'")]
    Invalid(String),

    #[error("amount '{amount}' has more than {decimals} decimal places")]
    TooPrecise { amount: String, decimals: u8 },

    #[error("amount '{0}' is too large")]
    Overflow(String),
}

/// Keep only the characters an amount field accepts (digits and `.`).
pub fn sanitize_amount_input(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect()
}

/// Convert a decimal string (`"1.5"`) into minor units for a currency with
/// `decimals` places. Trailing fractional zeros beyond `decimals` are
/// accepted; any other extra precision is rejected rather than truncated.
pub fn parse_units(amount: &str, decimals: u8) -> Result<U256, AmountError> {
    let amount = amount.trim();
    if amount.is_empty() {
        return Err(AmountError::Empty);
    }

    let (integer_part, fractional_part) = amount.split_once('.').unwrap_or((amount, ""));

    let all_digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
    if (integer_part.is_empty() && fractional_part.is_empty())
        || !all_digits(integer_part)
        || !all_digits(fractional_part)
    {
        return Err(AmountError::Invalid(amount.to_string()));
    }

    let fractional_part = fractional_part.trim_end_matches('0');
    let width = decimals as usize;
    if fractional_part.len() > width {
        return Err(AmountError::TooPrecise {
            amount: amount.to_string(),
            decimals,
        });
    }

    let overflow = || AmountError::Overflow(amount.to_string());

    let multiplier = U256::from(10u8)
        .checked_pow(U256::from(decimals))
        .ok_or_else(overflow)?;

    let integer = if integer_part.is_empty() {
        U256::ZERO
    } else {
        integer_part.parse::<U256>().map_err(|_| overflow())?
    };

    let fractional = if fractional_part.is_empty() {
        U256::ZERO
    } else {
        // Right-pad to exactly `decimals` digits so the part is already scaled.
        format!("{fractional_part:0<width$}")
            .parse::<U256>()
            .map_err(|_| overflow())?
    };

    integer
        .checked_mul(multiplier)
        .and_then(|scaled| scaled.checked_add(fractional))
        .ok_or_else(overflow)
}

/// Render minor units as a decimal string (`1500000000000000000` at 18
/// decimals renders as `"1.5"`, whole amounts as `"2.0"`).
pub fn format_units(value: U256, decimals: u8) -> String {
    let digits = value.to_string();
    let width = decimals as usize;
    if width == 0 {
        return digits;
    }

    let padded = format!("{digits:0>len$}", len = width + 1);
    let (integer, fractional) = padded.split_at(padded.len() - width);
    let fractional = fractional.trim_end_matches('0');
    if fractional.is_empty() {
        format!("{integer}.0")
    } else {
        format!("{integer}.{fractional}")
    }
}
