//! 18-decimal fixed-point conversion between display strings and wei

use ethers_core::types::U256;

/// Decimal places of every token the client handles
pub const DECIMALS: usize = 18;

/// Errors produced when parsing a user-entered amount
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AmountError {
    #[error("amount is empty")]
    Empty,
    #[error("not a decimal amount: {0:?}")]
    Malformed(String),
    #[error("amount does not fit in 256 bits: {0}")]
    Overflow(String),
}

/// Parse a decimal string into smallest units (value × 10^18).
///
/// Digits past the 18th fractional place are truncated, never rounded.
/// Accepts `"1"`, `"1.5"`, `".5"` and `"5."`; rejects signs, exponents and
/// anything that is not plain digits around at most one dot.
pub fn parse_units(input: &str) -> Result<U256, AmountError> {
    let s = input.trim();
    if s.is_empty() {
        return Err(AmountError::Empty);
    }

    let (int_part, frac_part) = s.split_once('.').unwrap_or((s, ""));
    let all_digits = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
    let empty = int_part.is_empty() && frac_part.is_empty();
    if empty || !all_digits(int_part) || !all_digits(frac_part) {
        return Err(AmountError::Malformed(s.to_string()));
    }

    let frac: String = frac_part.chars().take(DECIMALS).collect();
    let digits = format!("{}{:0<width$}", int_part, frac, width = DECIMALS);

    U256::from_dec_str(&digits).map_err(|_| AmountError::Overflow(s.to_string()))
}

/// Format smallest units as a decimal string.
///
/// Same shape as ethers' `formatEther`: trailing fractional zeros are
/// trimmed but at least one fractional digit is kept (`"1.0"`, `"0.5"`).
pub fn format_units(value: U256) -> String {
    let (int_part, frac_part) = value.div_mod(U256::exp10(DECIMALS));
    let frac = format!("{:0>width$}", frac_part.to_string(), width = DECIMALS);
    let frac = frac.trim_end_matches('0');

    if frac.is_empty() {
        format!("{}.0", int_part)
    } else {
        format!("{}.{}", int_part, frac)
    }
}
