//! Decimal amount parsing.
//!
//! Converts a human-readable amount such as `"10"` or `"0.25"` into the
//! token's smallest unit. Conversion is exact: an amount with more fractional
//! digits than the token supports is rejected instead of rounded.

use alloy_primitives::U256;
use thiserror::Error;

/// Errors produced while parsing a decimal token amount.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum UnitsError {
	#[error("Amount is empty")]
	Empty,
	#[error("Amount '{0}' is not a plain decimal number")]
	InvalidDigits(String),
	#[error("Amount '{amount}' has more than {decimals} fractional digits")]
	TooPrecise { amount: String, decimals: u8 },
	#[error("Amount '{0}' does not fit in uint256")]
	Overflow(String),
}

/// Parses `amount` into base units of a token with `decimals` precision.
pub fn parse_token_amount(amount: &str, decimals: u8) -> Result<U256, UnitsError> {
	let trimmed = amount.trim();
	if trimmed.is_empty() {
		return Err(UnitsError::Empty);
	}

	let (integer_part, fraction_part) = match trimmed.split_once('.') {
		Some((int, frac)) => (int, frac),
		None => (trimmed, ""),
	};

	let all_digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
	if (integer_part.is_empty() && fraction_part.is_empty())
		|| !all_digits(integer_part)
		|| !all_digits(fraction_part)
	{
		return Err(UnitsError::InvalidDigits(trimmed.to_string()));
	}

	// Trailing zeros carry no value, so "1.500000000" is fine for 6 decimals.
	let fraction_part = fraction_part.trim_end_matches('0');
	if fraction_part.len() > decimals as usize {
		return Err(UnitsError::TooPrecise {
			amount: trimmed.to_string(),
			decimals,
		});
	}

	let mut digits = String::with_capacity(integer_part.len() + decimals as usize);
	digits.push_str(integer_part);
	digits.push_str(fraction_part);
	digits.extend(std::iter::repeat('0').take(decimals as usize - fraction_part.len()));

	let digits = digits.trim_start_matches('0');
	if digits.is_empty() {
		return Ok(U256::ZERO);
	}
	U256::from_str_radix(digits, 10).map_err(|_| UnitsError::Overflow(trimmed.to_string()))
}
