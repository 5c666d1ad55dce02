//! String formatting utilities.
//!
//! Hex prefix handling, shortened identifiers for log lines and token
//! amounts rendered with their decimal point.

use alloy_primitives::U256;

/// Shortens an identifier for log output: first 8 characters then "..".
pub fn truncate_id(id: &str) -> String {
	match id.char_indices().nth(8) {
		Some((idx, _)) => format!("{}..", &id[..idx]),
		None => id.to_string(),
	}
}

/// Adds "0x" unless the string already carries a prefix.
pub fn with_0x_prefix(hex_str: &str) -> String {
	if hex_str.starts_with("0x") || hex_str.starts_with("0X") {
		hex_str.to_string()
	} else {
		format!("0x{}", hex_str)
	}
}

/// Strips a leading "0x" or "0X" if present.
pub fn without_0x_prefix(hex_str: &str) -> &str {
	hex_str
		.strip_prefix("0x")
		.or_else(|| hex_str.strip_prefix("0X"))
		.unwrap_or(hex_str)
}

/// Renders a raw on-chain amount with its decimal point, trimming trailing zeros.
///
/// `format_token_amount(U256::from(1_500_000), 6)` gives `"1.5"`.
pub fn format_token_amount(amount: U256, decimals: u8) -> String {
	let digits = amount.to_string();
	if decimals == 0 {
		return digits;
	}

	let places = decimals as usize;
	let (integer_part, fraction_part) = if digits.len() <= places {
		("0".to_string(), format!("{:0>width$}", digits, width = places))
	} else {
		let split = digits.len() - places;
		(digits[..split].to_string(), digits[split..].to_string())
	};

	let fraction_trimmed = fraction_part.trim_end_matches('0');
	if fraction_trimmed.is_empty() {
		integer_part
	} else {
		format!("{}.{}", integer_part, fraction_trimmed)
	}
}
