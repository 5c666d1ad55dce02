//! Permit data model.
//!
//! A [`PermitRequest`] is what a caller asks for. Resolving it against chain
//! state yields a [`ResolvedPermitMessage`]; signing that message and splitting
//! the signature yields [`SignatureComponents`]. Together they form the
//! [`PermitResult`] handed to the relay.

use crate::relay::u256_serde;
use alloy_primitives::{Address, Bytes, B256, U256};
use serde::{Deserialize, Serialize};

/// A caller's request to authorize a spender.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermitRequest {
	/// Human-readable token amount, e.g. "10" or "1.5".
	pub amount: String,
	/// Validity window in seconds, counted from the moment the nonce is read.
	pub duration_seconds: u64,
	/// Address allowed to move the tokens.
	pub spender: Address,
	/// Relay-side token identifier, e.g. `USDC_ERC20`.
	pub coin: String,
}

/// The ERC-2612 `Permit` payload after nonce and deadline resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedPermitMessage {
	pub owner: Address,
	pub spender: Address,
	/// Amount in the token's smallest unit.
	#[serde(with = "u256_serde")]
	pub value: U256,
	#[serde(with = "u256_serde")]
	pub nonce: U256,
	/// Unix timestamp in seconds.
	#[serde(with = "u256_serde")]
	pub deadline: U256,
}

/// A 65-byte ECDSA signature split into its (r, s, v) parts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureComponents {
	pub r: B256,
	pub s: B256,
	pub v: u8,
	/// The signature exactly as the wallet returned it.
	pub signature: Bytes,
}

impl SignatureComponents {
	/// Reassembles `r ++ s ++ v`.
	pub fn to_bytes(&self) -> [u8; 65] {
		let mut out = [0u8; 65];
		out[..32].copy_from_slice(self.r.as_slice());
		out[32..64].copy_from_slice(self.s.as_slice());
		out[64] = self.v;
		out
	}

	/// Returns `v` in the legacy 27/28 form expected by `ecrecover`.
	///
	/// Wallets that emit a bare recovery id (0 or 1) are shifted by 27; any
	/// other value is returned unchanged.
	pub fn normalized_v(&self) -> u8 {
		match self.v {
			0 | 1 => self.v + 27,
			v => v,
		}
	}
}

/// The full signed artifact: resolved message plus signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermitResult {
	/// Relay-side token identifier the permit was produced for.
	pub coin: String,
	#[serde(flatten)]
	pub message: ResolvedPermitMessage,
	#[serde(flatten)]
	pub signature: SignatureComponents,
}

#[cfg(test)]
mod tests {
	use super::*;
	use alloy_primitives::address;

	fn sample_result() -> PermitResult {
		PermitResult {
			coin: "USDC_ERC20".to_string(),
			message: ResolvedPermitMessage {
				owner: address!("1111111111111111111111111111111111111111"),
				spender: address!("2222222222222222222222222222222222222222"),
				value: U256::from(1_000_000u64),
				nonce: U256::from(5u64),
				deadline: U256::from(1_700_003_600u64),
			},
			signature: SignatureComponents {
				r: B256::repeat_byte(0xaa),
				s: B256::repeat_byte(0xbb),
				v: 27,
				signature: Bytes::from(vec![0u8; 65]),
			},
		}
	}

	#[test]
	fn test_permit_result_serializes_flat_with_decimal_strings() {
		let json = serde_json::to_value(sample_result()).unwrap();

		assert_eq!(json["coin"], "USDC_ERC20");
		assert_eq!(json["value"], "1000000");
		assert_eq!(json["nonce"], "5");
		assert_eq!(json["deadline"], "1700003600");
		assert_eq!(json["v"], 27);
		assert_eq!(
			json["owner"],
			"0x1111111111111111111111111111111111111111"
		);
		assert!(json.get("message").is_none());
	}

	#[test]
	fn test_permit_result_json_round_trip() {
		let original = sample_result();
		let json = serde_json::to_string(&original).unwrap();
		let parsed: PermitResult = serde_json::from_str(&json).unwrap();
		assert_eq!(parsed, original);
	}

	#[test]
	fn test_normalized_v() {
		let mut components = sample_result().signature;
		components.v = 0;
		assert_eq!(components.normalized_v(), 27);
		components.v = 1;
		assert_eq!(components.normalized_v(), 28);
		components.v = 28;
		assert_eq!(components.normalized_v(), 28);
	}

	#[test]
	fn test_permit_request_uses_camel_case() {
		let request: PermitRequest = serde_json::from_str(
			r#"{"amount":"1","durationSeconds":3600,"spender":"0x2222222222222222222222222222222222222222","coin":"USDC_ERC20"}"#,
		)
		.unwrap();
		assert_eq!(request.duration_seconds, 3600);
		assert_eq!(request.amount, "1");
	}
}
