//! Signature codec.
//!
//! Wallets return a 65-byte ECDSA signature as hex. Contracts take it apart
//! as `r` (bytes 0..32), `s` (bytes 32..64) and `v` (byte 64).

use crate::PermitError;
use permit_types::{with_0x_prefix, Bytes, SignatureComponents, B256};

const SIGNATURE_LEN: usize = 65;

/// Splits a `0x`-prefixed 65-byte signature into its components.
///
/// `v` is kept exactly as the wallet produced it; see
/// [`SignatureComponents::normalized_v`] for the 27/28 form.
pub fn decompose(signature_hex: &str) -> Result<SignatureComponents, PermitError> {
	let hex_body = signature_hex.strip_prefix("0x").ok_or_else(|| {
		PermitError::MalformedSignature("signature must start with 0x".to_string())
	})?;

	if hex_body.len() != SIGNATURE_LEN * 2 {
		return Err(PermitError::MalformedSignature(format!(
			"expected {} hex characters, got {}",
			SIGNATURE_LEN * 2,
			hex_body.len()
		)));
	}

	let bytes = hex::decode(hex_body)
		.map_err(|e| PermitError::MalformedSignature(format!("invalid hex: {}", e)))?;

	Ok(SignatureComponents {
		r: B256::from_slice(&bytes[..32]),
		s: B256::from_slice(&bytes[32..64]),
		v: bytes[64],
		signature: Bytes::from(bytes),
	})
}

/// Reassembles `r ++ s ++ v` as `0x`-prefixed hex.
pub fn compose(components: &SignatureComponents) -> String {
	with_0x_prefix(&hex::encode(components.to_bytes()))
}
