//! Typed-message construction.
//!
//! The domain binds a signature to one token contract on one chain; the
//! message carries the five `Permit` fields in their canonical order.

use permit_types::{
	Address, PermitDomain, ResolvedPermitMessage, TokenConfig, TypedPermitMessage, U256,
};

/// EIP-712 domain of `token` on `chain_id`.
pub fn token_domain(token: &TokenConfig, chain_id: u64) -> PermitDomain {
	PermitDomain {
		name: token.domain_name.clone(),
		version: token.domain_version.clone(),
		chain_id,
		verifying_contract: token.address,
	}
}

/// Assembles the typed `Permit` message.
pub fn build(
	domain: PermitDomain,
	owner: Address,
	spender: Address,
	value: U256,
	nonce: U256,
	deadline: U256,
) -> TypedPermitMessage {
	TypedPermitMessage {
		domain,
		message: ResolvedPermitMessage {
			owner,
			spender,
			value,
			nonce,
			deadline,
		},
	}
}
