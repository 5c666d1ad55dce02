//! EIP-712 encoding for ERC-2612 permits.
//!
//! These helpers provide:
//! - Domain separator computation (name, version, chainId, verifyingContract)
//! - `Permit` struct hashing with the canonical field order
//! - Final digest computation (0x1901 || domainSeparator || structHash)
//! - The `eth_signTypedData_v4` JSON rendering handed to external wallets

use crate::permit::ResolvedPermitMessage;
use alloy_primitives::{keccak256, Address, B256, U256};
use serde::{Deserialize, Serialize};
use serde_json::json;

pub const DOMAIN_TYPE: &str =
	"EIP712Domain(string name,string version,uint256 chainId,address verifyingContract)";
pub const PERMIT_TYPE: &str =
	"Permit(address owner,address spender,uint256 value,uint256 nonce,uint256 deadline)";
pub const PERMIT_PRIMARY_TYPE: &str = "Permit";

/// The domain a permit signature is bound to.
///
/// Binding name, version, chain and token contract prevents a signature for
/// one token or chain from being replayed against another.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermitDomain {
	pub name: String,
	pub version: String,
	pub chain_id: u64,
	pub verifying_contract: Address,
}

impl PermitDomain {
	/// keccak256(abi.encode(typeHash, nameHash, versionHash, chainId, verifyingContract))
	pub fn separator(&self) -> B256 {
		let mut enc = Eip712AbiEncoder::new();
		enc.push_b256(&keccak256(DOMAIN_TYPE.as_bytes()));
		enc.push_b256(&keccak256(self.name.as_bytes()));
		enc.push_b256(&keccak256(self.version.as_bytes()));
		enc.push_u256(U256::from(self.chain_id));
		enc.push_address(&self.verifying_contract);
		keccak256(enc.finish())
	}
}

/// A permit message together with the domain it will be signed under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypedPermitMessage {
	pub domain: PermitDomain,
	pub message: ResolvedPermitMessage,
}

impl TypedPermitMessage {
	/// Hash of the `Permit` struct. Field order is fixed by [`PERMIT_TYPE`].
	pub fn struct_hash(&self) -> B256 {
		let m = &self.message;
		let mut enc = Eip712AbiEncoder::new();
		enc.push_b256(&keccak256(PERMIT_TYPE.as_bytes()));
		enc.push_address(&m.owner);
		enc.push_address(&m.spender);
		enc.push_u256(m.value);
		enc.push_u256(m.nonce);
		enc.push_u256(m.deadline);
		keccak256(enc.finish())
	}

	/// The digest a wallet signs for this message.
	pub fn signing_hash(&self) -> B256 {
		compute_final_digest(&self.domain.separator(), &self.struct_hash())
	}

	/// Renders the message in the shape `eth_signTypedData_v4` expects.
	pub fn to_typed_data_json(&self) -> serde_json::Value {
		let m = &self.message;
		json!({
			"types": {
				"EIP712Domain": [
					{ "name": "name", "type": "string" },
					{ "name": "version", "type": "string" },
					{ "name": "chainId", "type": "uint256" },
					{ "name": "verifyingContract", "type": "address" },
				],
				"Permit": [
					{ "name": "owner", "type": "address" },
					{ "name": "spender", "type": "address" },
					{ "name": "value", "type": "uint256" },
					{ "name": "nonce", "type": "uint256" },
					{ "name": "deadline", "type": "uint256" },
				],
			},
			"primaryType": PERMIT_PRIMARY_TYPE,
			"domain": {
				"name": self.domain.name,
				"version": self.domain.version,
				"chainId": self.domain.chain_id,
				"verifyingContract": self.domain.verifying_contract.to_checksum(None),
			},
			"message": {
				"owner": m.owner.to_checksum(None),
				"spender": m.spender.to_checksum(None),
				"value": m.value.to_string(),
				"nonce": m.nonce.to_string(),
				"deadline": m.deadline.to_string(),
			},
		})
	}
}

/// Compute the final EIP-712 digest: keccak256(0x1901 || domainHash || structHash).
pub fn compute_final_digest(domain_hash: &B256, struct_hash: &B256) -> B256 {
	let mut out = Vec::with_capacity(2 + 32 + 32);
	out.push(0x19);
	out.push(0x01);
	out.extend_from_slice(domain_hash.as_slice());
	out.extend_from_slice(struct_hash.as_slice());
	keccak256(out)
}

/// Minimal ABI encoder for the static field types a permit uses.
#[derive(Default)]
pub struct Eip712AbiEncoder {
	buf: Vec<u8>,
}

impl Eip712AbiEncoder {
	pub fn new() -> Self {
		Self { buf: Vec::with_capacity(32 * 6) }
	}

	pub fn push_b256(&mut self, v: &B256) {
		self.buf.extend_from_slice(v.as_slice());
	}

	pub fn push_address(&mut self, addr: &Address) {
		let mut word = [0u8; 32];
		word[12..].copy_from_slice(addr.as_slice());
		self.buf.extend_from_slice(&word);
	}

	pub fn push_u256(&mut self, v: U256) {
		self.buf.extend_from_slice(&v.to_be_bytes::<32>());
	}

	pub fn finish(self) -> Vec<u8> {
		self.buf
	}
}
