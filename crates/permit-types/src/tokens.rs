//! Token catalogue types.
//!
//! Each permit-capable token is keyed by the relay's coin identifier and
//! carries what the signer needs: the contract address, decimal precision and
//! the EIP-712 domain name/version the contract was deployed with.

use alloy_primitives::{address, Address};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Relay coin identifier for USDC on Ethereum mainnet.
pub const USDC_ERC20: &str = "USDC_ERC20";

/// Configuration for one permit-capable ERC-20 token.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct TokenConfig {
	pub address: Address,
	pub symbol: String,
	pub decimals: u8,
	/// EIP-712 domain `name` of the token contract.
	pub domain_name: String,
	/// EIP-712 domain `version` of the token contract.
	#[serde(default = "default_domain_version")]
	pub domain_version: String,
}

fn default_domain_version() -> String {
	"1".to_string()
}

/// Coin identifier → token configuration.
pub type TokensConfig = HashMap<String, TokenConfig>;

/// Catalogue used when the configuration declares no tokens.
pub fn default_tokens() -> TokensConfig {
	let mut tokens = HashMap::new();
	tokens.insert(
		USDC_ERC20.to_string(),
		TokenConfig {
			address: address!("A0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48"),
			symbol: "USDC".to_string(),
			decimals: 6,
			domain_name: "USD Coin".to_string(),
			domain_version: "2".to_string(),
		},
	);
	tokens
}
