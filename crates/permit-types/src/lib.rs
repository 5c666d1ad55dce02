//! Common types module for the permit relay workspace.
//!
//! This module defines the data model shared by every permit crate: the
//! permit request a caller submits, the resolved EIP-712 message, the
//! decomposed signature, the relay wire types and token configuration.

/// EIP-712 domain and typed permit message encoding.
pub mod eip712;
/// Permit request, resolved message, signature components and results.
pub mod permit;
/// Request/response types for the relay HTTP API.
pub mod relay;
/// Secure string type for tokens and private keys.
pub mod secret_string;
/// Token catalogue configuration types.
pub mod tokens;
/// Utility functions for formatting and unit conversion.
pub mod utils;

pub use alloy_primitives::{Address, Bytes, B256, U256};
pub use eip712::{PermitDomain, TypedPermitMessage, DOMAIN_TYPE, PERMIT_PRIMARY_TYPE, PERMIT_TYPE};
pub use permit::*;
pub use relay::*;
pub use secret_string::SecretString;
pub use tokens::{default_tokens, TokenConfig, TokensConfig, USDC_ERC20};
pub use utils::{
	current_timestamp, format_token_amount, parse_token_amount, truncate_id, with_0x_prefix,
	without_0x_prefix, UnitsError,
};
