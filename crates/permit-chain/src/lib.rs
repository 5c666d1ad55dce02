//! Chain read module for the permit workspace.
//!
//! The only on-chain state a permit needs is the owner's ERC-2612 replay
//! counter. Reads are never retried here; a failure is reported to the caller
//! and the caller decides what to do.

use async_trait::async_trait;
use permit_types::{Address, U256};
use thiserror::Error;

/// Re-export implementations
pub mod implementations {
	pub mod evm {
		pub mod alloy;
	}
}

/// Errors that can occur while reading chain state.
#[derive(Debug, Error)]
pub enum ChainError {
	/// The RPC endpoint rejected or failed the call.
	#[error("RPC error: {0}")]
	Rpc(String),
	/// The call did not complete within the configured timeout.
	#[error("RPC call timed out after {0}s")]
	Timeout(u64),
	/// The call returned data that does not decode as the expected type.
	#[error("Decode error: {0}")]
	Decode(String),
	/// The provider could not be constructed.
	#[error("Invalid RPC URL: {0}")]
	InvalidUrl(String),
}

/// Trait defining read access to permit-capable token contracts.
#[async_trait]
pub trait ChainReader: Send + Sync {
	/// Reads `nonces(owner)` from the token contract at `token`.
	async fn read_nonce(&self, token: Address, owner: Address) -> Result<U256, ChainError>;
}
