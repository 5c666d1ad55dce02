//! Wallet session module for the permit workspace.
//!
//! A wallet is whatever holds the owner's key: a browser extension, a
//! hardware device, or the local development signer shipped here. The rest of
//! the workspace only sees [`WalletInterface`], which exposes the active
//! session address and EIP-712 typed-data signing.

use async_trait::async_trait;
use permit_types::{Address, TypedPermitMessage};
use thiserror::Error;

/// Re-export implementations
pub mod implementations {
	pub mod local;
}

/// Errors that can occur during wallet operations.
#[derive(Debug, Error)]
pub enum WalletError {
	/// No authenticated session is available.
	#[error("Wallet not connected")]
	NotConnected,
	/// The holder declined the signature request.
	#[error("Signature request rejected by user")]
	UserRejected,
	/// The wallet accepted the request but failed to produce a signature.
	#[error("Signing failed: {0}")]
	SigningFailed(String),
	/// The configured key is invalid or malformed.
	#[error("Invalid key: {0}")]
	InvalidKey(String),
}

/// Trait defining the interface for wallet implementations.
///
/// Implementations must not retry a rejected request on their own; a
/// rejection is the holder's answer.
#[async_trait]
pub trait WalletInterface: Send + Sync {
	/// Address of the authenticated session, or `None` when disconnected.
	async fn active_address(&self) -> Option<Address>;

	/// Signs an EIP-712 permit and returns the 65-byte signature as
	/// `0x`-prefixed hex.
	async fn sign_typed_data(&self, message: &TypedPermitMessage) -> Result<String, WalletError>;
}
