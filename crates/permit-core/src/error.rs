//! Error taxonomy for the permit flow.
//!
//! Collaborator errors from the wallet, chain and relay crates are folded
//! into [`PermitError`] at this boundary. Terminal relay statuses such as
//! `FAILED` or `EXPIRED` are outcomes of the submission, not errors, and are
//! reported through the tracker phase instead.

use permit_chain::ChainError;
use permit_types::UnitsError;
use permit_wallet::WalletError;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PermitError {
	#[error("No wallet session; connect a wallet first")]
	NoWalletSession,
	#[error("Failed to read chain state: {0}")]
	ChainRead(String),
	#[error("Signature request rejected by user")]
	UserRejected,
	#[error("Wallet error: {0}")]
	Wallet(String),
	#[error("Malformed signature: {0}")]
	MalformedSignature(String),
	#[error("Permit submission failed: {0}")]
	Submission(String),
	/// Transient; polling keeps going until its retry budget runs out.
	#[error("Status polling failed: {0}")]
	PollingTransport(String),
	#[error("Failed to fetch relay configuration: {0}")]
	RelayConfig(String),
	#[error("A permit signature is already being requested")]
	SigningInProgress,
	#[error("Unsupported coin: {0}")]
	UnsupportedCoin(String),
	#[error("Invalid amount: {0}")]
	InvalidAmount(String),
	#[error("Invalid request: {0}")]
	InvalidRequest(String),
	#[error("Permit flow was reset")]
	Reset,
}

impl From<WalletError> for PermitError {
	fn from(err: WalletError) -> Self {
		match err {
			WalletError::NotConnected => PermitError::NoWalletSession,
			WalletError::UserRejected => PermitError::UserRejected,
			other => PermitError::Wallet(other.to_string()),
		}
	}
}

impl From<ChainError> for PermitError {
	fn from(err: ChainError) -> Self {
		PermitError::ChainRead(err.to_string())
	}
}

impl From<UnitsError> for PermitError {
	fn from(err: UnitsError) -> Self {
		PermitError::InvalidAmount(err.to_string())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_wallet_error_mapping() {
		assert_eq!(
			PermitError::from(WalletError::NotConnected),
			PermitError::NoWalletSession
		);
		assert_eq!(
			PermitError::from(WalletError::UserRejected),
			PermitError::UserRejected
		);
		assert!(matches!(
			PermitError::from(WalletError::SigningFailed("device locked".into())),
			PermitError::Wallet(msg) if msg.contains("device locked")
		));
	}

	#[test]
	fn test_chain_timeout_is_chain_read() {
		let err = PermitError::from(ChainError::Timeout(30));
		assert_eq!(err.to_string(), "Failed to read chain state: RPC call timed out after 30s");
	}
}
