//! Local private-key wallet.
//!
//! Stands in for a browser wallet during development and in the CLI. The
//! session is explicit: nothing can be signed until [`LocalWallet::connect`]
//! is called, and [`LocalWallet::disconnect`] ends the session again. An
//! optional approval hook plays the role of the wallet's confirmation popup.

use crate::{WalletError, WalletInterface};
use alloy_signer::Signer;
use alloy_signer_local::PrivateKeySigner;
use async_trait::async_trait;
use permit_types::{truncate_id, with_0x_prefix, Address, SecretString, TypedPermitMessage};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Decides whether a signature request may proceed. Runs on a blocking
/// thread, so it may prompt on a terminal.
pub type ApprovalHook = Arc<dyn Fn(&TypedPermitMessage) -> bool + Send + Sync>;

/// Wallet backed by an in-memory private key.
pub struct LocalWallet {
	signer: PrivateKeySigner,
	connected: AtomicBool,
	approval: Option<ApprovalHook>,
}

impl LocalWallet {
	/// Creates a disconnected wallet from a hex private key (with or without 0x).
	pub fn new(private_key: &SecretString) -> Result<Self, WalletError> {
		let signer = private_key.with_exposed(|key| {
			key.trim()
				.parse::<PrivateKeySigner>()
				.map_err(|e| WalletError::InvalidKey(format!("Invalid private key: {}", e)))
		})?;

		Ok(Self {
			signer,
			connected: AtomicBool::new(false),
			approval: None,
		})
	}

	/// Requires every signature request to pass `hook` first.
	pub fn with_approval(mut self, hook: ApprovalHook) -> Self {
		self.approval = Some(hook);
		self
	}

	/// Address controlled by the key, regardless of session state.
	pub fn address(&self) -> Address {
		self.signer.address()
	}

	/// Opens the session and returns its address.
	pub fn connect(&self) -> Address {
		if !self.connected.swap(true, Ordering::SeqCst) {
			tracing::info!(address = %self.address(), "Wallet connected");
		}
		self.address()
	}

	/// Ends the session.
	pub fn disconnect(&self) {
		if self.connected.swap(false, Ordering::SeqCst) {
			tracing::info!(address = %self.address(), "Wallet disconnected");
		}
	}

	pub fn is_connected(&self) -> bool {
		self.connected.load(Ordering::SeqCst)
	}

	async fn approve(&self, message: &TypedPermitMessage) -> Result<(), WalletError> {
		let Some(hook) = self.approval.clone() else {
			return Ok(());
		};

		let message = message.clone();
		let approved = tokio::task::spawn_blocking(move || hook(&message))
			.await
			.map_err(|e| WalletError::SigningFailed(format!("Approval prompt failed: {}", e)))?;

		if approved {
			Ok(())
		} else {
			Err(WalletError::UserRejected)
		}
	}
}

#[async_trait]
impl WalletInterface for LocalWallet {
	async fn active_address(&self) -> Option<Address> {
		self.is_connected().then(|| self.address())
	}

	async fn sign_typed_data(&self, message: &TypedPermitMessage) -> Result<String, WalletError> {
		if !self.is_connected() {
			return Err(WalletError::NotConnected);
		}
		if message.message.owner != self.address() {
			return Err(WalletError::SigningFailed(format!(
				"Permit owner {} does not match wallet address {}",
				message.message.owner,
				self.address()
			)));
		}

		self.approve(message).await?;

		let digest = message.signing_hash();
		let signature = self
			.signer
			.sign_hash(&digest)
			.await
			.map_err(|e| WalletError::SigningFailed(e.to_string()))?;

		let encoded = with_0x_prefix(&hex::encode(signature.as_bytes()));
		tracing::debug!(signature = %truncate_id(&encoded), "Signed permit digest");
		Ok(encoded)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use alloy_primitives::{address, PrimitiveSignature, U256};
	use permit_types::{PermitDomain, ResolvedPermitMessage};

	// Well-known development key (anvil account 0).
	const TEST_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
	const TEST_ADDRESS: Address = address!("f39Fd6e51aad88F6F4ce6aB8827279cffFb92266");

	fn typed_message(owner: Address) -> TypedPermitMessage {
		TypedPermitMessage {
			domain: PermitDomain {
				name: "USD Coin".to_string(),
				version: "2".to_string(),
				chain_id: 1,
				verifying_contract: address!("A0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48"),
			},
			message: ResolvedPermitMessage {
				owner,
				spender: address!("2222222222222222222222222222222222222222"),
				value: U256::from(1_000_000u64),
				nonce: U256::from(5u64),
				deadline: U256::from(1_700_003_600u64),
			},
		}
	}

	fn wallet() -> LocalWallet {
		LocalWallet::new(&SecretString::from(TEST_KEY)).unwrap()
	}

	#[tokio::test]
	async fn test_session_lifecycle() {
		let wallet = wallet();
		assert_eq!(wallet.address(), TEST_ADDRESS);
		assert_eq!(wallet.active_address().await, None);

		assert_eq!(wallet.connect(), TEST_ADDRESS);
		assert_eq!(wallet.active_address().await, Some(TEST_ADDRESS));

		wallet.disconnect();
		assert_eq!(wallet.active_address().await, None);
	}

	#[tokio::test]
	async fn test_signature_recovers_to_wallet_address() {
		let wallet = wallet();
		wallet.connect();
		let message = typed_message(TEST_ADDRESS);

		let signature_hex = wallet.sign_typed_data(&message).await.unwrap();
		assert!(signature_hex.starts_with("0x"));
		assert_eq!(signature_hex.len(), 132);

		let bytes = hex::decode(&signature_hex[2..]).unwrap();
		assert!(bytes[64] == 27 || bytes[64] == 28);

		let signature = PrimitiveSignature::try_from(bytes.as_slice()).unwrap();
		let recovered = signature
			.recover_address_from_prehash(&message.signing_hash())
			.unwrap();
		assert_eq!(recovered, TEST_ADDRESS);
	}

	#[tokio::test]
	async fn test_sign_requires_session() {
		let wallet = wallet();
		let result = wallet.sign_typed_data(&typed_message(TEST_ADDRESS)).await;
		assert!(matches!(result, Err(WalletError::NotConnected)));
	}

	#[tokio::test]
	async fn test_declined_approval_is_user_rejection() {
		let wallet = wallet().with_approval(Arc::new(|_| false));
		wallet.connect();

		let result = wallet.sign_typed_data(&typed_message(TEST_ADDRESS)).await;
		assert!(matches!(result, Err(WalletError::UserRejected)));
	}

	#[tokio::test]
	async fn test_approval_hook_sees_the_message() {
		let wallet = wallet().with_approval(Arc::new(|message: &TypedPermitMessage| {
			message.message.value == U256::from(1_000_000u64)
		}));
		wallet.connect();

		assert!(wallet
			.sign_typed_data(&typed_message(TEST_ADDRESS))
			.await
			.is_ok());
	}

	#[tokio::test]
	async fn test_rejects_foreign_owner() {
		let wallet = wallet();
		wallet.connect();

		let foreign = address!("1111111111111111111111111111111111111111");
		let result = wallet.sign_typed_data(&typed_message(foreign)).await;
		assert!(matches!(result, Err(WalletError::SigningFailed(_))));
	}

	#[test]
	fn test_invalid_key() {
		let result = LocalWallet::new(&SecretString::from("0xnot-a-key"));
		assert!(matches!(result, Err(WalletError::InvalidKey(_))));
	}
}
