//! Collaborator doubles shared by the unit tests.

use async_trait::async_trait;
use mockall::mock;
use permit_chain::{ChainError, ChainReader};
use permit_relay::{RelayError, RelayInterface};
use permit_types::{
	Address, Bytes, PayOrderRequest, PermitResult, PermitStatusResponse, RelayConfigResponse,
	RelayStatus, ResolvedPermitMessage, SignatureComponents, SubmitPermitRequest,
	SubmitPermitResponse, TypedPermitMessage, B256, U256,
};
use permit_wallet::{WalletError, WalletInterface};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use tokio::sync::Notify;

// anvil account 0
pub const TEST_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

mock! {
	pub Chain {}

	#[async_trait]
	impl ChainReader for Chain {
		async fn read_nonce(&self, token: Address, owner: Address) -> Result<U256, ChainError>;
	}
}

mock! {
	pub Relay {}

	#[async_trait]
	impl RelayInterface for Relay {
		async fn get_config(&self, coin: &str) -> Result<RelayConfigResponse, RelayError>;
		async fn submit_permit(
			&self,
			request: &SubmitPermitRequest,
		) -> Result<SubmitPermitResponse, RelayError>;
		async fn get_permit_status(&self, sn: &str) -> Result<PermitStatusResponse, RelayError>;
		async fn pay_order(&self, request: &PayOrderRequest) -> Result<serde_json::Value, RelayError>;
	}
}

/// What [`FakeWallet`] answers to a signature request.
#[derive(Clone)]
pub enum SignBehavior {
	/// A well-formed signature with v = 27.
	Valid,
	Raw(String),
	Reject,
	Fail,
	SessionLost,
}

/// Scriptable wallet that counts signature requests and can hold them open.
pub struct FakeWallet {
	address: Option<Address>,
	behavior: SignBehavior,
	gate: Option<Notify>,
	sign_calls: AtomicUsize,
	last_message: Mutex<Option<TypedPermitMessage>>,
}

impl FakeWallet {
	fn with(address: Option<Address>, behavior: SignBehavior, gated: bool) -> Self {
		Self {
			address,
			behavior,
			gate: gated.then(Notify::new),
			sign_calls: AtomicUsize::new(0),
			last_message: Mutex::new(None),
		}
	}

	pub fn connected(behavior: SignBehavior) -> Self {
		Self::with(Some(owner()), behavior, false)
	}

	pub fn disconnected() -> Self {
		Self::with(None, SignBehavior::Valid, false)
	}

	/// Signature requests block until [`release`](Self::release) is called.
	pub fn gated(behavior: SignBehavior) -> Self {
		Self::with(Some(owner()), behavior, true)
	}

	pub fn release(&self) {
		if let Some(gate) = &self.gate {
			gate.notify_one();
		}
	}

	pub fn sign_calls(&self) -> usize {
		self.sign_calls.load(Ordering::SeqCst)
	}

	pub fn last_message(&self) -> Option<TypedPermitMessage> {
		self.last_message.lock().unwrap().clone()
	}
}

#[async_trait]
impl WalletInterface for FakeWallet {
	async fn active_address(&self) -> Option<Address> {
		self.address
	}

	async fn sign_typed_data(&self, message: &TypedPermitMessage) -> Result<String, WalletError> {
		self.sign_calls.fetch_add(1, Ordering::SeqCst);
		*self.last_message.lock().unwrap() = Some(message.clone());

		if let Some(gate) = &self.gate {
			gate.notified().await;
		}

		match &self.behavior {
			SignBehavior::Valid => Ok(valid_signature()),
			SignBehavior::Raw(raw) => Ok(raw.clone()),
			SignBehavior::Reject => Err(WalletError::UserRejected),
			SignBehavior::Fail => Err(WalletError::SigningFailed("device error".to_string())),
			SignBehavior::SessionLost => Err(WalletError::NotConnected),
		}
	}
}

pub fn owner() -> Address {
	Address::repeat_byte(0x11)
}

pub fn valid_signature() -> String {
	format!("0x{}{}1b", "aa".repeat(32), "bb".repeat(32))
}

pub fn sample_result() -> PermitResult {
	PermitResult {
		coin: "USDC_ERC20".to_string(),
		message: ResolvedPermitMessage {
			owner: owner(),
			spender: Address::repeat_byte(0x22),
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

pub fn accepted(sn: &str) -> SubmitPermitResponse {
	SubmitPermitResponse {
		sn: sn.to_string(),
		extra: HashMap::new(),
	}
}

pub fn status(status: RelayStatus) -> PermitStatusResponse {
	PermitStatusResponse {
		status,
		extra: HashMap::new(),
	}
}
