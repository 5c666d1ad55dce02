//! The permit flow as one object: sign, submit, track, reset.
//!
//! [`PermitFlow`] ties the signing orchestrator to the submission tracker and
//! keeps the single user-facing error slot. Starting a new signature or
//! resetting clears it.

use crate::signer::PermitSigner;
use crate::tracker::{SubmissionTracker, TrackerSnapshot};
use crate::PermitError;
use permit_relay::RelayInterface;
use permit_types::{Address, PayOrderRequest, PermitRequest, PermitResult};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

pub struct PermitFlow {
	signer: PermitSigner,
	tracker: SubmissionTracker,
	relay: Arc<dyn RelayInterface>,
	/// Error from signing or from fetching relay configuration.
	error: Mutex<Option<PermitError>>,
	/// Bumped by every reset so a signature that completes afterwards is
	/// not submitted.
	epoch: AtomicU64,
}

impl PermitFlow {
	pub fn new(
		signer: PermitSigner,
		tracker: SubmissionTracker,
		relay: Arc<dyn RelayInterface>,
	) -> Self {
		Self {
			signer,
			tracker,
			relay,
			error: Mutex::new(None),
			epoch: AtomicU64::new(0),
		}
	}

	pub fn tracker(&self) -> &SubmissionTracker {
		&self.tracker
	}

	pub fn is_signing(&self) -> bool {
		self.signer.is_signing()
	}

	/// Current human-readable error, if any.
	///
	/// A signing error takes precedence over a submission or polling error
	/// recorded by the tracker.
	pub fn error(&self) -> Option<String> {
		if let Some(error) = self.lock_error().as_ref() {
			return Some(error.to_string());
		}
		self.tracker.snapshot().error.map(|e| e.to_string())
	}

	/// Spender for `coin`, as configured on the relay.
	pub async fn spender_for(&self, coin: &str) -> Result<Address, PermitError> {
		match self.relay.get_config(coin).await {
			Ok(config) => Ok(config.proxy_address),
			Err(e) => {
				let error = PermitError::RelayConfig(e.to_string());
				self.set_error(error.clone());
				Err(error)
			},
		}
	}

	/// Signs a permit without submitting it.
	///
	/// If the flow is reset while the wallet is still answering, whatever the
	/// wallet returns is dropped, the error slot stays empty and
	/// [`PermitError::Reset`] is returned.
	pub async fn sign_permit(&self, request: &PermitRequest) -> Result<PermitResult, PermitError> {
		if self.signer.is_signing() {
			return Err(PermitError::SigningInProgress);
		}
		let epoch = self.epoch.load(Ordering::SeqCst);
		self.clear_error();
		self.tracker.clear_error();

		let outcome = self.signer.sign_permit(request).await;
		if self.epoch.load(Ordering::SeqCst) != epoch {
			tracing::info!(
				signed = outcome.is_ok(),
				"Flow reset while signing; discarding wallet response"
			);
			return Err(PermitError::Reset);
		}

		outcome.inspect_err(|e| {
			if *e != PermitError::SigningInProgress {
				self.set_error(e.clone());
			}
		})
	}

	/// Signs a permit, hands it to the tracker and returns the tracking id.
	pub async fn sign_and_submit(&self, request: &PermitRequest) -> Result<String, PermitError> {
		let result = self.sign_permit(request).await?;
		self.tracker.submit(result).await
	}

	/// Places a pay order once a permit has settled.
	pub async fn pay_order(&self, request: &PayOrderRequest) -> Result<serde_json::Value, PermitError> {
		self.relay
			.pay_order(request)
			.await
			.map_err(|e| PermitError::Submission(e.to_string()))
	}

	/// Waits for the tracked submission to finish.
	pub async fn wait_for_outcome(&self) -> TrackerSnapshot {
		self.tracker.wait_for_outcome().await
	}

	/// Clears the error slot and returns the tracker to idle. A wallet
	/// request already dispatched keeps running; its result is discarded.
	pub fn reset(&self) {
		self.epoch.fetch_add(1, Ordering::SeqCst);
		self.clear_error();
		self.tracker.reset();
	}

	fn lock_error(&self) -> std::sync::MutexGuard<'_, Option<PermitError>> {
		self.error
			.lock()
			.unwrap_or_else(|poisoned| poisoned.into_inner())
	}

	fn set_error(&self, error: PermitError) {
		*self.lock_error() = Some(error);
	}

	fn clear_error(&self) {
		self.lock_error().take();
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::test_support::{
		accepted, status, FakeWallet, MockChain, MockRelay, SignBehavior,
	};
	use crate::tracker::{PollingPolicy, TrackerPhase};
	use permit_relay::RelayError;
	use permit_types::{default_tokens, RelayConfigResponse, RelayStatus, U256, USDC_ERC20};
	use std::collections::HashMap;

	fn request() -> PermitRequest {
		PermitRequest {
			amount: "1".to_string(),
			duration_seconds: 3600,
			spender: Address::repeat_byte(0x22),
			coin: USDC_ERC20.to_string(),
		}
	}

	fn chain() -> MockChain {
		let mut chain = MockChain::new();
		chain
			.expect_read_nonce()
			.returning(|_, _| Ok(U256::from(5u64)));
		chain
	}

	fn flow(wallet: Arc<FakeWallet>, relay: MockRelay) -> PermitFlow {
		let relay: Arc<dyn RelayInterface> = Arc::new(relay);
		let signer = PermitSigner::new(wallet, Arc::new(chain()), default_tokens(), 1);
		let tracker = SubmissionTracker::new(relay.clone(), PollingPolicy::default());
		PermitFlow::new(signer, tracker, relay)
	}

	#[tokio::test(start_paused = true)]
	async fn test_sign_submit_and_settle() {
		let mut relay = MockRelay::new();
		relay
			.expect_submit_permit()
			.withf(|req| req.value == "1000000" && req.v == "27")
			.times(1)
			.returning(|_| Ok(accepted("sn-7")));
		relay
			.expect_get_permit_status()
			.returning(|_| Ok(status(RelayStatus::Success)));
		let flow = flow(Arc::new(FakeWallet::connected(SignBehavior::Valid)), relay);

		let sn = flow.sign_and_submit(&request()).await.unwrap();
		assert_eq!(sn, "sn-7");

		let outcome = flow.wait_for_outcome().await;
		assert_eq!(outcome.phase, TrackerPhase::Success);
		assert_eq!(outcome.result.unwrap().message.nonce, U256::from(5u64));
		assert_eq!(flow.error(), None);
	}

	#[tokio::test]
	async fn test_signing_error_fills_slot_until_reset() {
		let mut relay = MockRelay::new();
		relay.expect_submit_permit().times(0);
		let flow = flow(Arc::new(FakeWallet::connected(SignBehavior::Reject)), relay);

		let err = flow.sign_and_submit(&request()).await.unwrap_err();
		assert_eq!(err, PermitError::UserRejected);
		assert_eq!(
			flow.error().as_deref(),
			Some("Signature request rejected by user")
		);

		flow.reset();
		assert_eq!(flow.error(), None);
	}

	#[tokio::test]
	async fn test_new_signature_clears_previous_error() {
		let mut relay = MockRelay::new();
		relay
			.expect_get_config()
			.returning(|_| Err(RelayError::Timeout));
		let flow = flow(Arc::new(FakeWallet::connected(SignBehavior::Valid)), relay);

		assert!(flow.spender_for(USDC_ERC20).await.is_err());
		assert!(flow.error().is_some());

		flow.sign_permit(&request()).await.unwrap();
		assert_eq!(flow.error(), None);

		let mut bad_coin = request();
		bad_coin.coin = "NOPE".to_string();
		flow.sign_permit(&bad_coin).await.unwrap_err();
		assert_eq!(flow.error().as_deref(), Some("Unsupported coin: NOPE"));
	}

	#[tokio::test(start_paused = true)]
	async fn test_submission_error_surfaces_through_slot() {
		let mut relay = MockRelay::new();
		relay.expect_submit_permit().returning(|_| {
			Err(RelayError::Business {
				code: 500,
				msg: "deadline too short".to_string(),
			})
		});
		relay.expect_get_permit_status().times(0);
		let flow = flow(Arc::new(FakeWallet::connected(SignBehavior::Valid)), relay);

		let err = flow.sign_and_submit(&request()).await.unwrap_err();
		assert!(matches!(err, PermitError::Submission(_)));
		assert_eq!(flow.tracker().snapshot().phase, TrackerPhase::Failed);
		assert_eq!(
			flow.error().as_deref(),
			Some("Permit submission failed: deadline too short")
		);
	}

	#[tokio::test(start_paused = true)]
	async fn test_reset_during_signing_discards_signature() {
		let mut relay = MockRelay::new();
		relay.expect_submit_permit().times(0);
		let wallet = Arc::new(FakeWallet::gated(SignBehavior::Valid));
		let flow = Arc::new(flow(wallet.clone(), relay));

		let pending = tokio::spawn({
			let flow = flow.clone();
			async move { flow.sign_and_submit(&request()).await }
		});
		while wallet.sign_calls() == 0 {
			tokio::task::yield_now().await;
		}
		assert!(flow.is_signing());

		flow.reset();
		wallet.release();

		assert_eq!(pending.await.unwrap(), Err(PermitError::Reset));
		assert_eq!(flow.tracker().snapshot().phase, TrackerPhase::Idle);
		assert_eq!(flow.error(), None);
	}

	#[tokio::test(start_paused = true)]
	async fn test_rejection_after_reset_leaves_slot_empty() {
		let mut relay = MockRelay::new();
		relay.expect_submit_permit().times(0);
		let wallet = Arc::new(FakeWallet::gated(SignBehavior::Reject));
		let flow = Arc::new(flow(wallet.clone(), relay));

		let pending = tokio::spawn({
			let flow = flow.clone();
			async move { flow.sign_and_submit(&request()).await }
		});
		while wallet.sign_calls() == 0 {
			tokio::task::yield_now().await;
		}

		flow.reset();
		assert_eq!(flow.error(), None);
		wallet.release();

		assert_eq!(pending.await.unwrap(), Err(PermitError::Reset));
		assert_eq!(flow.error(), None);
		assert!(!flow.is_signing());
	}

	#[tokio::test(start_paused = true)]
	async fn test_sign_only_discards_signature_after_reset() {
		let wallet = Arc::new(FakeWallet::gated(SignBehavior::Valid));
		let flow = Arc::new(flow(wallet.clone(), MockRelay::new()));

		let pending = tokio::spawn({
			let flow = flow.clone();
			async move { flow.sign_permit(&request()).await }
		});
		while wallet.sign_calls() == 0 {
			tokio::task::yield_now().await;
		}

		flow.reset();
		wallet.release();

		assert_eq!(pending.await.unwrap(), Err(PermitError::Reset));
		assert_eq!(flow.error(), None);
	}

	#[tokio::test]
	async fn test_spender_from_relay_config() {
		let mut relay = MockRelay::new();
		relay.expect_get_config().times(1).returning(|_| {
			Ok(RelayConfigResponse {
				proxy_address: Address::repeat_byte(0x33),
				extra: HashMap::new(),
			})
		});
		let flow = flow(Arc::new(FakeWallet::connected(SignBehavior::Valid)), relay);

		assert_eq!(
			flow.spender_for(USDC_ERC20).await.unwrap(),
			Address::repeat_byte(0x33)
		);
	}

	#[tokio::test]
	async fn test_relay_config_failure() {
		let mut relay = MockRelay::new();
		relay
			.expect_get_config()
			.returning(|_| Err(RelayError::Transport("connection refused".to_string())));
		let flow = flow(Arc::new(FakeWallet::connected(SignBehavior::Valid)), relay);

		let err = flow.spender_for(USDC_ERC20).await.unwrap_err();
		assert!(matches!(err, PermitError::RelayConfig(_)));
		assert!(flow.error().unwrap().contains("connection refused"));
	}
}
