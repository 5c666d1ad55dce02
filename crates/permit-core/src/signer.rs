//! Signing orchestrator.
//!
//! Turns a [`PermitRequest`] into a signed [`PermitResult`]:
//! session check, token lookup and amount scaling, nonce and deadline
//! resolution, typed-message construction, wallet signature, decomposition.
//! Each step runs only after the previous one succeeded, and only one
//! signing operation may be in flight at a time.

use crate::builder::{build, token_domain};
use crate::codec::decompose;
use crate::resolver::NonceResolver;
use crate::PermitError;
use permit_chain::ChainReader;
use permit_types::{
	parse_token_amount, truncate_id, Address, PermitRequest, PermitResult, TokensConfig,
};
use permit_wallet::WalletInterface;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::instrument;

/// Clears the in-flight flag when the signing future completes or is dropped.
struct SigningGuard<'a>(&'a AtomicBool);

impl Drop for SigningGuard<'_> {
	fn drop(&mut self) {
		self.0.store(false, Ordering::SeqCst);
	}
}

pub struct PermitSigner {
	wallet: Arc<dyn WalletInterface>,
	resolver: NonceResolver,
	tokens: TokensConfig,
	chain_id: u64,
	signing: AtomicBool,
}

impl PermitSigner {
	pub fn new(
		wallet: Arc<dyn WalletInterface>,
		chain: Arc<dyn ChainReader>,
		tokens: TokensConfig,
		chain_id: u64,
	) -> Self {
		Self {
			wallet,
			resolver: NonceResolver::new(chain),
			tokens,
			chain_id,
			signing: AtomicBool::new(false),
		}
	}

	/// True while a [`sign_permit`](Self::sign_permit) call is unresolved.
	pub fn is_signing(&self) -> bool {
		self.signing.load(Ordering::SeqCst)
	}

	/// Produces a signed permit for `request`.
	///
	/// Fails with [`PermitError::SigningInProgress`] without touching the
	/// wallet or the chain if another call has not finished yet.
	#[instrument(skip_all, fields(coin = %request.coin, spender = %request.spender))]
	pub async fn sign_permit(&self, request: &PermitRequest) -> Result<PermitResult, PermitError> {
		if self
			.signing
			.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
			.is_err()
		{
			return Err(PermitError::SigningInProgress);
		}
		let _guard = SigningGuard(&self.signing);

		let owner = self
			.wallet
			.active_address()
			.await
			.ok_or(PermitError::NoWalletSession)?;

		let token = self
			.tokens
			.get(&request.coin)
			.ok_or_else(|| PermitError::UnsupportedCoin(request.coin.clone()))?;
		if request.spender == Address::ZERO {
			return Err(PermitError::InvalidRequest(
				"spender must not be the zero address".to_string(),
			));
		}
		let value = parse_token_amount(&request.amount, token.decimals)?;

		let resolved = self
			.resolver
			.resolve(token.address, owner, request.duration_seconds)
			.await?;
		tracing::debug!(%owner, nonce = %resolved.nonce, deadline = %resolved.deadline, "Resolved permit nonce");

		let typed = build(
			token_domain(token, self.chain_id),
			owner,
			request.spender,
			value,
			resolved.nonce,
			resolved.deadline,
		);

		let signature_hex = self.wallet.sign_typed_data(&typed).await?;
		let signature = decompose(&signature_hex)?;

		tracing::info!(
			%owner,
			value = %value,
			signature = %truncate_id(&signature_hex),
			"Permit signed"
		);

		Ok(PermitResult {
			coin: request.coin.clone(),
			message: typed.message,
			signature,
		})
	}
}
