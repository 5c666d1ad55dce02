//! Nonce and deadline resolution.

use crate::PermitError;
use permit_chain::ChainReader;
use permit_types::{current_timestamp, Address, U256};
use std::sync::Arc;

/// Nonce and deadline for one permit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedNonce {
	pub nonce: U256,
	/// Unix seconds after which the permit is void.
	pub deadline: U256,
	/// Unix seconds at which the deadline was computed.
	pub resolved_at: u64,
}

/// Reads the owner's replay counter and fixes the permit deadline.
#[derive(Clone)]
pub struct NonceResolver {
	chain: Arc<dyn ChainReader>,
}

impl NonceResolver {
	pub fn new(chain: Arc<dyn ChainReader>) -> Self {
		Self { chain }
	}

	/// Reads `nonces(owner)` on `token` and sets the deadline to now plus
	/// `duration_seconds`. Chain failures are returned as-is; no retry.
	pub async fn resolve(
		&self,
		token: Address,
		owner: Address,
		duration_seconds: u64,
	) -> Result<ResolvedNonce, PermitError> {
		if duration_seconds == 0 {
			return Err(PermitError::InvalidRequest(
				"duration must be greater than zero".to_string(),
			));
		}

		let nonce = self.chain.read_nonce(token, owner).await?;

		let resolved_at = current_timestamp();
		let deadline = U256::from(resolved_at) + U256::from(duration_seconds);

		Ok(ResolvedNonce {
			nonce,
			deadline,
			resolved_at,
		})
	}
}
