//! Alloy-based chain reader.
//!
//! Issues `eth_call` against an HTTP JSON-RPC endpoint. Every call is bounded
//! by the configured timeout, and an expired timeout is reported as
//! [`ChainError::Timeout`].

use crate::{ChainError, ChainReader};
use alloy_provider::{Provider, RootProvider};
use alloy_rpc_types::TransactionRequest;
use alloy_sol_types::{sol, SolCall};
use alloy_transport_http::Http;
use async_trait::async_trait;
use permit_types::{Address, U256};
use std::time::Duration;

sol! {
	/// ERC-2612 replay counter.
	function nonces(address owner) external view returns (uint256);
}

/// Chain reader backed by an alloy HTTP provider.
pub struct AlloyChainReader {
	provider: RootProvider<Http<reqwest::Client>>,
	timeout: Duration,
}

impl AlloyChainReader {
	pub fn new(rpc_url: &str, timeout: Duration) -> Result<Self, ChainError> {
		let provider = RootProvider::new_http(
			rpc_url
				.parse()
				.map_err(|e| ChainError::InvalidUrl(format!("{}: {}", rpc_url, e)))?,
		);

		Ok(Self { provider, timeout })
	}
}

#[async_trait]
impl ChainReader for AlloyChainReader {
	async fn read_nonce(&self, token: Address, owner: Address) -> Result<U256, ChainError> {
		let call_data = noncesCall { owner }.abi_encode();
		let request = TransactionRequest::default()
			.to(token)
			.input(call_data.into());

		let result = tokio::time::timeout(self.timeout, self.provider.call(&request))
			.await
			.map_err(|_| ChainError::Timeout(self.timeout.as_secs()))?
			.map_err(|e| ChainError::Rpc(format!("Failed to call nonces: {}", e)))?;

		let nonce = noncesCall::abi_decode_returns(&result, true)
			.map_err(|e| ChainError::Decode(format!("Invalid nonces response: {}", e)))?
			._0;

		tracing::debug!(%token, %owner, %nonce, "Read permit nonce");
		Ok(nonce)
	}
}
