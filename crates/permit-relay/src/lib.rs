//! Relay client module for the permit workspace.
//!
//! The relay is the backend that turns a signed permit into an on-chain
//! transaction. This crate only speaks its HTTP API: it fetches per-coin
//! configuration, submits signed permits, reads settlement status and places
//! the optional pay order. Every endpoint answers with the same
//! `{code, data, msg, success}` envelope, and a call fails whenever the
//! envelope says so, whatever the HTTP status.

use async_trait::async_trait;
use permit_types::{
	PayOrderRequest, PermitStatusResponse, RelayConfigResponse, SubmitPermitRequest,
	SubmitPermitResponse,
};
use thiserror::Error;

/// Re-export implementations
pub mod implementations {
	pub mod http;
}

/// Endpoint paths, relative to the relay base URL.
pub mod endpoints {
	pub const GET_CONFIG: &str = "/api/v2/user/web3pay/getConfig";
	pub const SUBMIT_PERMIT: &str = "/api/v2/user/web3pay/permit";
	pub const GET_PERMIT: &str = "/api/v2/user/web3pay/getPermit";
	pub const PAY_ORDER: &str = "/api/v1/pay/web3pay/payOrder";
}

/// Name of the shared-secret header carried by every request.
pub const AUTH_HEADER: &str = "X-Token";

/// Errors that can occur while talking to the relay.
#[derive(Debug, Error)]
pub enum RelayError {
	/// The request never produced a response.
	#[error("Transport error: {0}")]
	Transport(String),
	/// No response within the configured timeout.
	#[error("Relay request timed out")]
	Timeout,
	/// Non-success HTTP status without a readable envelope.
	#[error("HTTP {status}: {body}")]
	Http { status: u16, body: String },
	/// The relay answered with an envelope reporting failure.
	#[error("{msg}")]
	Business { code: i64, msg: String },
	/// The response could not be decoded.
	#[error("Invalid relay response: {0}")]
	Decode(String),
	/// The client could not be constructed from its configuration.
	#[error("Invalid relay configuration: {0}")]
	InvalidConfig(String),
}

impl RelayError {
	/// Whether the same request may succeed if simply repeated.
	pub fn is_transient(&self) -> bool {
		match self {
			RelayError::Transport(_) | RelayError::Timeout => true,
			RelayError::Http { status, .. } => *status >= 500,
			_ => false,
		}
	}
}

/// Trait defining the relay HTTP API.
#[async_trait]
pub trait RelayInterface: Send + Sync {
	/// Fetches relay configuration for a coin, including the permit spender.
	async fn get_config(&self, coin: &str) -> Result<RelayConfigResponse, RelayError>;

	/// Submits a signed permit and returns the relay's tracking identifier.
	async fn submit_permit(
		&self,
		request: &SubmitPermitRequest,
	) -> Result<SubmitPermitResponse, RelayError>;

	/// Reads the settlement status of a submitted permit.
	async fn get_permit_status(&self, sn: &str) -> Result<PermitStatusResponse, RelayError>;

	/// Places a pay order. The response body is returned as-is.
	async fn pay_order(&self, request: &PayOrderRequest) -> Result<serde_json::Value, RelayError>;
}
