//! reqwest-based relay client.

use crate::{endpoints, RelayError, RelayInterface, AUTH_HEADER};
use async_trait::async_trait;
use permit_types::{
	truncate_id, PayOrderRequest, PermitStatusRequest, PermitStatusResponse, RelayConfigRequest,
	RelayConfigResponse, RelayEnvelope, SecretString, SubmitPermitRequest, SubmitPermitResponse,
};
use reqwest::header::{HeaderMap, HeaderValue};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;

/// Transport settings for the relay client, assembled by the caller.
#[derive(Debug, Clone)]
pub struct RelayTransportConfig {
	pub base_url: String,
	pub auth_token: SecretString,
	pub timeout: Duration,
}

/// Relay client over HTTP.
pub struct HttpRelayClient {
	client: reqwest::Client,
	base_url: String,
}

impl HttpRelayClient {
	pub fn new(config: RelayTransportConfig) -> Result<Self, RelayError> {
		let mut token = config
			.auth_token
			.with_exposed(HeaderValue::from_str)
			.map_err(|e| RelayError::InvalidConfig(format!("Invalid auth token: {}", e)))?;
		token.set_sensitive(true);

		let mut headers = HeaderMap::new();
		headers.insert(AUTH_HEADER, token);

		let client = reqwest::Client::builder()
			.default_headers(headers)
			.pool_idle_timeout(Duration::from_secs(90))
			.timeout(config.timeout)
			.build()
			.map_err(|e| RelayError::InvalidConfig(e.to_string()))?;

		Ok(Self {
			client,
			base_url: config.base_url.trim_end_matches('/').to_string(),
		})
	}

	/// POSTs `body` to `path` and unwraps the response envelope.
	async fn post<B, T>(&self, path: &str, body: &B) -> Result<Option<T>, RelayError>
	where
		B: Serialize + Sync,
		T: DeserializeOwned,
	{
		let url = format!("{}{}", self.base_url, path);
		let response = self
			.client
			.post(&url)
			.json(body)
			.send()
			.await
			.map_err(map_transport_error)?;

		let status = response.status();
		let text = response.text().await.map_err(map_transport_error)?;

		let envelope: RelayEnvelope<T> = match serde_json::from_str(&text) {
			Ok(envelope) => envelope,
			Err(e) if status.is_success() => return Err(RelayError::Decode(e.to_string())),
			Err(_) => {
				return Err(RelayError::Http {
					status: status.as_u16(),
					body: text,
				})
			},
		};

		if !envelope.is_ok() {
			let msg = envelope
				.msg
				.filter(|m| !m.is_empty())
				.unwrap_or_else(|| format!("Relay returned code {}", envelope.code));
			tracing::debug!(path, code = envelope.code, %msg, "Relay rejected request");
			return Err(RelayError::Business {
				code: envelope.code,
				msg,
			});
		}

		Ok(envelope.data)
	}
}

fn map_transport_error(e: reqwest::Error) -> RelayError {
	if e.is_timeout() {
		RelayError::Timeout
	} else {
		RelayError::Transport(e.to_string())
	}
}

fn require_data<T>(data: Option<T>, endpoint: &str) -> Result<T, RelayError> {
	data.ok_or_else(|| RelayError::Decode(format!("{} returned no data", endpoint)))
}

#[async_trait]
impl RelayInterface for HttpRelayClient {
	async fn get_config(&self, coin: &str) -> Result<RelayConfigResponse, RelayError> {
		let request = RelayConfigRequest {
			coin: coin.to_string(),
		};
		let data = self.post(endpoints::GET_CONFIG, &request).await?;
		require_data(data, "getConfig")
	}

	async fn submit_permit(
		&self,
		request: &SubmitPermitRequest,
	) -> Result<SubmitPermitResponse, RelayError> {
		let data: Option<SubmitPermitResponse> =
			self.post(endpoints::SUBMIT_PERMIT, request).await?;
		let response = require_data(data, "permit")?;
		tracing::info!(tracking_id = %truncate_id(&response.sn), coin = %request.coin, "Permit accepted by relay");
		Ok(response)
	}

	async fn get_permit_status(&self, sn: &str) -> Result<PermitStatusResponse, RelayError> {
		let request = PermitStatusRequest { sn: sn.to_string() };
		let data = self.post(endpoints::GET_PERMIT, &request).await?;
		require_data(data, "getPermit")
	}

	async fn pay_order(&self, request: &PayOrderRequest) -> Result<serde_json::Value, RelayError> {
		let data: Option<serde_json::Value> = self.post(endpoints::PAY_ORDER, request).await?;
		Ok(data.unwrap_or(serde_json::Value::Null))
	}
}
