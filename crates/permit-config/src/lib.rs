//! Configuration module for the permit relay client.
//!
//! Configuration is loaded from TOML. `${VAR}` and `${VAR:-default}`
//! placeholders are resolved from the environment before parsing, so
//! credentials such as the relay token or the signer key never need to live
//! in the file itself.
//!
//! ## Modular Configuration Support
//!
//! A file may pull in others with `include = ["relay.toml", "tokens.toml"]`.
//! Each top-level section must be defined in exactly one file.

mod loader;

use permit_types::{default_tokens, SecretString, TokensConfig, USDC_ERC20};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

pub use loader::ConfigLoader;

/// Errors that can occur during configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
	#[error("Configuration error: {0}")]
	Parse(String),
	#[error("Validation error: {0}")]
	Validation(String),
}

impl From<toml::de::Error> for ConfigError {
	fn from(err: toml::de::Error) -> Self {
		// Only the message; the default Display dumps the whole input.
		ConfigError::Parse(err.message().to_string())
	}
}

/// Complete client configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
	/// Relay HTTP API settings.
	pub relay: RelayConfig,
	/// Settlement status polling policy.
	#[serde(default)]
	pub polling: PollingConfig,
	/// Chain used for nonce reads.
	pub chain: ChainConfig,
	/// Permit-capable tokens keyed by relay coin identifier.
	#[serde(default = "default_tokens")]
	pub tokens: TokensConfig,
	/// Local signer standing in for a connected wallet.
	pub wallet: Option<WalletConfig>,
	/// Defaults for permits requested from the command line.
	#[serde(default)]
	pub permit: PermitDefaults,
}

/// Relay transport settings shared by every relay call.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RelayConfig {
	/// Base URL, e.g. `https://api.example.com`.
	pub base_url: String,
	/// Shared secret sent as the `X-Token` header.
	pub auth_token: SecretString,
	#[serde(default = "default_timeout_seconds")]
	pub timeout_seconds: u64,
}

impl RelayConfig {
	pub fn timeout(&self) -> Duration {
		Duration::from_secs(self.timeout_seconds)
	}
}

/// Status polling policy.
///
/// The relay is queried every `interval_ms` while a permit is pending.
/// Transport failures back off exponentially up to `max_backoff_seconds`;
/// more than `max_transport_failures` consecutive failures, or polling for
/// longer than `max_duration_seconds`, ends the flow as failed.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PollingConfig {
	#[serde(default = "default_interval_ms")]
	pub interval_ms: u64,
	#[serde(default = "default_max_transport_failures")]
	pub max_transport_failures: u32,
	#[serde(default = "default_max_backoff_seconds")]
	pub max_backoff_seconds: u64,
	#[serde(default = "default_max_duration_seconds")]
	pub max_duration_seconds: u64,
}

impl Default for PollingConfig {
	fn default() -> Self {
		Self {
			interval_ms: default_interval_ms(),
			max_transport_failures: default_max_transport_failures(),
			max_backoff_seconds: default_max_backoff_seconds(),
			max_duration_seconds: default_max_duration_seconds(),
		}
	}
}

impl PollingConfig {
	pub fn interval(&self) -> Duration {
		Duration::from_millis(self.interval_ms)
	}

	pub fn max_backoff(&self) -> Duration {
		Duration::from_secs(self.max_backoff_seconds)
	}

	pub fn max_duration(&self) -> Duration {
		Duration::from_secs(self.max_duration_seconds)
	}
}

/// Chain RPC settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChainConfig {
	pub rpc_url: String,
	#[serde(default = "default_chain_id")]
	pub chain_id: u64,
	#[serde(default = "default_timeout_seconds")]
	pub timeout_seconds: u64,
}

impl ChainConfig {
	pub fn timeout(&self) -> Duration {
		Duration::from_secs(self.timeout_seconds)
	}
}

/// Local signer configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WalletConfig {
	/// Hex private key with 0x prefix.
	pub private_key: SecretString,
	/// Ask for interactive approval before every signature.
	#[serde(default)]
	pub require_confirmation: bool,
}

/// Defaults for permit requests.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PermitDefaults {
	#[serde(default = "default_coin")]
	pub default_coin: String,
	#[serde(default = "default_amount")]
	pub default_amount: String,
	#[serde(default = "default_duration_seconds")]
	pub default_duration_seconds: u64,
}

impl Default for PermitDefaults {
	fn default() -> Self {
		Self {
			default_coin: default_coin(),
			default_amount: default_amount(),
			default_duration_seconds: default_duration_seconds(),
		}
	}
}

fn default_timeout_seconds() -> u64 {
	30
}

fn default_interval_ms() -> u64 {
	2_000
}

fn default_max_transport_failures() -> u32 {
	5
}

fn default_max_backoff_seconds() -> u64 {
	30
}

fn default_max_duration_seconds() -> u64 {
	600
}

fn default_chain_id() -> u64 {
	1
}

fn default_coin() -> String {
	USDC_ERC20.to_string()
}

fn default_amount() -> String {
	"1".to_string()
}

fn default_duration_seconds() -> u64 {
	3600
}

/// Resolves environment variables in a string.
///
/// Replaces ${VAR_NAME} with the value of VAR_NAME, or the text after `:-`
/// when the variable is unset. Input is capped at 1MB.
pub(crate) fn resolve_env_vars(input: &str) -> Result<String, ConfigError> {
	const MAX_INPUT_SIZE: usize = 1024 * 1024;
	if input.len() > MAX_INPUT_SIZE {
		return Err(ConfigError::Validation(format!(
			"Configuration file too large: {} bytes (max: {} bytes)",
			input.len(),
			MAX_INPUT_SIZE
		)));
	}

	let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]{0,127})(?::-([^}]{0,256}))?\}")
		.map_err(|e| ConfigError::Parse(format!("Regex error: {}", e)))?;

	let mut result = String::with_capacity(input.len());
	let mut last = 0;
	for cap in re.captures_iter(input) {
		let (Some(full_match), Some(var_name)) = (cap.get(0), cap.get(1)) else {
			continue;
		};

		let value = match std::env::var(var_name.as_str()) {
			Ok(v) => v,
			Err(_) => match cap.get(2) {
				Some(default) => default.as_str().to_string(),
				None => {
					return Err(ConfigError::Validation(format!(
						"Environment variable '{}' not found",
						var_name.as_str()
					)))
				},
			},
		};

		result.push_str(&input[last..full_match.start()]);
		result.push_str(&value);
		last = full_match.end();
	}
	result.push_str(&input[last..]);

	Ok(result)
}

impl Config {
	/// Loads configuration from a file, following `include` directives.
	pub async fn from_file(path: &str) -> Result<Self, ConfigError> {
		let path_buf = Path::new(path);
		let base_dir = path_buf.parent().unwrap_or_else(|| Path::new("."));

		let mut loader = ConfigLoader::new(base_dir);
		let file_name = path_buf
			.file_name()
			.ok_or_else(|| ConfigError::Validation(format!("Invalid path: {}", path)))?;
		loader.load_config(file_name).await
	}

	/// Validates cross-field constraints serde cannot express.
	fn validate(&self) -> Result<(), ConfigError> {
		let base_url = self.relay.base_url.trim();
		if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
			return Err(ConfigError::Validation(format!(
				"relay.base_url must be an http(s) URL, got '{}'",
				self.relay.base_url
			)));
		}
		if self.relay.auth_token.is_empty() {
			return Err(ConfigError::Validation(
				"relay.auth_token cannot be empty".into(),
			));
		}
		if self.relay.timeout_seconds == 0 {
			return Err(ConfigError::Validation(
				"relay.timeout_seconds must be greater than 0".into(),
			));
		}

		if self.polling.interval_ms == 0 {
			return Err(ConfigError::Validation(
				"polling.interval_ms must be greater than 0".into(),
			));
		}
		if self.polling.max_duration() < self.polling.interval() {
			return Err(ConfigError::Validation(
				"polling.max_duration_seconds must cover at least one polling interval".into(),
			));
		}

		if self.chain.rpc_url.trim().is_empty() {
			return Err(ConfigError::Validation(
				"chain.rpc_url cannot be empty".into(),
			));
		}
		if self.chain.timeout_seconds == 0 {
			return Err(ConfigError::Validation(
				"chain.timeout_seconds must be greater than 0".into(),
			));
		}

		if self.tokens.is_empty() {
			return Err(ConfigError::Validation(
				"At least one token must be configured".into(),
			));
		}
		for (coin, token) in &self.tokens {
			if token.domain_name.is_empty() {
				return Err(ConfigError::Validation(format!(
					"Token {} must have a domain_name",
					coin
				)));
			}
			// 10^78 no longer fits in uint256.
			if token.decimals > 77 {
				return Err(ConfigError::Validation(format!(
					"Token {} declares {} decimals (max 77)",
					coin, token.decimals
				)));
			}
		}

		if !self.tokens.contains_key(&self.permit.default_coin) {
			return Err(ConfigError::Validation(format!(
				"permit.default_coin '{}' not found in tokens",
				self.permit.default_coin
			)));
		}
		if self.permit.default_duration_seconds == 0 {
			return Err(ConfigError::Validation(
				"permit.default_duration_seconds must be greater than 0".into(),
			));
		}

		if let Some(wallet) = &self.wallet {
			if wallet.private_key.is_empty() {
				return Err(ConfigError::Validation(
					"wallet.private_key cannot be empty".into(),
				));
			}
		}

		Ok(())
	}
}

/// Parses a TOML string, resolving environment variables and validating.
impl FromStr for Config {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let resolved = resolve_env_vars(s)?;
		let config: Config = toml::from_str(&resolved)?;
		config.validate()?;
		Ok(config)
	}
}
