//! Wire types for the relay HTTP API.
//!
//! Every relay response is wrapped in the same envelope, `{code, data, msg,
//! success}`. Request and response bodies use camelCase field names; the
//! relay's tracking identifier is called `sn` on the wire.

use alloy_primitives::Address;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashMap;
use std::fmt;

/// The `code` value the relay uses for a successful call.
pub const RELAY_OK_CODE: i64 = 200;

/// Uniform response envelope returned by every relay endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayEnvelope<T> {
	#[serde(default)]
	pub code: i64,
	pub data: Option<T>,
	#[serde(default)]
	pub msg: Option<String>,
	#[serde(default)]
	pub success: bool,
}

impl<T> RelayEnvelope<T> {
	/// A call only counts as successful when both the flag and the code agree.
	pub fn is_ok(&self) -> bool {
		self.success && self.code == RELAY_OK_CODE
	}
}

/// Settlement status reported by the relay for a submitted permit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelayStatus {
	New,
	Signing,
	Success,
	Failed,
	Cancelled,
	Expired,
}

impl RelayStatus {
	/// Integer code used on the wire.
	pub fn code(&self) -> u8 {
		match self {
			RelayStatus::New => 0,
			RelayStatus::Signing => 1,
			RelayStatus::Success => 2,
			RelayStatus::Failed => 3,
			RelayStatus::Cancelled => 4,
			RelayStatus::Expired => 5,
		}
	}

	pub fn from_code(code: u64) -> Option<Self> {
		match code {
			0 => Some(RelayStatus::New),
			1 => Some(RelayStatus::Signing),
			2 => Some(RelayStatus::Success),
			3 => Some(RelayStatus::Failed),
			4 => Some(RelayStatus::Cancelled),
			5 => Some(RelayStatus::Expired),
			_ => None,
		}
	}

	pub fn as_str(&self) -> &'static str {
		match self {
			RelayStatus::New => "NEW",
			RelayStatus::Signing => "SIGNING",
			RelayStatus::Success => "SUCCESS",
			RelayStatus::Failed => "FAILED",
			RelayStatus::Cancelled => "CANCELLED",
			RelayStatus::Expired => "EXPIRED",
		}
	}

	/// SUCCESS, FAILED, CANCELLED and EXPIRED never change again.
	pub fn is_terminal(&self) -> bool {
		!matches!(self, RelayStatus::New | RelayStatus::Signing)
	}
}

impl fmt::Display for RelayStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl Serialize for RelayStatus {
	fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		serializer.serialize_u8(self.code())
	}
}

// Accepts the integer codes the relay sends as well as the upper-case names.
impl<'de> Deserialize<'de> for RelayStatus {
	fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
	where
		D: Deserializer<'de>,
	{
		#[derive(Deserialize)]
		#[serde(untagged)]
		enum Raw {
			Code(u64),
			Name(String),
		}

		match Raw::deserialize(deserializer)? {
			Raw::Code(code) => RelayStatus::from_code(code).ok_or_else(|| {
				serde::de::Error::custom(format!("unknown permit status code {}", code))
			}),
			Raw::Name(name) => match name.to_ascii_uppercase().as_str() {
				"NEW" => Ok(RelayStatus::New),
				"SIGNING" => Ok(RelayStatus::Signing),
				"SUCCESS" => Ok(RelayStatus::Success),
				"FAILED" => Ok(RelayStatus::Failed),
				"CANCELLED" => Ok(RelayStatus::Cancelled),
				"EXPIRED" => Ok(RelayStatus::Expired),
				other => Err(serde::de::Error::custom(format!(
					"unknown permit status '{}'",
					other
				))),
			},
		}
	}
}

/// Body of `getConfig`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayConfigRequest {
	pub coin: String,
}

/// Relay configuration for one coin. `proxyAddress` is the permit spender.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelayConfigResponse {
	pub proxy_address: Address,
	#[serde(flatten)]
	pub extra: HashMap<String, serde_json::Value>,
}

/// Body of `permit`: the signed permit in the relay's field layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitPermitRequest {
	pub coin: String,
	pub owner: Address,
	pub spender: Address,
	pub value: String,
	pub deadline: String,
	pub v: String,
	pub r: String,
	pub s: String,
}

impl SubmitPermitRequest {
	/// Maps a signed permit onto the relay's request body.
	pub fn from_result(result: &crate::PermitResult) -> Self {
		Self {
			coin: result.coin.clone(),
			owner: result.message.owner,
			spender: result.message.spender,
			value: result.message.value.to_string(),
			deadline: result.message.deadline.to_string(),
			v: result.signature.normalized_v().to_string(),
			r: result.signature.r.to_string(),
			s: result.signature.s.to_string(),
		}
	}
}

/// Response of `permit`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitPermitResponse {
	/// Server-assigned tracking identifier.
	#[serde(alias = "trackingId")]
	pub sn: String,
	#[serde(flatten)]
	pub extra: HashMap<String, serde_json::Value>,
}

/// Body of `getPermit`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PermitStatusRequest {
	pub sn: String,
}

/// Response of `getPermit`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PermitStatusResponse {
	pub status: RelayStatus,
	#[serde(flatten)]
	pub extra: HashMap<String, serde_json::Value>,
}

/// Body of `payOrder`, the optional follow-up after a successful permit.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayOrderRequest {
	pub pay_order_sn: String,
	pub variety_code: String,
	pub amount: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub business_type: Option<i64>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub business_sn: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub tid: Option<String>,
}

/// Serde module for U256 serialization/deserialization as decimal strings.
pub mod u256_serde {
	use alloy_primitives::U256;
	use serde::{de::Error, Deserialize, Deserializer, Serialize, Serializer};

	pub fn serialize<S>(value: &U256, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		value.to_string().serialize(serializer)
	}

	pub fn deserialize<'de, D>(deserializer: D) -> Result<U256, D::Error>
	where
		D: Deserializer<'de>,
	{
		let s = String::deserialize(deserializer)?;
		U256::from_str_radix(&s, 10).map_err(D::Error::custom)
	}
}
