//! Human-readable rendering of permits and settlement outcomes.

use chrono::DateTime;
use permit_core::{TrackerPhase, TrackerSnapshot};
use permit_types::{format_token_amount, PermitResult, TokenConfig, U256};
use std::fmt::Write;

fn format_deadline(deadline: U256) -> String {
	let date = u64::try_from(deadline)
		.ok()
		.and_then(|secs| i64::try_from(secs).ok())
		.and_then(|secs| DateTime::from_timestamp(secs, 0));
	match date {
		Some(date) => format!("{} ({})", deadline, date.format("%Y-%m-%d %H:%M:%S UTC")),
		None => deadline.to_string(),
	}
}

/// Renders a signed permit, one field per line.
pub fn render_result(result: &PermitResult, token: Option<&TokenConfig>) -> String {
	let m = &result.message;
	let sig = &result.signature;
	let value = match token {
		Some(token) => format!(
			"{} {} ({})",
			format_token_amount(m.value, token.decimals),
			token.symbol,
			m.value
		),
		None => m.value.to_string(),
	};

	let mut out = String::new();
	let _ = writeln!(out, "Coin:      {}", result.coin);
	let _ = writeln!(out, "Owner:     {}", m.owner);
	let _ = writeln!(out, "Spender:   {}", m.spender);
	let _ = writeln!(out, "Value:     {}", value);
	let _ = writeln!(out, "Nonce:     {}", m.nonce);
	let _ = writeln!(out, "Deadline:  {}", format_deadline(m.deadline));
	let _ = writeln!(out, "Signature: {}", sig.signature);
	let _ = writeln!(out, "v:         {}", sig.v);
	let _ = writeln!(out, "r:         {}", sig.r);
	let _ = write!(out, "s:         {}", sig.s);
	out
}

/// One-line summary of where a submission ended up.
pub fn render_outcome(snapshot: &TrackerSnapshot) -> String {
	let tracking = snapshot.tracking_id.as_deref().unwrap_or("-");
	match snapshot.phase {
		TrackerPhase::Success => format!("Permit {} settled", tracking),
		TrackerPhase::Failed => match &snapshot.error {
			Some(error) => format!("Permit {} failed: {}", tracking, error),
			None => format!("Permit {} failed on the relay", tracking),
		},
		TrackerPhase::Cancelled => format!("Permit {} was cancelled", tracking),
		TrackerPhase::Expired => format!("Permit {} expired before settlement", tracking),
		TrackerPhase::Idle => "No permit in flight".to_string(),
		TrackerPhase::Submitting | TrackerPhase::Polling => {
			let status = snapshot
				.status
				.map(|s| s.to_string())
				.unwrap_or_else(|| "submitting".to_string());
			format!("Permit {} pending ({})", tracking, status)
		},
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use permit_core::PermitError;
	use permit_types::{
		default_tokens, Address, Bytes, RelayStatus, ResolvedPermitMessage, SignatureComponents,
		B256, USDC_ERC20,
	};

	fn result() -> PermitResult {
		PermitResult {
			coin: USDC_ERC20.to_string(),
			message: ResolvedPermitMessage {
				owner: Address::repeat_byte(0x11),
				spender: Address::repeat_byte(0x22),
				value: U256::from(1_500_000u64),
				nonce: U256::from(5u64),
				deadline: U256::from(1_700_003_600u64),
			},
			signature: SignatureComponents {
				r: B256::repeat_byte(0xaa),
				s: B256::repeat_byte(0xbb),
				v: 27,
				signature: Bytes::from(vec![0xaa; 65]),
			},
		}
	}

	#[test]
	fn test_render_result_with_token_units() {
		let tokens = default_tokens();
		let text = render_result(&result(), tokens.get(USDC_ERC20));

		assert!(text.contains("Value:     1.5 USDC (1500000)"));
		assert!(text.contains("Nonce:     5"));
		assert!(text.contains("Deadline:  1700003600 (2023-11-14 23:13:20 UTC)"));
		assert!(text.contains("v:         27"));
		assert!(text.lines().count() == 10);
	}

	#[test]
	fn test_render_result_without_token() {
		let text = render_result(&result(), None);
		assert!(text.contains("Value:     1500000\n"));
	}

	#[test]
	fn test_unrepresentable_deadline_printed_raw() {
		assert_eq!(format_deadline(U256::MAX), U256::MAX.to_string());
	}

	#[test]
	fn test_render_outcome() {
		let mut snapshot = TrackerSnapshot {
			phase: TrackerPhase::Success,
			tracking_id: Some("sn-1".to_string()),
			..TrackerSnapshot::default()
		};
		assert_eq!(render_outcome(&snapshot), "Permit sn-1 settled");

		snapshot.phase = TrackerPhase::Polling;
		snapshot.status = Some(RelayStatus::Signing);
		assert_eq!(render_outcome(&snapshot), "Permit sn-1 pending (SIGNING)");

		snapshot.phase = TrackerPhase::Failed;
		snapshot.error = Some(PermitError::PollingTransport("timed out".to_string()));
		assert_eq!(
			render_outcome(&snapshot),
			"Permit sn-1 failed: Status polling failed: timed out"
		);

		assert_eq!(
			render_outcome(&TrackerSnapshot::default()),
			"No permit in flight"
		);
	}
}
