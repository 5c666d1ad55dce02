//! Command-line entry point for the permit relay client.
//!
//! Loads configuration, wires the wallet, chain reader and relay client into
//! a [`PermitFlow`] and runs one command against it.

use clap::{Parser, Subcommand};
use permit_chain::implementations::evm::alloy::AlloyChainReader;
use permit_config::Config;
use permit_core::{PermitFlow, PermitSigner, PollingPolicy, SubmissionTracker, TrackerPhase};
use permit_relay::implementations::http::{HttpRelayClient, RelayTransportConfig};
use permit_relay::RelayInterface;
use permit_types::{Address, PayOrderRequest, PermitRequest, PermitResult, TypedPermitMessage};
use permit_wallet::implementations::local::LocalWallet;
use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{fmt, EnvFilter};

mod display;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
	/// Path to configuration file
	#[arg(short, long, default_value = "config.toml")]
	config: PathBuf,

	/// Log level (trace, debug, info, warn, error)
	#[arg(short, long, default_value = "info")]
	log_level: String,

	#[command(subcommand)]
	command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
	/// Sign a permit and print it without submitting
	Sign(PermitArgs),
	/// Sign a permit, submit it to the relay and follow it to settlement
	Submit {
		#[command(flatten)]
		permit: PermitArgs,
		/// Return as soon as the relay accepts the permit
		#[arg(long)]
		no_wait: bool,
	},
	/// Query the relay once for a submitted permit
	Status {
		/// Tracking id returned by `submit`
		#[arg(long)]
		sn: String,
	},
	/// Place a pay order against a settled permit
	PayOrder {
		#[arg(long)]
		pay_order_sn: String,
		#[arg(long)]
		variety_code: String,
		#[arg(long)]
		amount: String,
		#[arg(long)]
		business_type: Option<i64>,
		#[arg(long)]
		business_sn: Option<String>,
		#[arg(long)]
		tid: Option<String>,
	},
}

#[derive(clap::Args, Debug)]
struct PermitArgs {
	/// Token amount in human units, e.g. "1.5"
	#[arg(long)]
	amount: Option<String>,
	/// Permit validity in seconds
	#[arg(long)]
	duration: Option<u64>,
	/// Relay coin identifier
	#[arg(long)]
	coin: Option<String>,
	/// Expected spender; must match the relay's proxy address for the coin
	#[arg(long)]
	spender: Option<String>,
	/// Print the signed permit as JSON
	#[arg(long)]
	json: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	let args = Args::parse();

	let default_directive = args.log_level.to_string();
	let env_filter =
		EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

	fmt()
		.with_env_filter(env_filter)
		.with_thread_ids(true)
		.with_target(true)
		.with_writer(std::io::stderr)
		.init();

	tracing::info!("Started permit client");

	let config_path = args
		.config
		.to_str()
		.ok_or("Configuration path is not valid UTF-8")?;
	let config = Config::from_file(config_path).await?;
	tracing::info!(
		relay = %config.relay.base_url,
		chain_id = config.chain.chain_id,
		"Loaded configuration"
	);

	let relay: Arc<dyn RelayInterface> = Arc::new(HttpRelayClient::new(RelayTransportConfig {
		base_url: config.relay.base_url.clone(),
		auth_token: config.relay.auth_token.clone(),
		timeout: config.relay.timeout(),
	})?);

	match args.command {
		Command::Status { sn } => {
			let status = relay.get_permit_status(&sn).await?;
			println!("Permit {}: {}", sn, status.status);
			Ok(())
		},
		Command::PayOrder {
			pay_order_sn,
			variety_code,
			amount,
			business_type,
			business_sn,
			tid,
		} => {
			let request = PayOrderRequest {
				pay_order_sn,
				variety_code,
				amount,
				business_type,
				business_sn,
				tid,
			};
			let response = relay.pay_order(&request).await?;
			println!("{}", serde_json::to_string_pretty(&response)?);
			Ok(())
		},
		Command::Sign(permit) => {
			let (flow, wallet) = build_flow(&config, relay)?;
			let outcome = run_sign(&config, &flow, permit).await;
			end_session(&flow, &wallet);
			outcome
		},
		Command::Submit { permit, no_wait } => {
			let (flow, wallet) = build_flow(&config, relay)?;
			let outcome = run_submit(&config, &flow, permit, no_wait).await;
			end_session(&flow, &wallet);
			outcome
		},
	}
}

/// Builds the permit flow and a connected local wallet.
fn build_flow(
	config: &Config,
	relay: Arc<dyn RelayInterface>,
) -> Result<(PermitFlow, Arc<LocalWallet>), Box<dyn std::error::Error>> {
	let wallet_config = config
		.wallet
		.as_ref()
		.ok_or("No [wallet] section configured; signing needs a private key")?;

	let mut wallet = LocalWallet::new(&wallet_config.private_key)?;
	if wallet_config.require_confirmation {
		wallet = wallet.with_approval(Arc::new(confirm_on_terminal));
	}
	let wallet = Arc::new(wallet);
	let owner = wallet.connect();
	tracing::info!(%owner, "Wallet session opened");

	let chain = Arc::new(AlloyChainReader::new(
		&config.chain.rpc_url,
		config.chain.timeout(),
	)?);

	let signer = PermitSigner::new(
		wallet.clone(),
		chain,
		config.tokens.clone(),
		config.chain.chain_id,
	);
	let tracker = SubmissionTracker::new(relay.clone(), PollingPolicy::from(&config.polling));

	Ok((PermitFlow::new(signer, tracker, relay), wallet))
}

/// Disconnecting the wallet always resets the flow with it.
fn end_session(flow: &PermitFlow, wallet: &LocalWallet) {
	wallet.disconnect();
	flow.reset();
	tracing::info!("Wallet session closed");
}

async fn permit_request(
	config: &Config,
	flow: &PermitFlow,
	args: &PermitArgs,
) -> Result<PermitRequest, Box<dyn std::error::Error>> {
	let coin = args
		.coin
		.clone()
		.unwrap_or_else(|| config.permit.default_coin.clone());

	let expected = args
		.spender
		.as_deref()
		.map(|spender| {
			spender
				.parse::<Address>()
				.map_err(|e| format!("Invalid spender address '{}': {}", spender, e))
		})
		.transpose()?;
	let spender = check_spender(flow.spender_for(&coin).await?, expected)?;

	Ok(PermitRequest {
		amount: args
			.amount
			.clone()
			.unwrap_or_else(|| config.permit.default_amount.clone()),
		duration_seconds: args
			.duration
			.unwrap_or(config.permit.default_duration_seconds),
		spender,
		coin,
	})
}

/// The relay's proxy is always the spender; `--spender` only pins it.
fn check_spender(relay_proxy: Address, expected: Option<Address>) -> Result<Address, String> {
	match expected {
		Some(expected) if expected != relay_proxy => Err(format!(
			"Spender {} does not match relay proxy address {}",
			expected, relay_proxy
		)),
		_ => Ok(relay_proxy),
	}
}

async fn run_sign(
	config: &Config,
	flow: &PermitFlow,
	args: PermitArgs,
) -> Result<(), Box<dyn std::error::Error>> {
	let request = permit_request(config, flow, &args).await?;
	let result = flow.sign_permit(&request).await?;
	print_result(config, &result, args.json)
}

fn print_result(
	config: &Config,
	result: &PermitResult,
	json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
	if json {
		println!("{}", serde_json::to_string_pretty(result)?);
	} else {
		println!(
			"{}",
			display::render_result(result, config.tokens.get(&result.coin))
		);
	}
	Ok(())
}

async fn run_submit(
	config: &Config,
	flow: &PermitFlow,
	args: PermitArgs,
	no_wait: bool,
) -> Result<(), Box<dyn std::error::Error>> {
	let request = permit_request(config, flow, &args).await?;

	let sn = tokio::select! {
		sn = flow.sign_and_submit(&request) => sn?,
		_ = tokio::signal::ctrl_c() => {
			flow.reset();
			return Err("Interrupted while signing; permit discarded".into());
		}
	};
	println!("Submitted permit {}", sn);

	if let Some(result) = flow.tracker().snapshot().result {
		print_result(config, &result, args.json)?;
	}

	if no_wait {
		return Ok(());
	}

	let outcome = tokio::select! {
		outcome = flow.wait_for_outcome() => outcome,
		_ = tokio::signal::ctrl_c() => {
			flow.reset();
			return Err(format!("Interrupted; stopped tracking permit {}", sn).into());
		}
	};

	let summary = display::render_outcome(&outcome);
	if outcome.phase != TrackerPhase::Success {
		return Err(summary.into());
	}
	println!("{}", summary);
	Ok(())
}

/// Asks on the terminal before the local key signs anything. A terminal
/// that cannot be written to or read from counts as a refusal.
fn confirm_on_terminal(message: &TypedPermitMessage) -> bool {
	let approved = ask_approval(
		message,
		&mut std::io::stdin().lock(),
		&mut std::io::stderr().lock(),
	);
	match approved {
		Ok(approved) => approved,
		Err(e) => {
			tracing::warn!(error = %e, "Could not prompt for signature approval");
			false
		},
	}
}

/// Shows the typed data about to be signed and reads one answer line.
fn ask_approval<R: BufRead, W: Write>(
	message: &TypedPermitMessage,
	input: &mut R,
	output: &mut W,
) -> std::io::Result<bool> {
	let typed_data = serde_json::to_string_pretty(&message.to_typed_data_json())?;
	writeln!(output, "Signature request for {}:", message.domain.name)?;
	writeln!(output, "{}", typed_data)?;
	write!(output, "Approve? [y/N] ")?;
	output.flush()?;

	let mut answer = String::new();
	input.read_line(&mut answer)?;
	Ok(matches!(
		answer.trim().to_ascii_lowercase().as_str(),
		"y" | "yes"
	))
}

#[cfg(test)]
mod tests {
	use super::*;

	struct BrokenPipe;

	impl Write for BrokenPipe {
		fn write(&mut self, _: &[u8]) -> std::io::Result<usize> {
			Err(std::io::ErrorKind::BrokenPipe.into())
		}

		fn flush(&mut self) -> std::io::Result<()> {
			Err(std::io::ErrorKind::BrokenPipe.into())
		}
	}

	fn message() -> TypedPermitMessage {
		let tokens = permit_types::default_tokens();
		permit_core::builder::build(
			permit_core::builder::token_domain(&tokens["USDC_ERC20"], 1),
			Address::repeat_byte(0x11),
			Address::repeat_byte(0x22),
			permit_types::U256::from(1_000_000u64),
			permit_types::U256::from(5u64),
			permit_types::U256::from(1_700_003_600u64),
		)
	}

	#[test]
	fn test_approval_prompt_shows_typed_data() {
		let mut output = Vec::new();
		let approved = ask_approval(&message(), &mut "yes\n".as_bytes(), &mut output).unwrap();

		assert!(approved);
		let shown = String::from_utf8(output).unwrap();
		assert!(shown.contains("Signature request for USD Coin:"));
		assert!(shown.contains("\"primaryType\": \"Permit\""));
		assert!(shown.ends_with("Approve? [y/N] "));
	}

	#[test]
	fn test_approval_defaults_to_no() {
		let mut output = Vec::new();
		assert!(!ask_approval(&message(), &mut "\n".as_bytes(), &mut output).unwrap());
		assert!(!ask_approval(&message(), &mut "".as_bytes(), &mut output).unwrap());
	}

	#[test]
	fn test_approval_prompt_write_failure_is_an_error() {
		let err = ask_approval(&message(), &mut "y\n".as_bytes(), &mut BrokenPipe).unwrap_err();
		assert_eq!(err.kind(), std::io::ErrorKind::BrokenPipe);
	}

	#[test]
	fn test_check_spender() {
		let proxy = Address::repeat_byte(0x33);

		assert_eq!(check_spender(proxy, None), Ok(proxy));
		assert_eq!(check_spender(proxy, Some(proxy)), Ok(proxy));

		let err = check_spender(proxy, Some(Address::repeat_byte(0x44))).unwrap_err();
		assert!(err.contains("does not match relay proxy address"));
	}
}
