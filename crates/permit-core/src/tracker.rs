//! Submission and settlement tracking.
//!
//! A signed permit is handed to the relay, which answers with a tracking
//! identifier. The tracker then polls the relay until it reports a terminal
//! status:
//!
//! ```text
//! Idle --submit--> Submitting --accepted--> Polling --terminal--> Success | Failed | Cancelled | Expired
//!                       |                      |
//!                       +--rejected--> Failed  +--retry budget spent--> Failed
//! any --reset--> Idle
//! ```
//!
//! Only the tracker writes its state. Consumers read [`TrackerSnapshot`]s
//! through a watch channel. Every submission and every reset starts a new
//! generation; a poll task belonging to an older generation is aborted and
//! its late writes are discarded.

use crate::PermitError;
use permit_config::PollingConfig;
use permit_relay::RelayInterface;
use permit_types::{truncate_id, PermitResult, RelayStatus, SubmitPermitRequest};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::instrument;

/// Where a submission currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrackerPhase {
	#[default]
	Idle,
	Submitting,
	Polling,
	Success,
	Failed,
	Cancelled,
	Expired,
}

impl TrackerPhase {
	pub fn is_terminal(&self) -> bool {
		matches!(
			self,
			TrackerPhase::Success
				| TrackerPhase::Failed
				| TrackerPhase::Cancelled
				| TrackerPhase::Expired
		)
	}

	/// Phase a relay status moves the tracker to, if any.
	fn from_status(status: RelayStatus) -> Option<Self> {
		match status {
			RelayStatus::New | RelayStatus::Signing => None,
			RelayStatus::Success => Some(TrackerPhase::Success),
			RelayStatus::Failed => Some(TrackerPhase::Failed),
			RelayStatus::Cancelled => Some(TrackerPhase::Cancelled),
			RelayStatus::Expired => Some(TrackerPhase::Expired),
		}
	}
}

/// Read-only view of the tracker state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrackerSnapshot {
	pub phase: TrackerPhase,
	/// The permit being submitted or tracked.
	pub result: Option<PermitResult>,
	/// Relay identifier, set once the relay accepted the permit.
	pub tracking_id: Option<String>,
	/// Last status the relay reported.
	pub status: Option<RelayStatus>,
	pub error: Option<PermitError>,
	/// Status queries answered so far for the current tracking id.
	pub polls: u32,
}

/// What the poll loop does after observing a status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollAction {
	Continue(Duration),
	Stop,
}

/// Polling cadence and retry budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollingPolicy {
	pub interval: Duration,
	/// Consecutive failed queries tolerated before giving up.
	pub max_transport_failures: u32,
	pub max_backoff: Duration,
	/// Upper bound on observed polling time for one tracking id.
	pub max_duration: Duration,
}

impl Default for PollingPolicy {
	fn default() -> Self {
		Self::from(&PollingConfig::default())
	}
}

impl From<&PollingConfig> for PollingPolicy {
	fn from(config: &PollingConfig) -> Self {
		Self {
			interval: config.interval(),
			max_transport_failures: config.max_transport_failures,
			max_backoff: config.max_backoff(),
			max_duration: config.max_duration(),
		}
	}
}

impl PollingPolicy {
	/// Keep polling at the regular interval while the relay is still working.
	pub fn next_action(&self, status: RelayStatus) -> PollAction {
		if status.is_terminal() {
			PollAction::Stop
		} else {
			PollAction::Continue(self.interval)
		}
	}

	/// Delay after the `failures`-th consecutive failed query:
	/// `interval * 2^failures`, capped at `max_backoff`.
	pub fn backoff(&self, failures: u32) -> Duration {
		let factor = 1u32.checked_shl(failures).unwrap_or(u32::MAX);
		self.interval
			.checked_mul(factor)
			.unwrap_or(self.max_backoff)
			.min(self.max_backoff)
	}
}

struct TrackerInner {
	relay: Arc<dyn RelayInterface>,
	policy: PollingPolicy,
	state: watch::Sender<TrackerSnapshot>,
	observing: watch::Sender<bool>,
	generation: AtomicU64,
	poll_task: Mutex<Option<JoinHandle<()>>>,
}

impl TrackerInner {
	/// Applies `update` only if `generation` is still current.
	fn update<F>(&self, generation: u64, update: F) -> bool
	where
		F: FnOnce(&mut TrackerSnapshot),
	{
		self.state.send_if_modified(|snapshot| {
			if self.generation.load(Ordering::SeqCst) != generation {
				return false;
			}
			update(snapshot);
			true
		})
	}

	/// Starts a new generation and stops the poll task of the previous one.
	fn invalidate(&self) -> u64 {
		let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
		let previous = self
			.poll_task
			.lock()
			.unwrap_or_else(|poisoned| poisoned.into_inner())
			.take();
		if let Some(handle) = previous {
			handle.abort();
		}
		generation
	}

	fn fail(&self, generation: u64, error: PermitError) {
		self.update(generation, |s| {
			s.phase = TrackerPhase::Failed;
			s.error = Some(error);
		});
	}
}

/// Submits signed permits and follows them to a terminal status.
#[derive(Clone)]
pub struct SubmissionTracker {
	inner: Arc<TrackerInner>,
}

impl SubmissionTracker {
	pub fn new(relay: Arc<dyn RelayInterface>, policy: PollingPolicy) -> Self {
		let (state, _) = watch::channel(TrackerSnapshot::default());
		let (observing, _) = watch::channel(true);
		Self {
			inner: Arc::new(TrackerInner {
				relay,
				policy,
				state,
				observing,
				generation: AtomicU64::new(0),
				poll_task: Mutex::new(None),
			}),
		}
	}

	pub fn snapshot(&self) -> TrackerSnapshot {
		self.inner.state.borrow().clone()
	}

	pub fn subscribe(&self) -> watch::Receiver<TrackerSnapshot> {
		self.inner.state.subscribe()
	}

	/// Sends `result` to the relay and starts polling its status.
	///
	/// Any earlier tracking id and its polling are dropped first. Returns the
	/// relay's tracking id. A rejected submission leaves the tracker in
	/// [`TrackerPhase::Failed`] with the relay's reason; it is never polled.
	#[instrument(skip_all, fields(coin = %result.coin))]
	pub async fn submit(&self, result: PermitResult) -> Result<String, PermitError> {
		let generation = self.inner.invalidate();
		let request = SubmitPermitRequest::from_result(&result);

		self.inner.update(generation, |s| {
			*s = TrackerSnapshot {
				phase: TrackerPhase::Submitting,
				result: Some(result),
				..TrackerSnapshot::default()
			};
		});

		let response = match self.inner.relay.submit_permit(&request).await {
			Ok(response) => response,
			Err(e) => {
				let error = PermitError::Submission(e.to_string());
				tracing::warn!(error = %e, "Permit submission failed");
				self.inner.fail(generation, error.clone());
				return Err(error);
			},
		};

		let tracking_id = response.sn;
		let applied = self.inner.update(generation, |s| {
			s.phase = TrackerPhase::Polling;
			s.tracking_id = Some(tracking_id.clone());
		});
		if !applied {
			return Err(PermitError::Reset);
		}

		let handle = tokio::spawn(poll_loop(
			self.inner.clone(),
			generation,
			tracking_id.clone(),
		));
		let mut slot = self
			.inner
			.poll_task
			.lock()
			.unwrap_or_else(|poisoned| poisoned.into_inner());
		if self.inner.generation.load(Ordering::SeqCst) == generation {
			*slot = Some(handle);
		} else {
			handle.abort();
		}

		Ok(tracking_id)
	}

	/// Returns to [`TrackerPhase::Idle`], stopping any polling and clearing
	/// result, error and tracking id.
	pub fn reset(&self) {
		self.inner.invalidate();
		self.inner.state.send_replace(TrackerSnapshot::default());
		tracing::debug!("Submission tracker reset");
	}

	/// Drops the recorded error without touching phase or polling.
	pub fn clear_error(&self) {
		self.inner.state.send_if_modified(|s| s.error.take().is_some());
	}

	/// Pauses (`false`) or resumes (`true`) status polling. Paused time does
	/// not count against the polling time limit.
	///
	/// For hosts that embed the tracker behind a view that can be hidden. The
	/// `permit` CLI observes for its whole run and never pauses.
	pub fn set_observing(&self, observing: bool) {
		self.inner.observing.send_replace(observing);
	}

	/// Waits until the current submission reaches a terminal phase or the
	/// tracker is reset.
	pub async fn wait_for_outcome(&self) -> TrackerSnapshot {
		let mut rx = self.subscribe();
		let outcome = rx
			.wait_for(|s| s.phase.is_terminal() || s.phase == TrackerPhase::Idle)
			.await
			.map(|s| (*s).clone());
		match outcome {
			Ok(snapshot) => snapshot,
			Err(_) => self.snapshot(),
		}
	}
}

#[instrument(skip_all, fields(tracking_id = %truncate_id(&tracking_id)))]
async fn poll_loop(inner: Arc<TrackerInner>, generation: u64, tracking_id: String) {
	let policy = inner.policy;
	let mut observing = inner.observing.subscribe();
	let mut started = Instant::now();
	let mut failures: u32 = 0;
	let mut delay = Duration::ZERO;

	loop {
		if !delay.is_zero() {
			tokio::time::sleep(delay).await;
		}

		if !*observing.borrow_and_update() {
			let paused_at = Instant::now();
			tracing::debug!("Polling paused");
			if observing.wait_for(|o| *o).await.is_err() {
				return;
			}
			started += paused_at.elapsed();
			tracing::debug!("Polling resumed");
		}

		if inner.generation.load(Ordering::SeqCst) != generation {
			return;
		}

		if started.elapsed() > policy.max_duration {
			tracing::warn!(
				elapsed_secs = started.elapsed().as_secs(),
				"Giving up on settlement status"
			);
			inner.fail(
				generation,
				PermitError::PollingTransport(format!(
					"no terminal status after {}s",
					policy.max_duration.as_secs()
				)),
			);
			return;
		}

		match inner.relay.get_permit_status(&tracking_id).await {
			Ok(response) => {
				failures = 0;
				let status = response.status;
				let applied = inner.update(generation, |s| {
					s.status = Some(status);
					s.polls += 1;
					s.error = None;
				});
				if !applied {
					return;
				}

				match policy.next_action(status) {
					PollAction::Continue(after) => {
						tracing::debug!(%status, "Permit pending");
						delay = after;
					},
					PollAction::Stop => {
						let phase = TrackerPhase::from_status(status).unwrap_or(TrackerPhase::Failed);
						inner.update(generation, |s| s.phase = phase);
						tracing::info!(%status, "Permit settlement finished");
						return;
					},
				}
			},
			Err(e) if !e.is_transient() => {
				tracing::warn!(error = %e, "Relay refused status query");
				inner.fail(generation, PermitError::PollingTransport(e.to_string()));
				return;
			},
			Err(e) => {
				failures += 1;
				tracing::warn!(error = %e, failures, "Status query failed");
				let error = PermitError::PollingTransport(e.to_string());

				if failures > policy.max_transport_failures {
					inner.fail(generation, error);
					return;
				}
				if !inner.update(generation, |s| s.error = Some(error)) {
					return;
				}
				delay = policy.backoff(failures);
			},
		}
	}
}
