//! Core permit workflow.
//!
//! Everything between "the user asked for a permit" and "the relay settled
//! it" lives here:
//!
//! - [`codec`] splits wallet signatures into `(r, s, v)`
//! - [`resolver`] reads the owner's nonce and fixes the deadline
//! - [`builder`] assembles the EIP-712 typed message
//! - [`signer`] sequences the above into one single-flight operation
//! - [`tracker`] submits the signed permit and polls its settlement
//! - [`flow`] ties signing and tracking together behind one error slot

pub mod builder;
pub mod codec;
mod error;
pub mod flow;
pub mod resolver;
pub mod signer;
pub mod tracker;

#[cfg(test)]
mod test_support;

pub use error::PermitError;
pub use flow::PermitFlow;
pub use signer::PermitSigner;
pub use tracker::{
	PollAction, PollingPolicy, SubmissionTracker, TrackerPhase, TrackerSnapshot,
};
