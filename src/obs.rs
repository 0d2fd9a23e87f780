//! Optional observability helpers for throttled calls.
//!
//! # Feature Flags
//!
//! - Enable `tracing` to emit structured spans named `drip_gate.call` with the `account` and
//!   `stage` (call site) fields.
//! - Enable `metrics` to increment the `drip_gate_call_total` counter for every
//!   attempt/success/failure/retry (labeled by `outcome`) and to record time spent waiting in
//!   the `drip_gate_wait_seconds` histogram (labeled by `reason`).

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Outcome labels recorded for each throttled call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CallOutcome {
	/// Entry to a throttled execution.
	Attempt,
	/// Successful completion.
	Success,
	/// Failure propagated back to the caller.
	Failure,
	/// Attempt re-queued after a retryable failure.
	Retry,
}
impl CallOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			CallOutcome::Attempt => "attempt",
			CallOutcome::Success => "success",
			CallOutcome::Failure => "failure",
			CallOutcome::Retry => "retry",
		}
	}
}
impl Display for CallOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Reasons a throttled call spends time waiting before a dispatch.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum WaitReason {
	/// Bucket refill wait computed from the tracked quota state.
	Quota,
	/// Delay after a throttled attempt, hinted by the server or configured.
	Throttled,
	/// Generic inter-retry delay.
	Backoff,
}
impl WaitReason {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			WaitReason::Quota => "quota",
			WaitReason::Throttled => "throttled",
			WaitReason::Backoff => "backoff",
		}
	}
}
impl Display for WaitReason {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
