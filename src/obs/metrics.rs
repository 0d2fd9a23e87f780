// self
use crate::{
	_prelude::*,
	obs::{CallOutcome, WaitReason},
};

/// Records a call outcome via the global metrics recorder (when enabled).
pub fn record_call_outcome(outcome: CallOutcome) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!("drip_gate_call_total", "outcome" => outcome.as_str()).increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = outcome;
	}
}

/// Records time spent waiting before a dispatch (when enabled).
pub fn record_wait(reason: WaitReason, wait: Duration) {
	#[cfg(feature = "metrics")]
	{
		metrics::histogram!("drip_gate_wait_seconds", "reason" => reason.as_str())
			.record(wait.as_secs_f64());
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = (reason, wait);
	}
}
