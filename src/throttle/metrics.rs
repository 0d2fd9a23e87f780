// std
use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters for throttled call activity.
#[derive(Debug, Default)]
pub struct ThrottleMetrics {
	dispatches: AtomicU64,
	successes: AtomicU64,
	failures: AtomicU64,
	retries: AtomicU64,
}
impl ThrottleMetrics {
	/// Returns the number of attempts dispatched to the API, including
	/// retries.
	pub fn dispatches(&self) -> u64 {
		self.dispatches.load(Ordering::Relaxed)
	}

	/// Returns the number of executions that completed successfully.
	pub fn successes(&self) -> u64 {
		self.successes.load(Ordering::Relaxed)
	}

	/// Returns the number of executions that surfaced an error.
	pub fn failures(&self) -> u64 {
		self.failures.load(Ordering::Relaxed)
	}

	/// Returns the number of attempts re-queued for retry.
	pub fn retries(&self) -> u64 {
		self.retries.load(Ordering::Relaxed)
	}

	pub(crate) fn record_dispatch(&self) {
		self.dispatches.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_success(&self) {
		self.successes.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_failure(&self) {
		self.failures.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_retry(&self) {
		self.retries.fetch_add(1, Ordering::Relaxed);
	}
}
