//! Leaky-bucket value types and the process-wide quota registry.
//!
//! [`QuotaState`] is the locally tracked view of one account's bucket;
//! [`QuotaReport`] is the authoritative triple a remote API embeds in a
//! successful response. Both are immutable values: every update produces a
//! new state, and the [`registry`](crate::quota::registry) arbitrates all
//! shared reads and writes.

pub mod extract;
pub mod registry;

pub use extract::{NoQuota, QuotaExtractor};
#[cfg(feature = "reqwest")] pub use extract::HeaderQuota;
pub use registry::{AccountGate, QuotaRegistry};

// self
use crate::_prelude::*;

/// Error type produced when constructing quota values from untrusted input.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, ThisError)]
pub enum QuotaError {
	/// The drip rate was zero, negative, or not finite.
	#[error("Drip rate must be a positive, finite number of tokens per second.")]
	InvalidDripRate,
}

/// Tokens currently available in one account's bucket plus its refill rate.
///
/// The value is immutable; [`debit`](QuotaState::debit) returns a new state
/// instead of mutating in place. `remaining` is non-negative by construction
/// and the drip rate is validated to be positive and finite, so wait
/// computations can divide by it without further checks.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(into = "RawQuotaState", try_from = "RawQuotaState")]
pub struct QuotaState {
	remaining: u32,
	drip_rate: f64,
}
impl QuotaState {
	/// Creates a state after validating the drip rate.
	pub fn new(remaining: u32, drip_rate: f64) -> Result<Self, QuotaError> {
		if !drip_rate.is_finite() || drip_rate <= 0. {
			return Err(QuotaError::InvalidDripRate);
		}

		Ok(Self { remaining, drip_rate })
	}

	/// Returns the tokens currently available.
	pub fn remaining(&self) -> u32 {
		self.remaining
	}

	/// Returns the refill rate in tokens per second.
	pub fn drip_rate(&self) -> f64 {
		self.drip_rate
	}

	/// Returns a new state with `cost` tokens consumed, floored at zero.
	pub fn debit(&self, cost: u32) -> Self {
		Self { remaining: self.remaining.saturating_sub(cost), drip_rate: self.drip_rate }
	}

	/// Returns how long the bucket needs to drip before `cost` tokens are
	/// available, rounded up to whole seconds. Zero when the bucket already
	/// covers the cost; saturates at [`Duration::MAX`] when the deficit
	/// outlasts representable time.
	pub fn refill_wait(&self, cost: u32) -> Duration {
		let deficit = cost.saturating_sub(self.remaining);

		if deficit == 0 {
			return Duration::ZERO;
		}

		// A tiny reported drip rate can push the wait past what Duration
		// can hold.
		Duration::try_from_secs_f64((f64::from(deficit) / self.drip_rate).ceil())
			.unwrap_or(Duration::MAX)
	}
}
impl Display for QuotaState {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(f, "{} tokens at {}/s", self.remaining, self.drip_rate)
	}
}

#[derive(Clone, Copy, Serialize, Deserialize)]
struct RawQuotaState {
	remaining: u32,
	drip_rate: f64,
}
impl From<QuotaState> for RawQuotaState {
	fn from(value: QuotaState) -> Self {
		Self { remaining: value.remaining, drip_rate: value.drip_rate }
	}
}
impl TryFrom<RawQuotaState> for QuotaState {
	type Error = QuotaError;

	fn try_from(value: RawQuotaState) -> Result<Self, Self::Error> {
		Self::new(value.remaining, value.drip_rate)
	}
}

/// Authoritative quota triple reported by the remote service on a successful
/// response.
///
/// Reports are only ever produced by extractors, which treat unparseable
/// metadata as absent, so a constructed report always carries a valid drip
/// rate.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(into = "RawQuotaReport", try_from = "RawQuotaReport")]
pub struct QuotaReport {
	bucket_size: u32,
	used: u32,
	drip_rate: f64,
}
impl QuotaReport {
	/// Creates a report after validating the drip rate.
	pub fn new(bucket_size: u32, used: u32, drip_rate: f64) -> Result<Self, QuotaError> {
		if !drip_rate.is_finite() || drip_rate <= 0. {
			return Err(QuotaError::InvalidDripRate);
		}

		Ok(Self { bucket_size, used, drip_rate })
	}

	/// Returns the total bucket capacity.
	pub fn bucket_size(&self) -> u32 {
		self.bucket_size
	}

	/// Returns the tokens the server has recorded as consumed.
	pub fn used(&self) -> u32 {
		self.used
	}

	/// Returns the refill rate in tokens per second.
	pub fn drip_rate(&self) -> f64 {
		self.drip_rate
	}

	/// Returns the server-side view of available tokens, floored at zero.
	pub fn remaining(&self) -> u32 {
		self.bucket_size.saturating_sub(self.used)
	}

	/// Converts the report into the [`QuotaState`] it describes.
	pub fn to_state(&self) -> QuotaState {
		QuotaState { remaining: self.remaining(), drip_rate: self.drip_rate }
	}
}

#[derive(Clone, Copy, Serialize, Deserialize)]
struct RawQuotaReport {
	bucket_size: u32,
	used: u32,
	drip_rate: f64,
}
impl From<QuotaReport> for RawQuotaReport {
	fn from(value: QuotaReport) -> Self {
		Self { bucket_size: value.bucket_size, used: value.used, drip_rate: value.drip_rate }
	}
}
impl TryFrom<RawQuotaReport> for QuotaReport {
	type Error = QuotaError;

	fn try_from(value: RawQuotaReport) -> Result<Self, Self::Error> {
		Self::new(value.bucket_size, value.used, value.drip_rate)
	}
}
