//! Throttler-level error types shared across quota tracking and retry
//! handling.
//!
//! The error surface is generic over the caller's failure type `E` so that
//! transport details stay owned by the caller; this crate only classifies
//! them and reports how the retry budget was spent.

// self
use crate::_prelude::*;

/// Result alias returned by throttled executions.
pub type ThrottleResult<T, E> = Result<T, Error<E>>;

/// Terminal failure returned once a throttled execution gives up.
#[derive(Debug, ThisError)]
pub enum Error<E>
where
	E: 'static + Send + Sync + StdError,
{
	/// The API rejected the request credentials. Never retried.
	#[error("API rejected the request credentials.")]
	Unauthorized(#[source] E),
	/// Every allowed attempt failed.
	#[error("Retry budget exhausted after {attempts} attempt(s).")]
	RetryExhausted {
		/// Total attempts made, including the initial call.
		attempts: u32,
		/// Classified failure from the final attempt.
		#[source]
		source: AttemptError<E>,
	},
}
impl<E> Error<E>
where
	E: 'static + Send + Sync + StdError,
{
	/// Returns the caller's original failure, consuming the classification.
	pub fn into_failure(self) -> E {
		match self {
			Self::Unauthorized(e) => e,
			Self::RetryExhausted { source, .. } => source.into_failure(),
		}
	}
}

/// Classified failure from a single attempt.
#[derive(Debug, ThisError)]
pub enum AttemptError<E>
where
	E: 'static + Send + Sync + StdError,
{
	/// The API reported that the account's request budget was exceeded.
	#[error("API throttled the request.")]
	Throttled(#[source] E),
	/// The API failed the call for a reason other than throttling or
	/// authentication.
	#[error("API call failed: {diagnostic}")]
	Api {
		/// Detail extracted from the response body, or a fixed fallback when
		/// the body was empty or unreadable.
		diagnostic: String,
		/// Caller's failure as returned by the wrapped operation.
		#[source]
		source: E,
	},
}
impl<E> AttemptError<E>
where
	E: 'static + Send + Sync + StdError,
{
	/// Returns the caller's original failure, consuming the classification.
	pub fn into_failure(self) -> E {
		match self {
			Self::Throttled(e) => e,
			Self::Api { source, .. } => source,
		}
	}
}
