//! Failure classification and retry scheduling.
//!
//! A failed attempt is sorted into one of three classes by HTTP status:
//! throttled (retry on the bucket's schedule), unauthorized (give up
//! immediately), or any other API failure (retry on the generic schedule
//! with a diagnostic pulled from the response body). [`RetryPolicy`] decides
//! how many retries are allowed and how long each one waits.

// crates.io
use rand::Rng;
// self
use crate::_prelude::*;

/// HTTP status the classifier treats as throttling.
pub const THROTTLED_STATUS: u16 = 429;
/// HTTP status the classifier treats as an authentication failure.
pub const UNAUTHORIZED_STATUS: u16 = 401;
/// Diagnostic used when a failed response carries no readable body.
pub const FALLBACK_DIAGNOSTIC: &str = "No error details were returned by the API.";

/// Boxed future returned by [`CallFailure::body_text`].
pub type BodyFuture<'a> = Pin<Box<dyn Future<Output = Option<String>> + 'a + Send>>;

/// Failure contract for operations run through a throttler.
///
/// The throttler never inspects transport internals; it only needs a status
/// code to classify the failure, an optional back-off hint, and a one-shot
/// body read for diagnostics. Types whose body can be consumed at most once
/// should return `None` from [`body_text`](Self::body_text) on subsequent
/// reads.
pub trait CallFailure
where
	Self: 'static + Send + Sync + StdError,
{
	/// Returns the HTTP-like status code of the failure, when one exists.
	///
	/// Failures without a status (timeouts, connection resets) are treated
	/// as ordinary API failures and retried on the generic schedule.
	fn status(&self) -> Option<u16>;

	/// Reads the failure's response body for diagnostics, best effort.
	fn body_text(&mut self) -> BodyFuture<'_>;

	/// Returns the server-provided hint for how long to back off before
	/// retrying, when one was sent.
	fn retry_after(&self) -> Option<Duration> {
		None
	}
}

/// Outcome of classifying one failed attempt.
#[derive(Debug)]
pub enum Classified<E> {
	/// The account's request budget was exceeded; retry after the hinted or
	/// configured throttle delay.
	Throttled {
		/// Original failure, body untouched.
		failure: E,
		/// Back-off hint read from the failure, if the server sent one.
		retry_after: Option<Duration>,
	},
	/// The request credentials were rejected; never retried.
	Unauthorized(E),
	/// Any other failure; retry on the generic schedule.
	Api {
		/// Body text of the failed response, or [`FALLBACK_DIAGNOSTIC`] when
		/// the body was empty or unreadable.
		diagnostic: String,
		/// Original failure, body consumed.
		failure: E,
	},
}

/// Classifies a failed attempt by status code.
///
/// Only the API-failure class drains the body; throttled and unauthorized
/// failures pass through untouched so callers can still inspect them.
pub async fn classify<E>(mut failure: E) -> Classified<E>
where
	E: CallFailure,
{
	match failure.status() {
		Some(THROTTLED_STATUS) => {
			let retry_after = failure.retry_after();

			Classified::Throttled { failure, retry_after }
		},
		Some(UNAUTHORIZED_STATUS) => Classified::Unauthorized(failure),
		_ => {
			let diagnostic = failure
				.body_text()
				.await
				.map(|text| text.trim().to_owned())
				.filter(|text| !text.is_empty())
				.unwrap_or_else(|| FALLBACK_DIAGNOSTIC.into());

			Classified::Api { diagnostic, failure }
		},
	}
}

/// Shared delay function evaluated per retry attempt.
///
/// The argument is the 1-based count of attempts made so far, so the first
/// retry sees `1`.
pub type DelayFn = Arc<dyn Fn(u32) -> Duration + Send + Sync>;

/// Retry budget and delay schedule for one throttler.
///
/// `max_retries` bounds retries only; a throttler makes at most
/// `max_retries + 1` attempts in total. Throttled attempts wait on the
/// dedicated throttle schedule (or the server's own hint), everything else
/// retryable waits on the generic schedule.
#[derive(Clone)]
pub struct RetryPolicy {
	max_retries: u32,
	delay: DelayFn,
	throttle_delay: DelayFn,
}
impl RetryPolicy {
	/// Default delay before re-running a non-throttled failure.
	pub const DEFAULT_DELAY: Duration = Duration::from_millis(500);
	/// Default retry budget.
	pub const DEFAULT_MAX_RETRIES: u32 = 3;
	/// Default delay applied after a throttled attempt when the server
	/// provides no hint.
	pub const DEFAULT_THROTTLE_DELAY: Duration = Duration::from_secs(1);

	/// Creates a policy with the default budget and fixed default delays.
	pub fn new() -> Self {
		Self::default()
	}

	/// Creates a policy retrying up to `max_retries` times with fixed
	/// delays.
	pub fn fixed(max_retries: u32, delay: Duration, throttle_delay: Duration) -> Self {
		Self {
			max_retries,
			delay: Arc::new(move |_| delay),
			throttle_delay: Arc::new(move |_| throttle_delay),
		}
	}

	/// Creates a policy whose generic delay doubles per attempt, capped at
	/// `cap` and randomized down to no less than half the computed value so
	/// synchronized callers spread out.
	///
	/// Throttled attempts keep the fixed default throttle delay, since the
	/// bucket refills on the server's schedule rather than an exponential
	/// one.
	pub fn exponential(max_retries: u32, base: Duration, cap: Duration) -> Self {
		Self {
			max_retries,
			delay: Arc::new(move |attempts| {
				let exponent = attempts.saturating_sub(1).min(31);
				let backoff = base.saturating_mul(1 << exponent).min(cap);

				backoff.mul_f64(rand::rng().random_range(0.5..=1.))
			}),
			throttle_delay: Arc::new(move |_| Self::DEFAULT_THROTTLE_DELAY),
		}
	}

	/// Returns the retry budget.
	pub fn max_retries(&self) -> u32 {
		self.max_retries
	}

	/// Overrides the retry budget.
	pub fn with_max_retries(mut self, max_retries: u32) -> Self {
		self.max_retries = max_retries;

		self
	}

	/// Overrides the generic inter-retry delay function.
	pub fn with_delay(mut self, delay: impl Fn(u32) -> Duration + Send + Sync + 'static) -> Self {
		self.delay = Arc::new(delay);

		self
	}

	/// Overrides the delay function used after throttled attempts.
	pub fn with_throttle_delay(
		mut self,
		delay: impl Fn(u32) -> Duration + Send + Sync + 'static,
	) -> Self {
		self.throttle_delay = Arc::new(delay);

		self
	}

	/// Evaluates the generic delay after `attempts` attempts have been made.
	pub fn delay_for(&self, attempts: u32) -> Duration {
		(self.delay)(attempts)
	}

	/// Evaluates the throttle delay after `attempts` attempts have been
	/// made.
	pub fn throttle_delay_for(&self, attempts: u32) -> Duration {
		(self.throttle_delay)(attempts)
	}
}
impl Debug for RetryPolicy {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("RetryPolicy")
			.field("max_retries", &self.max_retries)
			.finish_non_exhaustive()
	}
}
impl Default for RetryPolicy {
	fn default() -> Self {
		Self::fixed(Self::DEFAULT_MAX_RETRIES, Self::DEFAULT_DELAY, Self::DEFAULT_THROTTLE_DELAY)
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[derive(Debug, ThisError)]
	#[error("Synthetic failure with status {status:?}.")]
	struct TestFailure {
		status: Option<u16>,
		body: Option<String>,
		retry_after: Option<Duration>,
	}
	impl TestFailure {
		fn with_status(status: u16) -> Self {
			Self { status: Some(status), body: None, retry_after: None }
		}
	}
	impl CallFailure for TestFailure {
		fn status(&self) -> Option<u16> {
			self.status
		}

		fn body_text(&mut self) -> BodyFuture<'_> {
			let body = self.body.take();

			Box::pin(async move { body })
		}

		fn retry_after(&self) -> Option<Duration> {
			self.retry_after
		}
	}

	#[tokio::test]
	async fn throttled_failures_keep_their_hint() {
		let hinted = TestFailure {
			retry_after: Some(Duration::from_secs(7)),
			..TestFailure::with_status(429)
		};

		match classify(hinted).await {
			Classified::Throttled { retry_after, .. } =>
				assert_eq!(retry_after, Some(Duration::from_secs(7))),
			other => panic!("Expected a throttled classification, got {other:?}."),
		}
		match classify(TestFailure::with_status(429)).await {
			Classified::Throttled { retry_after, .. } => assert_eq!(retry_after, None),
			other => panic!("Expected a throttled classification, got {other:?}."),
		}
	}

	#[tokio::test]
	async fn unauthorized_failures_keep_their_body() {
		let failure = TestFailure {
			body: Some("secret detail".into()),
			..TestFailure::with_status(401)
		};

		match classify(failure).await {
			Classified::Unauthorized(original) =>
				assert_eq!(original.body.as_deref(), Some("secret detail")),
			other => panic!("Expected an unauthorized classification, got {other:?}."),
		}
	}

	#[tokio::test]
	async fn api_failures_read_the_body_once() {
		let failure =
			TestFailure { body: Some("boom".into()), ..TestFailure::with_status(500) };

		match classify(failure).await {
			Classified::Api { diagnostic, failure } => {
				assert_eq!(diagnostic, "boom");
				assert_eq!(failure.body, None);
			},
			other => panic!("Expected an API classification, got {other:?}."),
		}
	}

	#[tokio::test]
	async fn api_diagnostics_are_trimmed() {
		let padded = TestFailure {
			body: Some("  upstream timeout \n".into()),
			..TestFailure::with_status(502)
		};

		match classify(padded).await {
			Classified::Api { diagnostic, .. } => assert_eq!(diagnostic, "upstream timeout"),
			other => panic!("Expected an API classification, got {other:?}."),
		}
	}

	#[tokio::test]
	async fn unreadable_bodies_fall_back_to_the_fixed_diagnostic() {
		for failure in [
			TestFailure::with_status(500),
			TestFailure { body: Some("   ".into()), ..TestFailure::with_status(503) },
			TestFailure { status: None, body: None, retry_after: None },
		] {
			match classify(failure).await {
				Classified::Api { diagnostic, .. } => assert_eq!(diagnostic, FALLBACK_DIAGNOSTIC),
				other => panic!("Expected an API classification, got {other:?}."),
			}
		}
	}

	#[test]
	fn fixed_policies_report_constant_delays() {
		let policy =
			RetryPolicy::fixed(2, Duration::from_millis(100), Duration::from_secs(3));

		assert_eq!(policy.max_retries(), 2);
		assert_eq!(policy.delay_for(1), Duration::from_millis(100));
		assert_eq!(policy.delay_for(9), Duration::from_millis(100));
		assert_eq!(policy.throttle_delay_for(1), Duration::from_secs(3));
	}

	#[test]
	fn exponential_delays_grow_within_the_cap() {
		let policy =
			RetryPolicy::exponential(5, Duration::from_millis(100), Duration::from_secs(2));

		for (attempts, full) in
			[(1_u32, 100_u64), (2, 200), (3, 400), (6, 2_000), (40, 2_000)]
		{
			let delay = policy.delay_for(attempts);

			assert!(delay <= Duration::from_millis(full));
			assert!(delay >= Duration::from_millis(full / 2));
		}
	}
}
