//! Throttled execution of outbound calls with per-account gating.
//!
//! Every execution follows the same pipeline. The account's gate is taken so
//! concurrent callers line up, the tracked bucket either covers the call's
//! cost (and is debited preemptively) or the caller sleeps until the bucket
//! has dripped enough, then the operation runs and the gate is released.
//! Successful results are offered to the throttler's [`QuotaExtractor`] and
//! any reported quota overwrites the local bookkeeping; failures are
//! classified and retried within the [`RetryPolicy`] budget.

mod metrics;
pub use metrics::ThrottleMetrics;

// crates.io
use tokio::time::sleep;
// self
use crate::{
	_prelude::*,
	account::AccountId,
	error::{AttemptError, Error, ThrottleResult},
	obs::{self, CallOutcome, CallSpan, WaitReason},
	quota::{NoQuota, QuotaExtractor, QuotaRegistry, QuotaState},
	retry::{CallFailure, Classified, RetryPolicy, classify},
};

/// Runs operations against a rate-limited API on behalf of one account.
///
/// A throttler is a cheap handle; clone it freely or build several for the
/// same account against a shared [`QuotaRegistry`] and they will all respect
/// the same bucket. Construction starts from [`NoQuota`] so the tracked state
/// is driven purely by preemptive deductions; attach an extractor with
/// [`with_extractor`](Self::with_extractor) once the remote API reports its
/// own bookkeeping.
pub struct Throttler<X>
where
	X: ?Sized,
{
	/// Registry sharing quota state and gates across throttlers.
	pub registry: QuotaRegistry,
	/// Account the calls are attributed to.
	pub account: AccountId,
	/// Shared metrics recorder for throttled call activity.
	pub metrics: Arc<ThrottleMetrics>,
	max_quota: QuotaState,
	request_cost: u32,
	retry: RetryPolicy,
	extractor: Arc<X>,
}
impl Throttler<NoQuota> {
	/// Creates a throttler for `account`.
	///
	/// `max_quota` seeds the bucket until the registry has real data for the
	/// account.
	pub fn new(registry: QuotaRegistry, account: AccountId, max_quota: QuotaState) -> Self {
		Self {
			registry,
			account,
			metrics: Default::default(),
			max_quota,
			request_cost: Self::DEFAULT_REQUEST_COST,
			retry: RetryPolicy::default(),
			extractor: Arc::new(NoQuota),
		}
	}
}
impl<X> Throttler<X>
where
	X: ?Sized,
{
	/// Default token cost charged per call.
	pub const DEFAULT_REQUEST_COST: u32 = 1;

	/// Replaces the metadata extractor consulted after successful calls.
	pub fn with_extractor<Y>(self, extractor: impl Into<Arc<Y>>) -> Throttler<Y>
	where
		Y: ?Sized,
	{
		Throttler {
			registry: self.registry,
			account: self.account,
			metrics: self.metrics,
			max_quota: self.max_quota,
			request_cost: self.request_cost,
			retry: self.retry,
			extractor: extractor.into(),
		}
	}

	/// Overrides the token cost charged per call. The cost is floored at one
	/// token.
	pub fn with_request_cost(mut self, cost: u32) -> Self {
		self.request_cost = cost.max(1);

		self
	}

	/// Overrides the retry policy.
	pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
		self.retry = retry;

		self
	}

	/// Returns the starting state used while the registry has no data.
	pub fn max_quota(&self) -> QuotaState {
		self.max_quota
	}

	/// Returns the token cost charged per call.
	pub fn request_cost(&self) -> u32 {
		self.request_cost
	}

	/// Returns the retry policy in effect.
	pub fn retry_policy(&self) -> &RetryPolicy {
		&self.retry
	}

	/// Runs `operation` under the account's gate and budget, retrying
	/// classified failures within the policy's budget.
	///
	/// `operation` is invoked once per attempt and must build a fresh request
	/// each time.
	pub async fn execute<T, E, F, Fut>(&self, operation: F) -> ThrottleResult<T, E>
	where
		X: QuotaExtractor<T>,
		E: CallFailure,
		F: FnMut() -> Fut,
		Fut: Future<Output = Result<T, E>>,
	{
		self.execute_with_cost(self.request_cost, operation).await
	}

	/// Runs `operation` charging `cost` tokens instead of the configured
	/// per-call cost.
	///
	/// Useful for bulk endpoints whose cost scales with the payload. The cost
	/// is floored at one token.
	pub async fn execute_with_cost<T, E, F, Fut>(
		&self,
		cost: u32,
		mut operation: F,
	) -> ThrottleResult<T, E>
	where
		X: QuotaExtractor<T>,
		E: CallFailure,
		F: FnMut() -> Fut,
		Fut: Future<Output = Result<T, E>>,
	{
		let span = CallSpan::new(&self.account, "execute");

		obs::record_call_outcome(CallOutcome::Attempt);

		let result =
			span.instrument(async move { self.run(cost.max(1), &mut operation).await }).await;

		match &result {
			Ok(_) => {
				obs::record_call_outcome(CallOutcome::Success);
				self.metrics.record_success();
			},
			Err(_) => {
				obs::record_call_outcome(CallOutcome::Failure);
				self.metrics.record_failure();
			},
		}

		result
	}

	async fn run<T, E, F, Fut>(&self, cost: u32, operation: &mut F) -> ThrottleResult<T, E>
	where
		X: QuotaExtractor<T>,
		E: CallFailure,
		F: FnMut() -> Fut,
		Fut: Future<Output = Result<T, E>>,
	{
		let mut attempts = 0_u32;

		loop {
			attempts += 1;

			match self.attempt(cost, operation).await {
				Ok(value) => return Ok(value),
				Err(Classified::Unauthorized(failure)) => return Err(Error::Unauthorized(failure)),
				Err(Classified::Throttled { failure, retry_after }) => {
					if attempts > self.retry.max_retries() {
						return Err(Error::RetryExhausted {
							attempts,
							source: AttemptError::Throttled(failure),
						});
					}

					let wait =
						retry_after.unwrap_or_else(|| self.retry.throttle_delay_for(attempts));

					self.back_off(WaitReason::Throttled, wait).await;
				},
				Err(Classified::Api { diagnostic, failure }) => {
					if attempts > self.retry.max_retries() {
						return Err(Error::RetryExhausted {
							attempts,
							source: AttemptError::Api { diagnostic, source: failure },
						});
					}

					self.back_off(WaitReason::Backoff, self.retry.delay_for(attempts)).await;
				},
			}
		}
	}

	async fn attempt<T, E, F, Fut>(&self, cost: u32, operation: &mut F) -> Result<T, Classified<E>>
	where
		X: QuotaExtractor<T>,
		E: CallFailure,
		F: FnMut() -> Fut,
		Fut: Future<Output = Result<T, E>>,
	{
		self.metrics.record_dispatch();

		let result = {
			let gate = self.registry.gate(&self.account);
			let _turn = gate.lock().await;

			self.wait_for_budget(cost).await;

			operation().await
		};

		match result {
			Ok(value) => {
				if let Some(report) = self.extractor.extract(&value) {
					self.registry.set_state(&self.account, report.to_state());
				}

				Ok(value)
			},
			Err(failure) => Err(classify(failure).await),
		}
	}

	/// Debits the bucket when it covers `cost`, otherwise sleeps until the
	/// drip schedule has refilled enough.
	///
	/// The waiting branch leaves the tracked state untouched; the call that
	/// follows is paid for by tokens the server has already dripped back, and
	/// the next authoritative report resynchronizes the bookkeeping.
	async fn wait_for_budget(&self, cost: u32) {
		let state = self.registry.state_or(&self.account, self.max_quota);

		if state.remaining() > cost {
			self.registry.set_state(&self.account, state.debit(cost));

			return;
		}

		let wait = state.refill_wait(cost);

		if !wait.is_zero() {
			obs::record_wait(WaitReason::Quota, wait);

			sleep(wait).await;
		}
	}

	async fn back_off(&self, reason: WaitReason, wait: Duration) {
		obs::record_call_outcome(CallOutcome::Retry);
		self.metrics.record_retry();
		obs::record_wait(reason, wait);

		sleep(wait).await;
	}
}
impl<X> Clone for Throttler<X>
where
	X: ?Sized,
{
	fn clone(&self) -> Self {
		Self {
			registry: self.registry.clone(),
			account: self.account.clone(),
			metrics: self.metrics.clone(),
			max_quota: self.max_quota,
			request_cost: self.request_cost,
			retry: self.retry.clone(),
			extractor: self.extractor.clone(),
		}
	}
}
impl<X> Debug for Throttler<X>
where
	X: ?Sized,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Throttler")
			.field("account", &self.account)
			.field("max_quota", &self.max_quota)
			.field("request_cost", &self.request_cost)
			.field("retry", &self.retry)
			.finish_non_exhaustive()
	}
}
