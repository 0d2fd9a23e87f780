#![cfg(feature = "reqwest")]

// std
use std::{
	sync::atomic::{AtomicU32, Ordering},
	time::{Duration, Instant},
};
// crates.io
use httpmock::prelude::*;
use reqwest::Client;
// self
use drip_gate::{
	account::AccountId,
	error::{AttemptError, Error},
	http::{self, HttpFailure},
	quota::{HeaderQuota, QuotaRegistry, QuotaState},
	retry::RetryPolicy,
	throttle::Throttler,
};

const ACCOUNT: &str = "shop-throttle-it";

fn account(name: &str) -> AccountId {
	AccountId::new(name).expect("Account identifier should be valid.")
}

fn quota(remaining: u32, drip_rate: f64) -> QuotaState {
	QuotaState::new(remaining, drip_rate).expect("Quota fixture should be valid.")
}

fn build_throttler(registry: &QuotaRegistry, name: &str) -> Throttler<HeaderQuota> {
	Throttler::new(registry.clone(), account(name), quota(40, 2.))
		.with_extractor(HeaderQuota::new())
		.with_retry_policy(RetryPolicy::fixed(
			2,
			Duration::from_millis(10),
			Duration::from_millis(25),
		))
}

#[tokio::test]
async fn successful_calls_record_reported_quota() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/orders");
			then.status(200)
				.header("x-ratelimit-limit", "100")
				.header("x-ratelimit-used", "40")
				.header("x-ratelimit-drip-rate", "2")
				.body("[]");
		})
		.await;
	let registry = QuotaRegistry::new();
	let throttler = build_throttler(&registry, ACCOUNT);
	let client = Client::new();
	let url = server.url("/orders");
	let response = throttler
		.execute(|| {
			let client = client.clone();
			let url = url.clone();

			async move { http::check(client.get(&url).send().await?) }
		})
		.await
		.expect("Throttled call should succeed.");

	mock.assert_async().await;

	assert_eq!(response.status().as_u16(), 200);
	assert_eq!(registry.state(&account(ACCOUNT)), Some(quota(60, 2.)));
	assert_eq!(throttler.metrics.successes(), 1);
}

#[tokio::test]
async fn throttled_responses_are_retried_until_success() {
	let server = MockServer::start_async().await;
	let throttled = server
		.mock_async(|when, then| {
			when.method(GET).path("/orders").header("x-attempt", "0");
			then.status(429).body("");
		})
		.await;
	let recovered = server
		.mock_async(|when, then| {
			when.method(GET).path("/orders").header("x-attempt", "1");
			then.status(200)
				.header("x-ratelimit-limit", "40")
				.header("x-ratelimit-used", "10")
				.header("x-ratelimit-drip-rate", "2")
				.body("[]");
		})
		.await;
	let registry = QuotaRegistry::new();
	let throttler = build_throttler(&registry, ACCOUNT);
	let client = Client::new();
	let url = server.url("/orders");
	let calls = AtomicU32::new(0);

	throttler
		.execute(|| {
			let attempt = calls.fetch_add(1, Ordering::Relaxed);
			let client = client.clone();
			let url = url.clone();

			async move {
				http::check(
					client.get(&url).header("x-attempt", attempt.to_string()).send().await?,
				)
			}
		})
		.await
		.expect("Second attempt should succeed.");

	throttled.assert_async().await;
	recovered.assert_async().await;

	assert_eq!(registry.state(&account(ACCOUNT)), Some(quota(30, 2.)));
	assert_eq!(throttler.metrics.dispatches(), 2);
	assert_eq!(throttler.metrics.retries(), 1);
}

#[tokio::test]
async fn unauthorized_responses_fail_without_retry() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/orders");
			then.status(401).body("{\"errors\":\"Invalid API key\"}");
		})
		.await;
	let registry = QuotaRegistry::new();
	let throttler = build_throttler(&registry, ACCOUNT);
	let client = Client::new();
	let url = server.url("/orders");
	let err = throttler
		.execute(|| {
			let client = client.clone();
			let url = url.clone();

			async move { http::check(client.get(&url).send().await?) }
		})
		.await
		.expect_err("Unauthorized calls should surface immediately.");

	mock.assert_async().await;

	assert!(matches!(err, Error::Unauthorized(HttpFailure::Status { status: 401, .. })));
	assert_eq!(throttler.metrics.retries(), 0);
}

#[tokio::test]
async fn failing_responses_exhaust_the_budget_with_diagnostics() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/orders");
			then.status(500).body("server exploded");
		})
		.await;
	let registry = QuotaRegistry::new();
	let throttler = build_throttler(&registry, ACCOUNT);
	let client = Client::new();
	let url = server.url("/orders");
	let err = throttler
		.execute(|| {
			let client = client.clone();
			let url = url.clone();

			async move { http::check(client.get(&url).send().await?) }
		})
		.await
		.expect_err("Exhausted retries should surface an error.");

	mock.assert_calls_async(3).await;

	match err {
		Error::RetryExhausted { attempts, source: AttemptError::Api { diagnostic, .. } } => {
			assert_eq!(attempts, 3);
			assert_eq!(diagnostic, "server exploded");
		},
		other => panic!("Expected an exhausted retry budget, got {other:?}."),
	}
}

#[tokio::test]
async fn retry_after_hints_override_the_throttle_delay() {
	let server = MockServer::start_async().await;
	let throttled = server
		.mock_async(|when, then| {
			when.method(GET).path("/orders").header("x-attempt", "0");
			then.status(429).header("retry-after", "1").body("");
		})
		.await;
	let recovered = server
		.mock_async(|when, then| {
			when.method(GET).path("/orders").header("x-attempt", "1");
			then.status(200).body("[]");
		})
		.await;
	let registry = QuotaRegistry::new();
	// A throttle delay long enough that hitting it instead of the hint would
	// be obvious in the elapsed time.
	let throttler = build_throttler(&registry, ACCOUNT).with_retry_policy(RetryPolicy::fixed(
		1,
		Duration::from_millis(10),
		Duration::from_secs(60),
	));
	let client = Client::new();
	let url = server.url("/orders");
	let calls = AtomicU32::new(0);
	let started = Instant::now();

	throttler
		.execute(|| {
			let attempt = calls.fetch_add(1, Ordering::Relaxed);
			let client = client.clone();
			let url = url.clone();

			async move {
				http::check(
					client.get(&url).header("x-attempt", attempt.to_string()).send().await?,
				)
			}
		})
		.await
		.expect("Second attempt should succeed.");

	throttled.assert_async().await;
	recovered.assert_async().await;

	let elapsed = started.elapsed();

	assert!(elapsed >= Duration::from_secs(1), "Hint should be honored, got {elapsed:?}.");
	assert!(elapsed < Duration::from_secs(30), "Hint should beat the policy, got {elapsed:?}.");
}
