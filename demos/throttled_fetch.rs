//! Demonstrates throttled calls against an API that reports its quota through
//! `x-ratelimit-*` response headers, with the shared registry keeping the
//! local bookkeeping in sync.

// crates.io
use color_eyre::Result;
use httpmock::prelude::*;
// self
use drip_gate::{
	account::AccountId,
	http,
	quota::{HeaderQuota, QuotaRegistry, QuotaState},
	reqwest::Client,
	throttle::Throttler,
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let server = MockServer::start_async().await;

	server
		.mock_async(|when, then| {
			when.method(GET).path("/products");
			then.status(200)
				.header("x-ratelimit-limit", "40")
				.header("x-ratelimit-used", "12")
				.header("x-ratelimit-drip-rate", "2")
				.body("[\"hoodie\",\"sticker\"]");
		})
		.await;

	let registry = QuotaRegistry::new();
	let account = AccountId::new("demo-shop")?;
	let throttler = Throttler::new(registry.clone(), account.clone(), QuotaState::new(40, 2.)?)
		.with_extractor(HeaderQuota::new());
	let client = Client::new();
	let url = server.url("/products");

	println!("Tracked quota before any call: {:?}.", registry.state(&account));

	let response = throttler
		.execute(|| {
			let client = client.clone();
			let url = url.clone();

			async move { http::check(client.get(&url).send().await?) }
		})
		.await?;

	println!("Fetched {} with status {}.", url, response.status());
	println!("Tracked quota after the report: {:?}.", registry.state(&account));

	// A bulk endpoint can charge more than one token per call.
	throttler
		.execute_with_cost(5, || {
			let client = client.clone();
			let url = url.clone();

			async move { http::check(client.get(&url).send().await?) }
		})
		.await?;

	println!("Tracked quota after a five-token call: {:?}.", registry.state(&account));
	println!(
		"Dispatched {} calls, {} retries.",
		throttler.metrics.dispatches(),
		throttler.metrics.retries(),
	);

	Ok(())
}
