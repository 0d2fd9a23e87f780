//! Demonstrates a custom extractor that reads quota metadata out of a JSON
//! response body instead of headers, using a plain closure as the extractor.

// crates.io
use color_eyre::Result;
use httpmock::prelude::*;
use serde::Deserialize;
// self
use drip_gate::{
	account::AccountId,
	http::{self, HttpFailure},
	quota::{QuotaRegistry, QuotaReport, QuotaState},
	reqwest::Client,
	throttle::Throttler,
};

#[derive(Debug, Deserialize)]
struct OrdersPage {
	orders: Vec<String>,
	quota: Option<QuotaReport>,
}

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let server = MockServer::start_async().await;

	server
		.mock_async(|when, then| {
			when.method(GET).path("/orders");
			then.status(200).header("content-type", "application/json").body(
				"{\"orders\":[\"#1001\",\"#1002\"],\"quota\":{\"bucket_size\":40,\"used\":13,\"drip_rate\":2.0}}",
			);
		})
		.await;

	let registry = QuotaRegistry::new();
	let account = AccountId::new("demo-shop")?;
	// Unparseable bodies simply yield no report, leaving the preemptive
	// bookkeeping in charge.
	let extractor = |body: &String| {
		serde_json::from_str::<OrdersPage>(body).ok().and_then(|page| page.quota)
	};
	let throttler = Throttler::new(registry.clone(), account.clone(), QuotaState::new(40, 2.)?)
		.with_extractor(extractor);
	let client = Client::new();
	let url = server.url("/orders");
	let body = throttler
		.execute(|| {
			let client = client.clone();
			let url = url.clone();

			async move {
				let response = http::check(client.get(&url).send().await?)?;

				response.text().await.map_err(HttpFailure::from)
			}
		})
		.await?;
	let page: OrdersPage = serde_json::from_str(&body)?;

	println!("Fetched {} orders: {:?}.", page.orders.len(), page.orders);
	println!("Tracked quota after the report: {:?}.", registry.state(&account));

	Ok(())
}
