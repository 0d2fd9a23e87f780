//! Quota metadata extraction from successful call results.
//!
//! Extraction is deliberately best-effort: remote APIs differ in where they
//! embed rate-limit bookkeeping, and a missing or malformed triple simply
//! leaves the locally tracked state in charge until the next report arrives.

// crates.io
#[cfg(feature = "reqwest")] use reqwest::{Response, header::HeaderMap};
// self
use crate::{_prelude::*, quota::QuotaReport};

/// Reads authoritative quota metadata out of a successful call result.
///
/// Implementations must be pure. Unparseable or absent metadata yields
/// `None`, never a failure; callers then keep relying on the preemptively
/// decremented local state.
pub trait QuotaExtractor<T>
where
	Self: Send + Sync,
{
	/// Returns the quota triple embedded in `result`, or `None` when the
	/// result carries no usable metadata.
	fn extract(&self, result: &T) -> Option<QuotaReport>;
}
impl<T, F> QuotaExtractor<T> for F
where
	F: Send + Sync + Fn(&T) -> Option<QuotaReport>,
{
	fn extract(&self, result: &T) -> Option<QuotaReport> {
		self(result)
	}
}

/// Extractor that never reports metadata.
///
/// This is the starting extractor for every throttler, useful for APIs that
/// expose no rate-limit bookkeeping; the preemptive deduction then remains
/// the only source of truth.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoQuota;
impl<T> QuotaExtractor<T> for NoQuota {
	fn extract(&self, _: &T) -> Option<QuotaReport> {
		None
	}
}

/// Extractor reading the quota triple from HTTP response headers.
///
/// All three headers must be present and parseable for a report to be
/// produced; a partial triple is treated as absent so a half-written server
/// response can never corrupt the tracked state.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug)]
pub struct HeaderQuota {
	bucket_size: String,
	used: String,
	drip_rate: String,
}
#[cfg(feature = "reqwest")]
impl HeaderQuota {
	/// Default header carrying the bucket capacity.
	pub const BUCKET_SIZE_HEADER: &'static str = "x-ratelimit-limit";
	/// Default header carrying the refill rate in tokens per second.
	pub const DRIP_RATE_HEADER: &'static str = "x-ratelimit-drip-rate";
	/// Default header carrying the consumed token count.
	pub const USED_HEADER: &'static str = "x-ratelimit-used";

	/// Creates an extractor reading the default `x-ratelimit-*` headers.
	pub fn new() -> Self {
		Self::default()
	}

	/// Overrides the header names read from responses.
	pub fn with_header_names(
		mut self,
		bucket_size: impl Into<String>,
		used: impl Into<String>,
		drip_rate: impl Into<String>,
	) -> Self {
		self.bucket_size = bucket_size.into();
		self.used = used.into();
		self.drip_rate = drip_rate.into();

		self
	}

	fn parse<N>(headers: &HeaderMap, name: &str) -> Option<N>
	where
		N: FromStr,
	{
		headers.get(name)?.to_str().ok()?.trim().parse().ok()
	}
}
#[cfg(feature = "reqwest")]
impl Default for HeaderQuota {
	fn default() -> Self {
		Self {
			bucket_size: Self::BUCKET_SIZE_HEADER.into(),
			used: Self::USED_HEADER.into(),
			drip_rate: Self::DRIP_RATE_HEADER.into(),
		}
	}
}
#[cfg(feature = "reqwest")]
impl QuotaExtractor<Response> for HeaderQuota {
	fn extract(&self, result: &Response) -> Option<QuotaReport> {
		let headers = result.headers();
		let bucket_size = Self::parse(headers, &self.bucket_size)?;
		let used = Self::parse(headers, &self.used)?;
		let drip_rate = Self::parse(headers, &self.drip_rate)?;

		QuotaReport::new(bucket_size, used, drip_rate).ok()
	}
}
