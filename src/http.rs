//! reqwest integration for throttled HTTP calls.
//!
//! [`check`] splits a [`Response`] into success and failure at the status
//! line, retaining the failed response inside [`HttpFailure`] so the
//! classifier can still read its `Retry-After` hint and drain its body for
//! diagnostics.

// crates.io
use reqwest::{
	Response,
	header::{HeaderMap, RETRY_AFTER},
};
use time::{OffsetDateTime, format_description::well_known::Rfc2822};
// self
use crate::{
	_prelude::*,
	retry::{BodyFuture, CallFailure},
};

/// Failure produced by [`check`] for throttled reqwest calls.
#[derive(Debug, ThisError)]
pub enum HttpFailure {
	/// Server answered with a non-success status.
	#[error("API responded with status {status}.")]
	Status {
		/// Status code of the response.
		status: u16,
		/// Parsed `Retry-After` hint, when the server sent one.
		retry_after: Option<Duration>,
		/// The failed response, held for a later one-shot body read.
		response: Option<Response>,
	},
	/// Request never produced a response.
	#[error("Network error occurred while calling the API.")]
	Transport(#[from] ReqwestError),
}
impl CallFailure for HttpFailure {
	fn status(&self) -> Option<u16> {
		match self {
			Self::Status { status, .. } => Some(*status),
			Self::Transport(e) => e.status().map(|status| status.as_u16()),
		}
	}

	fn body_text(&mut self) -> BodyFuture<'_> {
		let response = match self {
			Self::Status { response, .. } => response.take(),
			Self::Transport(_) => None,
		};

		Box::pin(async move { response?.text().await.ok() })
	}

	fn retry_after(&self) -> Option<Duration> {
		match self {
			Self::Status { retry_after, .. } => *retry_after,
			Self::Transport(_) => None,
		}
	}
}

/// Converts a response into an [`HttpFailure`] when its status is not a
/// success.
///
/// The failed response rides along inside the failure, so diagnostics can
/// read its body without a second network round trip.
pub fn check(response: Response) -> Result<Response, HttpFailure> {
	let status = response.status();

	if status.is_success() {
		return Ok(response);
	}

	let retry_after = parse_retry_after(response.headers());

	Err(HttpFailure::Status { status: status.as_u16(), retry_after, response: Some(response) })
}

/// Parses a `Retry-After` header into a relative duration.
///
/// Accepts both delta-seconds and RFC 2822 HTTP dates; dates already in the
/// past yield `None`.
pub fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
	let value = headers.get(RETRY_AFTER)?;
	let raw = value.to_str().ok()?.trim();

	if let Ok(secs) = raw.parse::<u64>() {
		return Some(Duration::from_secs(secs));
	}
	if let Ok(moment) = OffsetDateTime::parse(raw, &Rfc2822) {
		let delta = moment - OffsetDateTime::now_utc();

		if delta.is_positive() {
			return Duration::try_from(delta).ok();
		}
	}

	None
}
