//! Adaptive per-account request throttling for rate-limited APIs: leaky-bucket
//! budgeting, classified retries, and shared quota bookkeeping in one crate.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod account;
pub mod error;
#[cfg(feature = "reqwest")] pub mod http;
pub mod obs;
pub mod quota;
pub mod retry;
pub mod throttle;
#[cfg(any(test, feature = "test"))]
pub mod _preludet {
	//! Convenience re-exports and helpers for integration tests; enabled via `cfg(test)` or the
	//! `test` crate feature.

	pub use crate::_prelude::*;

	// self
	use crate::{
		account::AccountId,
		quota::{NoQuota, QuotaRegistry, QuotaState},
		throttle::Throttler,
	};

	/// Builds a registry + throttler pair for exercising mock endpoints.
	pub fn build_test_throttler(
		account: &str,
		remaining: u32,
		drip_rate: f64,
	) -> (QuotaRegistry, Throttler<NoQuota>) {
		let registry = QuotaRegistry::new();
		let account = AccountId::new(account).expect("Failed to build test account.");
		let max_quota =
			QuotaState::new(remaining, drip_rate).expect("Failed to build test quota.");
		let throttler = Throttler::new(registry.clone(), account, max_quota);

		(registry, throttler)
	}
}

mod _prelude {
	pub use std::{
		collections::HashMap,
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		str::FromStr,
		sync::Arc,
		time::Duration,
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use parking_lot::RwLock;
	#[cfg(feature = "reqwest")]
	pub use reqwest::Error as ReqwestError;
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
}

#[cfg(feature = "reqwest")] pub use reqwest;
#[cfg(test)] use {color_eyre as _, httpmock as _};
