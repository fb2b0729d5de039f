//! Session credential lifecycle broker—acquire, refresh, and invalidate two independently-expiring
//! provider credential pairs and fold them into a single fail-closed session verdict.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod broker;
pub mod clock;
pub mod credential;
pub mod error;
pub mod obs;
pub mod projector;
pub mod provider;
#[cfg(all(any(test, feature = "test"), feature = "reqwest"))]
pub mod _preludet {
	//! Convenience re-exports and helpers for integration tests; enabled via `cfg(test)` or the
	//! `test` crate feature.

	pub use crate::_prelude::*;

	// self
	use crate::provider::{ProviderEndpoints, ReqwestIdpClient, ReqwestResourceClient};

	/// Builds an IdP client pointed at an `httpmock` server base URL.
	pub fn test_idp_client(base: &str) -> ReqwestIdpClient {
		let endpoints = ProviderEndpoints::new(
			Url::parse(&format!("{base}/idp/exchange"))
				.expect("Mock IdP exchange endpoint should parse successfully."),
			Url::parse(&format!("{base}/idp/token"))
				.expect("Mock IdP token endpoint should parse successfully."),
		);

		ReqwestIdpClient::new(endpoints)
	}

	/// Builds a Resource Service client pointed at an `httpmock` server base URL, with profile
	/// enrichment wired to `/resource/profile`.
	pub fn test_resource_client(base: &str) -> ReqwestResourceClient {
		let endpoints = ProviderEndpoints::new(
			Url::parse(&format!("{base}/resource/exchange"))
				.expect("Mock resource exchange endpoint should parse successfully."),
			Url::parse(&format!("{base}/resource/token"))
				.expect("Mock resource token endpoint should parse successfully."),
		);

		ReqwestResourceClient::new(endpoints).with_profile_endpoint(
			Url::parse(&format!("{base}/resource/profile"))
				.expect("Mock profile endpoint should parse successfully."),
		)
	}
}

mod _prelude {
	pub use std::{
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		sync::Arc,
	};

	pub use parking_lot::Mutex;
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(test)] use {httpmock as _, session_broker as _, tokio as _};
