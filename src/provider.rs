//! Provider-facing contracts: the two upstream clients, typed grant results, and
//! failure classification.
//!
//! `client` defines the transport-agnostic [`ProviderClient`]/[`ProfileSource`] traits and
//! the boundary validation that turns untyped provider JSON into typed grants exactly
//! once. `http` supplies the default reqwest-backed implementations for both providers.

pub mod client;
#[cfg(feature = "reqwest")] pub mod http;

pub use client::*;
#[cfg(feature = "reqwest")] pub use http::*;

// self
use crate::_prelude::*;

/// The two upstream credential providers the broker reconciles.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProviderKind {
	/// General-purpose identity provider issuing the primary credential pair.
	Idp,
	/// Backend resource provider issuing the secondary credential pair.
	ResourceService,
}
impl ProviderKind {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			ProviderKind::Idp => "idp",
			ProviderKind::ResourceService => "resource_service",
		}
	}
}
impl Display for ProviderKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		match self {
			ProviderKind::Idp => f.write_str("IdP"),
			ProviderKind::ResourceService => f.write_str("Resource Service"),
		}
	}
}

/// Endpoint pair a provider client talks to.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderEndpoints {
	/// Identity exchange endpoint used at login.
	pub exchange: Url,
	/// Token endpoint used for refresh calls.
	pub token: Url,
}
impl ProviderEndpoints {
	/// Creates a new endpoint pair.
	pub fn new(exchange: Url, token: Url) -> Self {
		Self { exchange, token }
	}
}
