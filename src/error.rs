//! Broker-level error taxonomy shared across the clock, providers, and session flows.

// self
use crate::_prelude::*;

/// Broker-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Hard failures surfaced to callers.
///
/// Provider-level refresh failures never appear here; the broker folds them into the
/// session verdict. Anything that does surface indicates a broken collaborator or a
/// programming bug and should fail loudly.
#[derive(Debug, ThisError)]
pub enum Error {
	/// The injected time source could not produce an instant.
	#[error(transparent)]
	Clock(#[from] crate::clock::ClockError),
	/// Login-time identity exchange failed; no record was created.
	#[error("Authentication failed.")]
	Exchange(#[from] ExchangeError),
	/// A credential record violated a broker invariant.
	#[error("Credential record violated a broker invariant: {detail}.")]
	Invariant {
		/// Description of the violated invariant.
		detail: &'static str,
	},
}

/// Login-time identity exchange failures.
#[derive(Debug, ThisError)]
pub enum ExchangeError {
	/// Provider rejected the identity assertion.
	#[error("Identity exchange rejected: {reason}.")]
	Rejected {
		/// Provider- or broker-supplied reason string.
		reason: String,
	},
	/// Temporary upstream failure; the caller may retry the login.
	#[error("Identity exchange failed: {message}.")]
	Transient {
		/// Provider- or broker-supplied message summarizing the failure.
		message: String,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
	/// Exchange endpoint responded with JSON that could not be parsed.
	#[error("Identity exchange returned malformed JSON.")]
	Malformed {
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
	/// Exchange response omitted the subject identifier.
	#[error("Identity exchange response is missing a subject identifier.")]
	MissingSubject,
	/// Exchange response carried an unusable subject identifier.
	#[error("Identity exchange returned an invalid subject identifier.")]
	InvalidSubject(#[from] crate::credential::SubjectIdError),
	/// Exchange response carried an unusable expiry.
	#[error(transparent)]
	Expiry(#[from] crate::provider::ExpiryError),
}

/// Refresh outcome classification for a single provider call.
///
/// The Unauthorized/Transient split is load-bearing: Unauthorized condemns the refresh
/// token immediately, while Transient leaves it eligible for retry inside a grace window.
/// Timeouts and malformed responses must always classify as Transient so a degraded
/// provider is never mistaken for a rejected token.
#[derive(Debug, ThisError)]
pub enum RefreshError {
	/// Provider rejected the refresh token; the token is dead.
	#[error("Refresh token rejected: {reason}.")]
	Unauthorized {
		/// Provider- or broker-supplied reason string.
		reason: String,
	},
	/// Temporary failure (network, timeout, 5xx); the refresh token may still be valid.
	#[error("Refresh failed: {message}.")]
	Transient {
		/// Provider- or broker-supplied message summarizing the failure.
		message: String,
		/// HTTP status code, when available.
		status: Option<u16>,
		/// Retry-After hint from upstream, if supplied.
		retry_after: Option<Duration>,
	},
}

/// Best-effort profile enrichment failure; absorbed by the broker, never trust-relevant.
#[derive(Debug, ThisError)]
#[error("Profile fetch failed: {message}.")]
pub struct ProfileError {
	/// Human-readable failure summary.
	pub message: String,
	/// HTTP status code, when available.
	pub status: Option<u16>,
}
