//! Transport-agnostic provider client contract and boundary validation.

// self
use crate::{
	_prelude::*,
	credential::{SubjectId, TokenSecret, UserProfile},
	error::{ExchangeError, ProfileError, RefreshError},
	provider::ProviderKind,
};

/// Boxed future returned by provider client calls.
pub type ProviderFuture<'a, T, E> = Pin<Box<dyn Future<Output = Result<T, E>> + 'a + Send>>;

/// Network boundary to one upstream credential provider.
///
/// Implementations perform the outbound call only and keep no local state; every failure
/// is reported as a typed outcome, never thrown across the boundary uninterpreted.
pub trait ProviderClient: Send + Sync {
	/// Identifies which provider this client talks to.
	fn kind(&self) -> ProviderKind;

	/// Trades an identity assertion for the first credential pair. Used only at login.
	fn exchange_identity<'a>(
		&'a self,
		assertion: &'a str,
	) -> ProviderFuture<'a, ExchangeGrant, ExchangeError>;

	/// Trades a refresh token for a new access token and expiry.
	fn refresh<'a>(
		&'a self,
		refresh_token: &'a str,
	) -> ProviderFuture<'a, RefreshGrant, RefreshError>;
}

/// Optional profile enrichment source; failures never affect the trust decision.
pub trait ProfileSource: Send + Sync {
	/// Fetches the subject's profile snapshot using a current access token.
	fn fetch_profile<'a>(
		&'a self,
		access_token: &'a str,
	) -> ProviderFuture<'a, UserProfile, ProfileError>;
}

/// Validated result of a login-time identity exchange.
#[derive(Clone, Debug)]
pub struct ExchangeGrant {
	/// Stable subject identifier asserted by the provider, when supplied.
	pub subject: Option<SubjectId>,
	/// Newly issued access token.
	pub access_token: TokenSecret,
	/// Refresh token, if the provider issued one.
	pub refresh_token: Option<TokenSecret>,
	/// Absolute expiry instant resolved at the boundary.
	pub expires_at: OffsetDateTime,
	/// Provider-specific claims passed through untyped for the hosting layer.
	pub extra: Option<serde_json::Value>,
}

/// Validated result of a refresh call.
#[derive(Clone, Debug)]
pub struct RefreshGrant {
	/// Newly issued access token.
	pub access_token: TokenSecret,
	/// Rotated refresh token; `None` means the provider kept the input token valid.
	pub refresh_token: Option<TokenSecret>,
	/// Absolute expiry instant resolved at the boundary.
	pub expires_at: OffsetDateTime,
}

/// Wire expiry validation failure.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ThisError)]
pub enum ExpiryError {
	/// Token response carried neither `expires_in` nor `expires_at`.
	#[error("Token response is missing an expiry.")]
	Missing,
	/// Token response carried a non-positive `expires_in`.
	#[error("Token response expiry is non-positive.")]
	NonPositive,
}

/// Resolves a wire expiry (relative seconds or absolute instant) against `issued_at`.
///
/// An absolute instant wins when a provider supplies both.
pub fn resolve_expiry(
	expires_in: Option<i64>,
	expires_at: Option<OffsetDateTime>,
	issued_at: OffsetDateTime,
) -> Result<OffsetDateTime, ExpiryError> {
	match (expires_at, expires_in) {
		(Some(instant), _) => Ok(instant),
		(None, Some(seconds)) if seconds > 0 => Ok(issued_at + Duration::seconds(seconds)),
		(None, Some(_)) => Err(ExpiryError::NonPositive),
		(None, None) => Err(ExpiryError::Missing),
	}
}

/// Primitive facts about a failed token call, classified into the binary taxonomy.
///
/// Keeps only primitive data (status code, OAuth fields, Retry-After hint) so
/// classification stays decoupled from any HTTP client.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TokenFailure {
	/// HTTP status code, when available.
	pub status: Option<u16>,
	/// Provider-supplied OAuth `error` field.
	pub error: Option<String>,
	/// Provider-supplied `error_description` field.
	pub error_description: Option<String>,
	/// Retry-After hint, when supplied.
	pub retry_after: Option<Duration>,
}
impl TokenFailure {
	/// Folds the facts into the refresh taxonomy.
	///
	/// Structured OAuth error codes take precedence over the HTTP status; anything
	/// unrecognized stays Transient so a degraded provider is never mistaken for a
	/// rejected token.
	pub fn into_refresh_error(self) -> RefreshError {
		match self.class() {
			FailureClass::Unauthorized => RefreshError::Unauthorized { reason: self.reason() },
			FailureClass::Transient => RefreshError::Transient {
				message: self.reason(),
				status: self.status,
				retry_after: self.retry_after,
			},
		}
	}

	/// Folds the facts into the exchange taxonomy.
	pub fn into_exchange_error(self) -> ExchangeError {
		match self.class() {
			FailureClass::Unauthorized => ExchangeError::Rejected { reason: self.reason() },
			FailureClass::Transient =>
				ExchangeError::Transient { message: self.reason(), status: self.status },
		}
	}

	fn class(&self) -> FailureClass {
		self.error
			.as_deref()
			.and_then(classify_error_code)
			.or_else(|| self.error_description.as_deref().and_then(classify_error_code))
			.unwrap_or_else(|| classify_status(self.status))
	}

	fn reason(&self) -> String {
		if let Some(error) = &self.error {
			return match &self.error_description {
				Some(description) => format!("{error} ({description})"),
				None => error.clone(),
			};
		}
		if let Some(description) = &self.error_description {
			return description.clone();
		}

		match self.status {
			Some(code) => format!("token endpoint returned HTTP {code}"),
			None => "token endpoint was unreachable".into(),
		}
	}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum FailureClass {
	Unauthorized,
	Transient,
}

fn classify_error_code(value: &str) -> Option<FailureClass> {
	if value.eq_ignore_ascii_case("invalid_grant")
		|| value.eq_ignore_ascii_case("invalid_token")
		|| value.eq_ignore_ascii_case("access_denied")
		|| value.eq_ignore_ascii_case("invalid_client")
		|| value.eq_ignore_ascii_case("unauthorized_client")
	{
		Some(FailureClass::Unauthorized)
	} else if value.eq_ignore_ascii_case("temporarily_unavailable")
		|| value.eq_ignore_ascii_case("server_error")
	{
		Some(FailureClass::Transient)
	} else {
		None
	}
}

fn classify_status(status: Option<u16>) -> FailureClass {
	match status {
		Some(400 | 401 | 403 | 404 | 410) => FailureClass::Unauthorized,
		_ => FailureClass::Transient,
	}
}
