//! Reqwest-backed provider clients for the IdP and the Resource Service.
//!
//! Both clients POST form-encoded token requests with a bounded per-call timeout and
//! validate the JSON response exactly once at this boundary. Transport failures,
//! timeouts, and malformed payloads classify as Transient; only an explicit provider
//! rejection condemns a grant.

// std
use std::time::Duration as StdDuration;
// crates.io
use reqwest::header::{HeaderMap, RETRY_AFTER};
use time::format_description::well_known::Rfc2822;
// self
use crate::{
	_prelude::*,
	clock::{SystemClock, TimeSource},
	credential::{SubjectId, TokenSecret, UserProfile},
	error::{ExchangeError, ProfileError, RefreshError},
	provider::{
		ExchangeGrant, ProfileSource, ProviderClient, ProviderEndpoints, ProviderFuture,
		ProviderKind, RefreshGrant, TokenFailure, resolve_expiry,
	},
};

const DEFAULT_CALL_TIMEOUT: StdDuration = StdDuration::from_secs(10);

/// Reqwest-backed client for the general-purpose identity provider.
pub struct ReqwestIdpClient {
	transport: TokenTransport,
	endpoints: ProviderEndpoints,
}
impl ReqwestIdpClient {
	/// Creates a client with a default reqwest transport and a 10-second call timeout.
	pub fn new(endpoints: ProviderEndpoints) -> Self {
		Self { transport: TokenTransport::new(ReqwestClient::default()), endpoints }
	}

	/// Reuses an existing reqwest client.
	pub fn with_client(mut self, client: ReqwestClient) -> Self {
		self.transport.http = client;

		self
	}

	/// Overrides the per-call timeout.
	pub fn with_timeout(mut self, timeout: StdDuration) -> Self {
		self.transport.timeout = timeout;

		self
	}

	/// Overrides the time source used to resolve relative expiries.
	pub fn with_time_source(mut self, clock: Arc<dyn TimeSource>) -> Self {
		self.transport.clock = clock;

		self
	}
}
impl ProviderClient for ReqwestIdpClient {
	fn kind(&self) -> ProviderKind {
		ProviderKind::Idp
	}

	fn exchange_identity<'a>(
		&'a self,
		assertion: &'a str,
	) -> ProviderFuture<'a, ExchangeGrant, ExchangeError> {
		Box::pin(async move {
			let form = [("grant_type", "identity_assertion"), ("assertion", assertion)];

			self.transport.exchange(&self.endpoints.exchange, &form).await
		})
	}

	fn refresh<'a>(
		&'a self,
		refresh_token: &'a str,
	) -> ProviderFuture<'a, RefreshGrant, RefreshError> {
		Box::pin(async move { self.transport.refresh(&self.endpoints.token, refresh_token).await })
	}
}
impl Debug for ReqwestIdpClient {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ReqwestIdpClient")
			.field("endpoints", &self.endpoints)
			.field("timeout", &self.transport.timeout)
			.finish()
	}
}

/// Reqwest-backed client for the backend Resource Service.
///
/// Also serves as the [`ProfileSource`] when a profile endpoint is configured.
pub struct ReqwestResourceClient {
	transport: TokenTransport,
	endpoints: ProviderEndpoints,
	profile_endpoint: Option<Url>,
}
impl ReqwestResourceClient {
	/// Creates a client with a default reqwest transport and a 10-second call timeout.
	pub fn new(endpoints: ProviderEndpoints) -> Self {
		Self {
			transport: TokenTransport::new(ReqwestClient::default()),
			endpoints,
			profile_endpoint: None,
		}
	}

	/// Reuses an existing reqwest client.
	pub fn with_client(mut self, client: ReqwestClient) -> Self {
		self.transport.http = client;

		self
	}

	/// Overrides the per-call timeout.
	pub fn with_timeout(mut self, timeout: StdDuration) -> Self {
		self.transport.timeout = timeout;

		self
	}

	/// Overrides the time source used to resolve relative expiries.
	pub fn with_time_source(mut self, clock: Arc<dyn TimeSource>) -> Self {
		self.transport.clock = clock;

		self
	}

	/// Enables profile enrichment against the provided endpoint.
	pub fn with_profile_endpoint(mut self, endpoint: Url) -> Self {
		self.profile_endpoint = Some(endpoint);

		self
	}
}
impl ProviderClient for ReqwestResourceClient {
	fn kind(&self) -> ProviderKind {
		ProviderKind::ResourceService
	}

	fn exchange_identity<'a>(
		&'a self,
		assertion: &'a str,
	) -> ProviderFuture<'a, ExchangeGrant, ExchangeError> {
		Box::pin(async move {
			let form = [("grant_type", "token_exchange"), ("subject_token", assertion)];

			self.transport.exchange(&self.endpoints.exchange, &form).await
		})
	}

	fn refresh<'a>(
		&'a self,
		refresh_token: &'a str,
	) -> ProviderFuture<'a, RefreshGrant, RefreshError> {
		Box::pin(async move { self.transport.refresh(&self.endpoints.token, refresh_token).await })
	}
}
impl ProfileSource for ReqwestResourceClient {
	fn fetch_profile<'a>(
		&'a self,
		access_token: &'a str,
	) -> ProviderFuture<'a, UserProfile, ProfileError> {
		Box::pin(async move {
			let Some(endpoint) = &self.profile_endpoint else {
				return Err(ProfileError {
					message: "no profile endpoint configured".into(),
					status: None,
				});
			};
			let response = self
				.transport
				.http
				.get(endpoint.clone())
				.timeout(self.transport.timeout)
				.bearer_auth(access_token)
				.send()
				.await
				.map_err(|err| ProfileError { message: transport_message(&err), status: None })?;
			let status = response.status().as_u16();
			let bytes = response
				.bytes()
				.await
				.map_err(|err| ProfileError { message: transport_message(&err), status: Some(status) })?;

			if !(200..300).contains(&status) {
				return Err(ProfileError {
					message: format!("profile endpoint returned HTTP {status}"),
					status: Some(status),
				});
			}

			let mut deserializer = serde_json::Deserializer::from_slice(&bytes);
			let wire: ProfileResponse = serde_path_to_error::deserialize(&mut deserializer)
				.map_err(|err| ProfileError { message: err.to_string(), status: Some(status) })?;

			Ok(UserProfile {
				display_name: wire.display_name,
				picture_url: wire.picture_url,
				position: wire.position,
			})
		})
	}
}
impl Debug for ReqwestResourceClient {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ReqwestResourceClient")
			.field("endpoints", &self.endpoints)
			.field("profile_endpoint", &self.profile_endpoint)
			.field("timeout", &self.transport.timeout)
			.finish()
	}
}

/// Shared reqwest plumbing for form-encoded token calls.
struct TokenTransport {
	http: ReqwestClient,
	timeout: StdDuration,
	clock: Arc<dyn TimeSource>,
}
impl TokenTransport {
	fn new(http: ReqwestClient) -> Self {
		Self { http, timeout: DEFAULT_CALL_TIMEOUT, clock: Arc::new(SystemClock) }
	}

	async fn exchange(
		&self,
		url: &Url,
		form: &[(&str, &str)],
	) -> Result<ExchangeGrant, ExchangeError> {
		let now = self
			.clock
			.now()
			.map_err(|err| ExchangeError::Transient { message: err.to_string(), status: None })?;
		let response = self.post_form(url, form).await.map_err(CallFailure::into_exchange_error)?;
		let subject = response
			.subject
			.map(SubjectId::new)
			.transpose()
			.map_err(ExchangeError::InvalidSubject)?;
		let expires_at = resolve_expiry(response.expires_in, response.expires_at, now)?;
		let extra = if response.extra.is_empty() {
			None
		} else {
			Some(serde_json::Value::Object(response.extra))
		};

		Ok(ExchangeGrant {
			subject,
			access_token: TokenSecret::new(response.access_token),
			refresh_token: response.refresh_token.map(TokenSecret::new),
			expires_at,
			extra,
		})
	}

	async fn refresh(&self, url: &Url, refresh_token: &str) -> Result<RefreshGrant, RefreshError> {
		let now = self.clock.now().map_err(|err| RefreshError::Transient {
			message: err.to_string(),
			status: None,
			retry_after: None,
		})?;
		let form = [("grant_type", "refresh_token"), ("refresh_token", refresh_token)];
		let response = self.post_form(url, &form).await.map_err(CallFailure::into_refresh_error)?;
		// A malformed expiry keeps the old refresh token eligible for retry.
		let expires_at = resolve_expiry(response.expires_in, response.expires_at, now).map_err(
			|err| RefreshError::Transient { message: err.to_string(), status: None, retry_after: None },
		)?;

		Ok(RefreshGrant {
			access_token: TokenSecret::new(response.access_token),
			refresh_token: response.refresh_token.map(TokenSecret::new),
			expires_at,
		})
	}

	async fn post_form(&self, url: &Url, form: &[(&str, &str)]) -> Result<TokenResponse, CallFailure> {
		let response = self
			.http
			.post(url.clone())
			.timeout(self.timeout)
			.form(form)
			.send()
			.await
			.map_err(CallFailure::from_transport)?;
		let status = response.status().as_u16();
		let retry_after = parse_retry_after(response.headers());
		let bytes = response.bytes().await.map_err(CallFailure::from_transport)?;

		if !(200..300).contains(&status) {
			let body: TokenErrorBody = serde_json::from_slice(&bytes).unwrap_or_default();

			return Err(CallFailure::Endpoint(TokenFailure {
				status: Some(status),
				error: body.error,
				error_description: body.error_description,
				retry_after,
			}));
		}

		let mut deserializer = serde_json::Deserializer::from_slice(&bytes);

		serde_path_to_error::deserialize(&mut deserializer)
			.map_err(|source| CallFailure::Malformed { source, status: Some(status) })
	}
}

enum CallFailure {
	Endpoint(TokenFailure),
	Malformed { source: serde_path_to_error::Error<serde_json::Error>, status: Option<u16> },
	Transport { message: String },
}
impl CallFailure {
	fn from_transport(err: ReqwestError) -> Self {
		Self::Transport { message: transport_message(&err) }
	}

	fn into_refresh_error(self) -> RefreshError {
		match self {
			Self::Endpoint(failure) => failure.into_refresh_error(),
			Self::Malformed { status, .. } => RefreshError::Transient {
				message: "token endpoint returned malformed JSON".into(),
				status,
				retry_after: None,
			},
			Self::Transport { message } =>
				RefreshError::Transient { message, status: None, retry_after: None },
		}
	}

	fn into_exchange_error(self) -> ExchangeError {
		match self {
			Self::Endpoint(failure) => failure.into_exchange_error(),
			Self::Malformed { source, status } => ExchangeError::Malformed { source, status },
			Self::Transport { message } => ExchangeError::Transient { message, status: None },
		}
	}
}

fn transport_message(err: &ReqwestError) -> String {
	if err.is_timeout() {
		"token endpoint timed out".into()
	} else if err.is_connect() {
		"token endpoint was unreachable".into()
	} else {
		format!("transport error: {err}")
	}
}

fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
	let raw = headers.get(RETRY_AFTER)?.to_str().ok()?.trim();

	if let Ok(secs) = raw.parse::<u64>() {
		return Some(Duration::seconds(secs as i64));
	}
	if let Ok(moment) = OffsetDateTime::parse(raw, &Rfc2822) {
		let delta = moment - OffsetDateTime::now_utc();

		if delta.is_positive() {
			return Some(delta);
		}
	}

	None
}

#[derive(Deserialize)]
struct TokenResponse {
	access_token: String,
	#[serde(default)]
	refresh_token: Option<String>,
	#[serde(default)]
	expires_in: Option<i64>,
	#[serde(default, with = "time::serde::rfc3339::option")]
	expires_at: Option<OffsetDateTime>,
	#[serde(default, alias = "sub")]
	subject: Option<String>,
	#[serde(flatten)]
	extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Default, Deserialize)]
struct TokenErrorBody {
	#[serde(default)]
	error: Option<String>,
	#[serde(default)]
	error_description: Option<String>,
}

#[derive(Deserialize)]
struct ProfileResponse {
	#[serde(default, alias = "displayName", alias = "name")]
	display_name: Option<String>,
	#[serde(default, alias = "pictureUrl", alias = "picture")]
	picture_url: Option<String>,
	#[serde(default)]
	position: Option<String>,
}
