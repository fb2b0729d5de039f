//! Persisted session credential state: per-provider slots and the terminal marker.

// self
use crate::{
	_prelude::*,
	credential::{SubjectId, TokenSecret, UserProfile},
	provider::{ExchangeGrant, ProviderKind, RefreshGrant},
};

/// One provider's credential triple.
///
/// A refresh replaces the whole triple or leaves it untouched; partial updates never
/// occur.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderCredential {
	/// Current access token, once the provider has been engaged.
	pub access_token: Option<TokenSecret>,
	/// Refresh token, if the provider issued one.
	pub refresh_token: Option<TokenSecret>,
	/// Absolute expiry instant of the access token.
	pub expires_at: Option<OffsetDateTime>,
}
impl ProviderCredential {
	/// Builds a slot from a login-time exchange grant.
	pub fn from_exchange(grant: &ExchangeGrant) -> Self {
		Self {
			access_token: Some(grant.access_token.clone()),
			refresh_token: grant.refresh_token.clone(),
			expires_at: Some(grant.expires_at),
		}
	}

	/// Returns `true` once any part of the triple has been populated.
	pub fn is_engaged(&self) -> bool {
		self.access_token.is_some() || self.refresh_token.is_some() || self.expires_at.is_some()
	}

	/// Replaces the triple with a refresh grant, reusing the previous refresh token when
	/// the provider did not rotate it.
	pub fn apply_refresh(&mut self, grant: RefreshGrant) {
		let refresh_token = grant.refresh_token.or_else(|| self.refresh_token.take());

		*self = Self {
			access_token: Some(grant.access_token),
			refresh_token,
			expires_at: Some(grant.expires_at),
		};
	}
}

/// Terminal reasons a record can be invalidated; retained for diagnostics only.
///
/// User-facing surfaces must never distinguish between these: an invalid session
/// uniformly presents as a request to sign in again.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum InvalidationReason {
	/// Provider credential expired (or was never provisioned) with no refresh token left.
	DeadCredential(ProviderKind),
	/// Provider rejected the refresh token.
	RefreshRejected(ProviderKind),
	/// Provider refresh kept failing past the tolerated window.
	RefreshFailed(ProviderKind),
	/// The record never obtained a credential from either provider.
	NoCredentials,
}
impl InvalidationReason {
	/// Returns the stable diagnostic tag recorded in logs and metrics.
	pub const fn tag(self) -> &'static str {
		match self {
			Self::DeadCredential(_) => "dead-credential",
			Self::RefreshRejected(_) => "refresh-rejected",
			Self::RefreshFailed(_) => "refresh-failed",
			Self::NoCredentials => "no-credentials",
		}
	}
}
impl Display for InvalidationReason {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		match self {
			Self::DeadCredential(provider) => write!(f, "{provider} expired without refresh token"),
			Self::RefreshRejected(provider) => write!(f, "{provider} refresh rejected"),
			Self::RefreshFailed(provider) => write!(f, "{provider} refresh failed"),
			Self::NoCredentials => f.write_str("no credentials available"),
		}
	}
}

/// Terminal invalidation marker; once set the record is dead until a fresh login.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invalidation {
	/// Why the record was condemned.
	pub reason: InvalidationReason,
	/// When the condemnation happened.
	pub at: OffsetDateTime,
}

/// The unit of persisted session state, owned exclusively by one evaluation at a time.
///
/// The hosting request layer serializes and deserializes the record between requests;
/// the broker never assumes a particular storage medium.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialRecord {
	/// Stable user identifier; absent means no authenticated subject.
	pub subject_id: Option<SubjectId>,
	/// IdP credential slot.
	pub idp: ProviderCredential,
	/// Resource Service credential slot.
	pub resource: ProviderCredential,
	/// Terminal invalidation marker.
	pub invalidated: Option<Invalidation>,
	/// Last-fetched profile snapshot; best-effort metadata, not trust material.
	pub profile: Option<UserProfile>,
}
impl CredentialRecord {
	/// Creates a fresh record for the provided subject with both providers unengaged.
	pub fn new(subject: SubjectId) -> Self {
		Self { subject_id: Some(subject), ..Default::default() }
	}

	/// Returns the authenticated subject, treating invalidated records as subjectless.
	pub fn subject(&self) -> Option<&SubjectId> {
		if self.invalidated.is_some() {
			return None;
		}

		self.subject_id.as_ref()
	}

	/// Returns `true` once the terminal invalidation marker is set.
	pub fn is_invalidated(&self) -> bool {
		self.invalidated.is_some()
	}

	/// Sets the terminal invalidation marker; the first recorded reason wins.
	pub fn invalidate(&mut self, reason: InvalidationReason, at: OffsetDateTime) {
		if self.invalidated.is_none() {
			self.invalidated = Some(Invalidation { reason, at });
		}
	}

	/// Returns `true` when neither provider ever obtained a credential.
	pub fn has_no_credentials(&self) -> bool {
		!self.idp.is_engaged() && !self.resource.is_engaged()
	}
}
