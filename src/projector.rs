//! Read-only projection of a credential record into the externally consumed session view.

// self
use crate::{
	_prelude::*,
	credential::{CredentialRecord, SubjectId, TokenSecret, UserProfile},
};

/// Externally exposed read model; every page-level collaborator depends on this shape
/// only, never on [`CredentialRecord`] internals.
///
/// An invalid session never explains itself here: the invalidation reason stays inside
/// the record for diagnostics while consumers uniformly ask the user to sign in again.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionView {
	/// Whether the session is currently trusted.
	pub is_valid: bool,
	/// Authenticated subject, absent for invalid sessions.
	pub subject_id: Option<SubjectId>,
	/// Current IdP access token.
	pub idp_access_token: Option<TokenSecret>,
	/// Current Resource Service access token.
	pub resource_access_token: Option<TokenSecret>,
	/// Cached profile snapshot, when enrichment has succeeded.
	pub profile: Option<UserProfile>,
	/// Expiry signal consumers may check instead of (or in addition to) `is_valid`;
	/// pinned to the Unix epoch for invalid sessions so both signals fail closed.
	pub valid_until: OffsetDateTime,
}
impl SessionView {
	/// Explicit "no session" marker for hosts that carry no record at all.
	pub fn signed_out() -> Self {
		Self {
			is_valid: false,
			subject_id: None,
			idp_access_token: None,
			resource_access_token: None,
			profile: None,
			valid_until: OffsetDateTime::UNIX_EPOCH,
		}
	}
}

/// Projects a credential record into the view consumed by the rest of the application.
///
/// Pure and read-only; hosts should project the record returned by the latest broker
/// evaluation. Invalidated or subjectless records project as signed out.
pub fn project(record: &CredentialRecord, now: OffsetDateTime) -> SessionView {
	let Some(subject) = record.subject().cloned() else {
		return SessionView::signed_out();
	};
	if record.has_no_credentials() {
		return SessionView::signed_out();
	}

	let valid_until = match (record.idp.expires_at, record.resource.expires_at) {
		(Some(idp), Some(resource)) => idp.min(resource),
		(Some(idp), None) => idp,
		(None, Some(resource)) => resource,
		// Engaged but non-expiring slots: force consumers back through an evaluation.
		(None, None) => now,
	};

	SessionView {
		is_valid: true,
		subject_id: Some(subject),
		idp_access_token: record.idp.access_token.clone(),
		resource_access_token: record.resource.access_token.clone(),
		profile: record.profile.clone(),
		valid_until,
	}
}
