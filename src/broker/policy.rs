//! Per-provider refresh windows and the credential state classification.

// self
use crate::{_prelude::*, credential::ProviderCredential};

/// Lifecycle state of one provider credential at an evaluation instant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CredentialState {
	/// Credential is comfortably inside its validity window; no action needed.
	Fresh,
	/// Credential entered the proactive refresh window (or its grace tail); a refresh
	/// should be attempted.
	DueForRefresh,
	/// Credential is past expiry and any grace; a failed refresh is terminal.
	Expired,
	/// Credential cannot be renewed: expired or unprovisioned with no refresh token.
	Dead,
}

/// Refresh window configuration for a single provider.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderPolicy {
	/// Lead time before expiry at which a proactive refresh is attempted.
	pub refresh_window: Duration,
	/// Tolerance past expiry during which a transient refresh failure keeps the existing
	/// credential for a later retry instead of invalidating. Zero disables retention
	/// entirely.
	pub grace: Duration,
}
impl ProviderPolicy {
	/// Default proactive refresh lead time.
	pub const DEFAULT_REFRESH_WINDOW: Duration = Duration::minutes(5);
	/// Default IdP grace tail.
	pub const DEFAULT_IDP_GRACE: Duration = Duration::hours(1);

	/// Creates a policy with the provided windows.
	pub const fn new(refresh_window: Duration, grace: Duration) -> Self {
		Self { refresh_window, grace }
	}

	/// Classifies a credential at the provided instant.
	pub fn state_at(&self, credential: &ProviderCredential, now: OffsetDateTime) -> CredentialState {
		let Some(expires_at) = credential.expires_at else {
			if credential.access_token.is_some() {
				return CredentialState::Fresh;
			}

			// An authenticated record with an unprovisioned slot cannot be trusted
			// unless a refresh token can still mint the credential.
			return if credential.refresh_token.is_some() {
				CredentialState::DueForRefresh
			} else {
				CredentialState::Dead
			};
		};

		if now < expires_at - self.refresh_window {
			return CredentialState::Fresh;
		}
		if credential.refresh_token.is_none() {
			return CredentialState::Dead;
		}
		if now < expires_at + self.grace {
			CredentialState::DueForRefresh
		} else {
			CredentialState::Expired
		}
	}

	/// Returns `true` when a transient refresh failure at `now` should keep the existing
	/// credential for a later retry instead of condemning the record.
	pub fn tolerates_transient_failure(
		&self,
		credential: &ProviderCredential,
		now: OffsetDateTime,
	) -> bool {
		if !self.grace.is_positive() {
			return false;
		}

		credential.expires_at.is_some_and(|expires_at| now < expires_at + self.grace)
	}
}

/// Paired policies for the broker's two providers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshPolicy {
	/// IdP windows; grace defaults to one hour.
	pub idp: ProviderPolicy,
	/// Resource Service windows; grace defaults to zero (invalidate immediately).
	pub resource: ProviderPolicy,
}
impl RefreshPolicy {
	/// Overrides the IdP policy.
	pub fn with_idp(mut self, policy: ProviderPolicy) -> Self {
		self.idp = policy;

		self
	}

	/// Overrides the Resource Service policy.
	pub fn with_resource(mut self, policy: ProviderPolicy) -> Self {
		self.resource = policy;

		self
	}
}
impl Default for RefreshPolicy {
	fn default() -> Self {
		Self {
			idp: ProviderPolicy::new(
				ProviderPolicy::DEFAULT_REFRESH_WINDOW,
				ProviderPolicy::DEFAULT_IDP_GRACE,
			),
			resource: ProviderPolicy::new(ProviderPolicy::DEFAULT_REFRESH_WINDOW, Duration::ZERO),
		}
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros;
	// self
	use super::*;
	use crate::credential::TokenSecret;

	fn credential(refresh: Option<&str>, expires_at: OffsetDateTime) -> ProviderCredential {
		ProviderCredential {
			access_token: Some(TokenSecret::new("access")),
			refresh_token: refresh.map(TokenSecret::new),
			expires_at: Some(expires_at),
		}
	}

	#[test]
	fn refresh_window_boundaries_are_inclusive_at_window_start() {
		let policy = RefreshPolicy::default().idp;
		let expires_at = macros::datetime!(2025-01-01 01:00 UTC);
		let credential = credential(Some("refresh"), expires_at);
		let window_start = expires_at - policy.refresh_window;

		assert_eq!(
			policy.state_at(&credential, window_start - Duration::seconds(1)),
			CredentialState::Fresh,
		);
		assert_eq!(policy.state_at(&credential, window_start), CredentialState::DueForRefresh);
		assert_eq!(
			policy.state_at(&credential, window_start + Duration::seconds(1)),
			CredentialState::DueForRefresh,
		);
	}

	#[test]
	fn idp_grace_tail_extends_due_state_past_expiry() {
		let policy = RefreshPolicy::default().idp;
		let expires_at = macros::datetime!(2025-01-01 01:00 UTC);
		let credential = credential(Some("refresh"), expires_at);

		assert_eq!(
			policy.state_at(&credential, expires_at + Duration::seconds(1)),
			CredentialState::DueForRefresh,
		);
		assert_eq!(
			policy.state_at(&credential, expires_at + policy.grace),
			CredentialState::Expired,
		);
		assert!(policy.tolerates_transient_failure(&credential, expires_at + Duration::seconds(1)));
		assert!(!policy.tolerates_transient_failure(&credential, expires_at + policy.grace));
	}

	#[test]
	fn zero_grace_never_tolerates_transient_failures() {
		let policy = RefreshPolicy::default().resource;
		let expires_at = macros::datetime!(2025-01-01 01:00 UTC);
		let credential = credential(Some("refresh"), expires_at);
		let in_window = expires_at - Duration::seconds(1);

		assert_eq!(policy.state_at(&credential, in_window), CredentialState::DueForRefresh);
		assert!(!policy.tolerates_transient_failure(&credential, in_window));
		assert_eq!(policy.state_at(&credential, expires_at), CredentialState::Expired);
	}

	#[test]
	fn missing_refresh_token_is_dead_once_the_window_opens() {
		let policy = RefreshPolicy::default().idp;
		let expires_at = macros::datetime!(2025-01-01 01:00 UTC);
		let credential = credential(None, expires_at);

		assert_eq!(
			policy.state_at(&credential, expires_at - Duration::hours(1)),
			CredentialState::Fresh,
		);
		assert_eq!(
			policy.state_at(&credential, expires_at - policy.refresh_window),
			CredentialState::Dead,
		);
		assert_eq!(
			policy.state_at(&credential, expires_at + Duration::days(1)),
			CredentialState::Dead,
		);
	}

	#[test]
	fn unprovisioned_slots_classify_by_renewability() {
		let policy = RefreshPolicy::default().resource;
		let now = macros::datetime!(2025-01-01 00:00 UTC);

		assert_eq!(
			policy.state_at(&ProviderCredential::default(), now),
			CredentialState::Dead,
		);
		assert_eq!(
			policy.state_at(
				&ProviderCredential {
					refresh_token: Some(TokenSecret::new("refresh")),
					..Default::default()
				},
				now,
			),
			CredentialState::DueForRefresh,
		);
		assert_eq!(
			policy.state_at(
				&ProviderCredential {
					access_token: Some(TokenSecret::new("access")),
					..Default::default()
				},
				now,
			),
			CredentialState::Fresh,
		);
	}
}
