//! The session state machine: login, lazy per-request evaluation, and verdicts.
//!
//! [`SessionBroker::evaluate_at`] runs one linear pass over the two providers (IdP
//! strictly before the Resource Service), refreshes whatever credential entered its
//! window, folds provider failures into the verdict, and never mutates the caller's
//! record — the returned [`Evaluation`] carries the successor record to persist.

mod metrics;

pub mod policy;

pub use metrics::LifecycleMetrics;
pub use policy::{CredentialState, ProviderPolicy, RefreshPolicy};

// self
use crate::{
	_prelude::*,
	clock::TimeSource,
	credential::{CredentialRecord, InvalidationReason, ProviderCredential, SubjectId},
	error::{ExchangeError, RefreshError},
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	provider::{ProfileSource, ProviderClient},
};

/// Binary outcome of one evaluation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Verdict {
	/// Session is valid for the contained subject.
	Valid {
		/// Authenticated subject identifier.
		subject: SubjectId,
	},
	/// Session is invalid; the user must sign in again.
	Invalid,
}
impl Verdict {
	/// Returns `true` for the valid variant.
	pub fn is_valid(&self) -> bool {
		matches!(self, Verdict::Valid { .. })
	}
}

/// Result of one evaluation pass.
#[derive(Clone, Debug)]
pub struct Evaluation {
	/// Successor record the host should persist in place of the input.
	pub record: CredentialRecord,
	/// Session validity verdict for this request.
	pub verdict: Verdict,
}

enum ProviderStep {
	Settled { refreshed: bool },
	Invalidated(InvalidationReason),
}

/// Orchestrates the credential lifecycle for one session at a time.
///
/// The broker owns no session state itself: the hosting layer passes the previous
/// [`CredentialRecord`] into every call and persists the returned successor, serializing
/// evaluations per subject.
pub struct SessionBroker {
	idp: Arc<dyn ProviderClient>,
	resource: Arc<dyn ProviderClient>,
	profiles: Option<Arc<dyn ProfileSource>>,
	clock: Arc<dyn TimeSource>,
	policy: RefreshPolicy,
	metrics: Arc<LifecycleMetrics>,
}
impl SessionBroker {
	/// Creates a broker over the two provider clients and a time source.
	pub fn new(
		idp: Arc<dyn ProviderClient>,
		resource: Arc<dyn ProviderClient>,
		clock: Arc<dyn TimeSource>,
	) -> Self {
		Self {
			idp,
			resource,
			profiles: None,
			clock,
			policy: RefreshPolicy::default(),
			metrics: Default::default(),
		}
	}

	/// Attaches a best-effort profile enrichment source.
	pub fn with_profile_source(mut self, profiles: Arc<dyn ProfileSource>) -> Self {
		self.profiles = Some(profiles);

		self
	}

	/// Overrides the per-provider refresh windows.
	pub fn with_policy(mut self, policy: RefreshPolicy) -> Self {
		self.policy = policy;

		self
	}

	/// Returns the lifecycle counters shared by this broker.
	pub fn metrics(&self) -> &LifecycleMetrics {
		&self.metrics
	}

	/// Performs the login-time identity exchange and builds a brand-new record.
	///
	/// The IdP exchange is mandatory; its failure surfaces as [`Error::Exchange`] and no
	/// record is created. The secondary Resource Service exchange is keyed off the fresh
	/// IdP access token; its failure leaves the resource slot unengaged, which the next
	/// evaluation will surface as a dead credential.
	pub async fn login(&self, assertion: &str) -> Result<CredentialRecord> {
		const KIND: FlowKind = FlowKind::Login;

		let span = FlowSpan::new(KIND, "login");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span.instrument(self.login_inner(assertion)).await;

		match &result {
			Ok(_) => obs::record_flow_outcome(KIND, FlowOutcome::Success),
			Err(_) => obs::record_flow_outcome(KIND, FlowOutcome::Failure),
		}

		result
	}

	/// Evaluates a record at the injected time source's current instant.
	pub async fn evaluate(&self, record: &CredentialRecord) -> Result<Evaluation> {
		let now = self.clock.now()?;

		self.evaluate_at(record, now).await
	}

	/// Runs one lifecycle pass over the record at an explicit instant.
	///
	/// Provider refresh failures fold into the verdict and never escape as errors; the
	/// only hard failures are a broken time source and invariant violations.
	pub async fn evaluate_at(
		&self,
		record: &CredentialRecord,
		now: OffsetDateTime,
	) -> Result<Evaluation> {
		const KIND: FlowKind = FlowKind::Evaluate;

		let span = FlowSpan::new(KIND, "evaluate_at");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span.instrument(self.evaluate_inner(record, now)).await;

		match &result {
			Ok(_) => obs::record_flow_outcome(KIND, FlowOutcome::Success),
			Err(_) => obs::record_flow_outcome(KIND, FlowOutcome::Failure),
		}

		result
	}

	async fn login_inner(&self, assertion: &str) -> Result<CredentialRecord> {
		let primary = self.idp.exchange_identity(assertion).await.map_err(Error::Exchange)?;
		let subject =
			primary.subject.clone().ok_or(Error::Exchange(ExchangeError::MissingSubject))?;
		let mut record = CredentialRecord::new(subject);

		record.idp = ProviderCredential::from_exchange(&primary);

		match self.resource.exchange_identity(primary.access_token.expose()).await {
			Ok(secondary) => {
				record.resource = ProviderCredential::from_exchange(&secondary);

				self.enrich_profile(&mut record).await;
			},
			Err(err) => obs::record_best_effort_failure("secondary_exchange", &err),
		}

		self.metrics.record_login();

		Ok(record)
	}

	async fn evaluate_inner(
		&self,
		record: &CredentialRecord,
		now: OffsetDateTime,
	) -> Result<Evaluation> {
		self.metrics.record_evaluation();

		// Terminal marker short-circuits: no provider work, ever.
		if record.is_invalidated() {
			return Ok(Evaluation { record: record.clone(), verdict: Verdict::Invalid });
		}

		let mut next = record.clone();

		if next.has_no_credentials() {
			return Ok(self.condemn(next, InvalidationReason::NoCredentials, now));
		}

		// IdP strictly before the Resource Service: a live IdP identity is the
		// precondition for the resource credential staying meaningful.
		let step = self.advance(self.idp.as_ref(), &self.policy.idp, &mut next.idp, now).await;

		if let ProviderStep::Invalidated(reason) = step {
			return Ok(self.condemn(next, reason, now));
		}

		let step = self
			.advance(self.resource.as_ref(), &self.policy.resource, &mut next.resource, now)
			.await;

		match step {
			ProviderStep::Invalidated(reason) => Ok(self.condemn(next, reason, now)),
			ProviderStep::Settled { refreshed } => {
				if refreshed {
					self.enrich_profile(&mut next).await;
				}

				let Some(subject) = next.subject().cloned() else {
					return Err(Error::Invariant {
						detail: "record holds live credentials but no subject",
					});
				};

				Ok(Evaluation { record: next, verdict: Verdict::Valid { subject } })
			},
		}
	}

	async fn advance(
		&self,
		client: &dyn ProviderClient,
		policy: &ProviderPolicy,
		credential: &mut ProviderCredential,
		now: OffsetDateTime,
	) -> ProviderStep {
		let kind = client.kind();

		match policy.state_at(credential, now) {
			CredentialState::Fresh => ProviderStep::Settled { refreshed: false },
			CredentialState::Dead =>
				ProviderStep::Invalidated(InvalidationReason::DeadCredential(kind)),
			CredentialState::DueForRefresh | CredentialState::Expired => {
				let Some(refresh_token) = credential.refresh_token.clone() else {
					return ProviderStep::Invalidated(InvalidationReason::DeadCredential(kind));
				};
				let span = FlowSpan::new(FlowKind::Refresh, kind.as_str());

				obs::record_flow_outcome(FlowKind::Refresh, FlowOutcome::Attempt);
				self.metrics.record_refresh();

				let outcome = span.instrument(client.refresh(refresh_token.expose())).await;

				match outcome {
					Ok(grant) => {
						obs::record_flow_outcome(FlowKind::Refresh, FlowOutcome::Success);
						// The triple is replaced only after the call fully resolved.
						credential.apply_refresh(grant);

						ProviderStep::Settled { refreshed: true }
					},
					Err(RefreshError::Unauthorized { .. }) => {
						obs::record_flow_outcome(FlowKind::Refresh, FlowOutcome::Failure);

						ProviderStep::Invalidated(InvalidationReason::RefreshRejected(kind))
					},
					Err(err @ RefreshError::Transient { .. }) => {
						obs::record_flow_outcome(FlowKind::Refresh, FlowOutcome::Failure);

						if policy.tolerates_transient_failure(credential, now) {
							// Keep the stale triple untouched; the next request retries.
							obs::record_best_effort_failure("refresh_retry_deferred", &err);

							ProviderStep::Settled { refreshed: false }
						} else {
							ProviderStep::Invalidated(InvalidationReason::RefreshFailed(kind))
						}
					},
				}
			},
		}
	}

	async fn enrich_profile(&self, record: &mut CredentialRecord) {
		let Some(profiles) = &self.profiles else {
			return;
		};
		let Some(access_token) = record.resource.access_token.clone() else {
			return;
		};

		match profiles.fetch_profile(access_token.expose()).await {
			Ok(profile) => record.profile = Some(profile),
			// The previously cached snapshot, if any, stays in place.
			Err(err) => obs::record_best_effort_failure("profile_enrichment", &err),
		}
	}

	fn condemn(
		&self,
		mut record: CredentialRecord,
		reason: InvalidationReason,
		now: OffsetDateTime,
	) -> Evaluation {
		obs::record_invalidation(&reason);
		self.metrics.record_invalidation();
		record.invalidate(reason, now);

		Evaluation { record, verdict: Verdict::Invalid }
	}
}
impl Debug for SessionBroker {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("SessionBroker")
			.field("policy", &self.policy)
			.field("profile_source_set", &self.profiles.is_some())
			.finish()
	}
}
