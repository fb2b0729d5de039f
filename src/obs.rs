//! Optional observability helpers for broker flows.
//!
//! # Feature Flags
//!
//! - Enable `tracing` to emit structured spans named `session_broker.flow` with the `flow`
//!   (entry point) and `stage` (call site) fields, plus warn events for invalidations and
//!   absorbed best-effort failures.
//! - Enable `metrics` to increment the `session_broker_flow_total` counter for every
//!   attempt/success/failure, labeled by `flow` + `outcome`, and the
//!   `session_broker_invalidation_total` counter labeled by diagnostic reason tag.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::{_prelude::*, credential::InvalidationReason};

/// Broker flow kinds observed in spans and counters.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlowKind {
	/// Login-time identity exchange.
	Login,
	/// Per-request lifecycle evaluation.
	Evaluate,
	/// Single-provider refresh call.
	Refresh,
}
impl FlowKind {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			FlowKind::Login => "login",
			FlowKind::Evaluate => "evaluate",
			FlowKind::Refresh => "refresh",
		}
	}
}
impl Display for FlowKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlowOutcome {
	/// Entry to a broker helper.
	Attempt,
	/// Successful completion.
	Success,
	/// Failure propagated back to the caller or folded into the verdict.
	Failure,
}
impl FlowOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			FlowOutcome::Attempt => "attempt",
			FlowOutcome::Success => "success",
			FlowOutcome::Failure => "failure",
		}
	}
}
impl Display for FlowOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Records a terminal invalidation with its diagnostic reason tag.
pub fn record_invalidation(reason: &InvalidationReason) {
	#[cfg(feature = "tracing")]
	{
		::tracing::warn!(reason = %reason, tag = reason.tag(), "session invalidated");
	}
	#[cfg(feature = "metrics")]
	{
		::metrics::counter!("session_broker_invalidation_total", "reason" => reason.tag())
			.increment(1);
	}
	#[cfg(not(any(feature = "tracing", feature = "metrics")))]
	{
		let _ = reason;
	}
}

/// Records an absorbed best-effort failure (profile enrichment, deferred refresh retry).
pub fn record_best_effort_failure(stage: &'static str, error: &dyn Display) {
	#[cfg(feature = "tracing")]
	{
		::tracing::warn!(stage, error = %error, "best-effort operation failed");
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (stage, error);
	}
}
