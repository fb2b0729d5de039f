// std
use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters for broker lifecycle activity.
#[derive(Debug, Default)]
pub struct LifecycleMetrics {
	logins: AtomicU64,
	evaluations: AtomicU64,
	refreshes: AtomicU64,
	invalidations: AtomicU64,
}
impl LifecycleMetrics {
	/// Returns the number of successful logins.
	pub fn logins(&self) -> u64 {
		self.logins.load(Ordering::Relaxed)
	}

	/// Returns the number of evaluation passes started.
	pub fn evaluations(&self) -> u64 {
		self.evaluations.load(Ordering::Relaxed)
	}

	/// Returns the number of provider refresh calls performed.
	pub fn refreshes(&self) -> u64 {
		self.refreshes.load(Ordering::Relaxed)
	}

	/// Returns the number of evaluations that ended in invalidation.
	pub fn invalidations(&self) -> u64 {
		self.invalidations.load(Ordering::Relaxed)
	}

	pub(crate) fn record_login(&self) {
		self.logins.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_evaluation(&self) {
		self.evaluations.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_refresh(&self) {
		self.refreshes.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_invalidation(&self) {
		self.invalidations.fetch_add(1, Ordering::Relaxed);
	}
}
