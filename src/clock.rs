//! Wall-clock abstraction injected into the broker so evaluations are reproducible.

// self
use crate::_prelude::*;

/// Error raised when a time source cannot produce the current instant.
///
/// The one runtime condition the broker propagates as a hard error instead of folding
/// into the verdict.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
#[error("Time source failed: {message}.")]
pub struct ClockError {
	/// Human-readable failure summary.
	pub message: String,
}
impl ClockError {
	/// Creates a new clock error with the provided message.
	pub fn new(message: impl Into<String>) -> Self {
		Self { message: message.into() }
	}
}

/// Supplies the instant every lifecycle decision is evaluated against.
pub trait TimeSource: Send + Sync {
	/// Returns the current wall-clock instant.
	fn now(&self) -> Result<OffsetDateTime, ClockError>;
}

/// Production time source backed by the system clock.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;
impl TimeSource for SystemClock {
	fn now(&self) -> Result<OffsetDateTime, ClockError> {
		Ok(OffsetDateTime::now_utc())
	}
}

/// Settable time source for tests and replay tooling.
#[derive(Debug)]
pub struct ManualClock(Mutex<OffsetDateTime>);
impl ManualClock {
	/// Creates a clock pinned at the provided instant.
	pub fn starting_at(instant: OffsetDateTime) -> Self {
		Self(Mutex::new(instant))
	}

	/// Replaces the current instant.
	pub fn set(&self, instant: OffsetDateTime) {
		*self.0.lock() = instant;
	}

	/// Advances the current instant by the provided duration.
	pub fn advance(&self, delta: Duration) {
		*self.0.lock() += delta;
	}
}
impl TimeSource for ManualClock {
	fn now(&self) -> Result<OffsetDateTime, ClockError> {
		Ok(*self.0.lock())
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros;
	// self
	use super::*;

	#[test]
	fn manual_clock_sets_and_advances() {
		let clock = ManualClock::starting_at(macros::datetime!(2025-01-01 00:00 UTC));

		assert_eq!(
			clock.now().expect("Manual clock should always produce an instant."),
			macros::datetime!(2025-01-01 00:00 UTC),
		);

		clock.advance(Duration::minutes(90));

		assert_eq!(
			clock.now().expect("Manual clock should always produce an instant."),
			macros::datetime!(2025-01-01 01:30 UTC),
		);

		clock.set(macros::datetime!(2025-02-01 12:00 UTC));

		assert_eq!(
			clock.now().expect("Manual clock should always produce an instant."),
			macros::datetime!(2025-02-01 12:00 UTC),
		);
	}
}
