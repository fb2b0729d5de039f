//! Cached user profile snapshot fetched opportunistically from the Resource Service.

// self
use crate::_prelude::*;

/// Best-effort profile metadata; never part of the trust decision.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
	/// Human-readable display name.
	pub display_name: Option<String>,
	/// Avatar or photo URL.
	pub picture_url: Option<String>,
	/// Organizational position or title.
	pub position: Option<String>,
}
impl UserProfile {
	/// Returns `true` when every field is absent.
	pub fn is_empty(&self) -> bool {
		self.display_name.is_none() && self.picture_url.is_none() && self.position.is_none()
	}
}
