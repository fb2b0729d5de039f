//! Validated subject identifier for authenticated users.

// std
use std::{borrow::Borrow, ops::Deref, str::FromStr};
// self
use crate::_prelude::*;

const SUBJECT_MAX_LEN: usize = 128;

/// Error returned when subject identifier validation fails.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, ThisError)]
pub enum SubjectIdError {
	/// The identifier was empty.
	#[error("Subject identifier cannot be empty.")]
	Empty,
	/// The identifier contains whitespace characters.
	#[error("Subject identifier contains whitespace.")]
	ContainsWhitespace,
	/// The identifier exceeded the allowed character count.
	#[error("Subject identifier exceeds {max} characters.")]
	TooLong {
		/// Maximum permitted character count.
		max: usize,
	},
}

/// Stable identifier for an authenticated subject.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SubjectId(String);
impl SubjectId {
	/// Creates a new identifier after validation.
	pub fn new(value: impl AsRef<str>) -> Result<Self, SubjectIdError> {
		let view = value.as_ref();

		validate_view(view)?;

		Ok(Self(view.to_owned()))
	}
}
impl Deref for SubjectId {
	type Target = str;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}
impl AsRef<str> for SubjectId {
	fn as_ref(&self) -> &str {
		&self.0
	}
}
impl From<SubjectId> for String {
	fn from(value: SubjectId) -> Self {
		value.0
	}
}
impl TryFrom<String> for SubjectId {
	type Error = SubjectIdError;

	fn try_from(value: String) -> Result<Self, Self::Error> {
		validate_view(&value)?;

		Ok(Self(value))
	}
}
impl Borrow<str> for SubjectId {
	fn borrow(&self) -> &str {
		&self.0
	}
}
impl Debug for SubjectId {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(f, "Subject({})", self.0)
	}
}
impl Display for SubjectId {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(&self.0)
	}
}
impl FromStr for SubjectId {
	type Err = SubjectIdError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::new(s)
	}
}

fn validate_view(view: &str) -> Result<(), SubjectIdError> {
	if view.is_empty() {
		return Err(SubjectIdError::Empty);
	}
	if view.chars().any(char::is_whitespace) {
		return Err(SubjectIdError::ContainsWhitespace);
	}
	if view.len() > SUBJECT_MAX_LEN {
		return Err(SubjectIdError::TooLong { max: SUBJECT_MAX_LEN });
	}

	Ok(())
}

#[cfg(test)]
mod tests {
	// std
	use std::collections::HashMap;
	// self
	use super::*;

	#[test]
	fn subject_identifiers_validate() {
		assert_eq!(SubjectId::new(""), Err(SubjectIdError::Empty));
		assert_eq!(SubjectId::new("user 1"), Err(SubjectIdError::ContainsWhitespace));
		assert_eq!(SubjectId::new(" user-1"), Err(SubjectIdError::ContainsWhitespace));

		let subject = SubjectId::new("user-1").expect("Subject fixture should be valid.");

		assert_eq!(subject.as_ref(), "user-1");

		let exact = "a".repeat(SUBJECT_MAX_LEN);

		SubjectId::new(&exact).expect("Exact length should succeed.");
		assert_eq!(
			SubjectId::new(format!("{exact}a")),
			Err(SubjectIdError::TooLong { max: SUBJECT_MAX_LEN }),
		);
	}

	#[test]
	fn serde_round_trip_enforces_validation() {
		let subject: SubjectId =
			serde_json::from_str("\"user-42\"").expect("Subject should deserialize successfully.");

		assert_eq!(subject.as_ref(), "user-42");
		assert!(serde_json::from_str::<SubjectId>("\"with space\"").is_err());
		assert!(serde_json::from_str::<SubjectId>("\"\"").is_err());
	}

	#[test]
	fn borrow_supports_fast_lookup() {
		let map: HashMap<SubjectId, u8> = HashMap::from_iter([(
			SubjectId::new("user-7").expect("Subject used for lookup should be valid."),
			7_u8,
		)]);

		assert_eq!(map.get("user-7"), Some(&7));
	}
}
