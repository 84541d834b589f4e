//! RFC 3339 timestamp wrapper that tolerates the API's "unset" encodings.

// crates.io
use serde::{Deserializer, Serializer, de::Error as _, ser::Error as _};
use time::format_description::well_known::Rfc3339;
// self
use crate::_prelude::*;

/// Domain timestamp as returned by the API.
///
/// The API encodes missing dates as either JSON `null` or an empty string; both decode to an
/// unset value instead of failing. Structs that may omit the field entirely should mark it with
/// `#[serde(default)]`.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Timestamp(Option<OffsetDateTime>);
impl Timestamp {
	/// Timestamp carrying no value.
	pub const UNSET: Self = Self(None);

	/// Wraps a concrete instant.
	pub const fn new(instant: OffsetDateTime) -> Self {
		Self(Some(instant))
	}

	/// Returns the wrapped instant, if set.
	pub const fn get(&self) -> Option<OffsetDateTime> {
		self.0
	}

	/// Returns `true` when the API omitted the value.
	pub const fn is_unset(&self) -> bool {
		self.0.is_none()
	}
}
impl From<OffsetDateTime> for Timestamp {
	fn from(instant: OffsetDateTime) -> Self {
		Self::new(instant)
	}
}
impl Debug for Timestamp {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		match self.0 {
			Some(instant) => write!(f, "Timestamp({instant})"),
			None => f.write_str("Timestamp(unset)"),
		}
	}
}
impl Serialize for Timestamp {
	fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		match self.0 {
			Some(instant) => {
				let formatted = instant.format(&Rfc3339).map_err(S::Error::custom)?;

				serializer.serialize_str(&formatted)
			},
			None => serializer.serialize_none(),
		}
	}
}
impl<'de> Deserialize<'de> for Timestamp {
	fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
	where
		D: Deserializer<'de>,
	{
		let raw = <Option<String>>::deserialize(deserializer)?;

		match raw.as_deref() {
			None | Some("") => Ok(Self::UNSET),
			Some(value) => OffsetDateTime::parse(value, &Rfc3339)
				.map(Self::new)
				.map_err(|e| D::Error::custom(format!("invalid RFC 3339 timestamp `{value}`: {e}"))),
		}
	}
}
