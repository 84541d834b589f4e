//! Verified claims carried by API bearer tokens.

// self
use crate::_prelude::*;

/// Decoded, verified fields of a bearer token.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
	/// Expiry as Unix epoch seconds.
	pub exp: i64,
	/// Issued-at as Unix epoch seconds.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub iat: Option<i64>,
	/// Standard subject identifier.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub sub: Option<String>,
	/// Organisation-scoped account identifier.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub fsa_id: Option<String>,
	/// Globally unique account identifier.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub uniq_id: Option<String>,
}
impl Claims {
	/// Creates claims expiring at `expires_at` with no identifiers.
	pub fn expiring_at(expires_at: OffsetDateTime) -> Self {
		Self { exp: expires_at.unix_timestamp(), iat: None, sub: None, fsa_id: None, uniq_id: None }
	}

	/// Returns the expiry instant.
	pub fn expires_at(&self) -> OffsetDateTime {
		OffsetDateTime::from_unix_timestamp(self.exp).unwrap_or(OffsetDateTime::UNIX_EPOCH)
	}

	/// Returns `true` once `now + window` reaches the expiry instant.
	pub fn expires_within(&self, now: OffsetDateTime, window: Duration) -> bool {
		now + window >= self.expires_at()
	}
}
