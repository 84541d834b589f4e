//! Static client configuration.

// self
use crate::{_prelude::*, error::ConfigError};

/// Production API root.
pub const PRODUCTION_URL: &str = "https://fsa.fairgate.ch/";
/// Test environment API root.
pub const TEST_URL: &str = "https://fsa-test.fairgate.ch/";

/// Settings shared by every request issued through a [`Client`](super::Client).
///
/// Every field has a default, so a configuration file only needs to name the organisation:
///
/// ```
/// let config: fairgate::client::ClientConfig =
/// 	serde_json::from_str(r#"{"organization_id":"org-1"}"#).unwrap();
///
/// assert_eq!(config.base_url, fairgate::client::PRODUCTION_URL);
/// assert_eq!(config.accept_language, "en");
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
	/// API root every request path is resolved against.
	pub base_url: String,
	/// Organisation identifier addressing the auth endpoints.
	pub organization_id: String,
	/// `User-Agent` header value.
	pub user_agent: String,
	/// `Accept-Language` header value.
	pub accept_language: String,
	/// How long before expiry a token is proactively refreshed.
	#[serde(with = "seconds")]
	pub refresh_window: Duration,
	/// Ceiling on consecutive 429 retries per call; `None` retries until the caller cancels.
	pub max_rate_limit_retries: Option<u32>,
}
impl ClientConfig {
	/// Creates the default configuration for `organization_id`.
	pub fn new(organization_id: impl Into<String>) -> Self {
		Self { organization_id: organization_id.into(), ..Default::default() }
	}

	/// Builds the `User-Agent` sent when none is configured.
	pub fn default_user_agent() -> String {
		format!(
			"fairgate-rs/{} ({}/{})",
			env!("CARGO_PKG_VERSION"),
			std::env::consts::OS,
			std::env::consts::ARCH
		)
	}

	/// Checks the invariants the request pipeline relies on and returns the parsed API root.
	///
	/// The returned URL always ends with `/` so request paths append to it instead of
	/// replacing its last segment.
	pub fn validate(&self) -> Result<Url, ConfigError> {
		if self.organization_id.trim().is_empty() {
			return Err(ConfigError::MissingOrganizationId);
		}

		let mut url =
			Url::parse(&self.base_url).map_err(|source| ConfigError::InvalidUrl { source })?;

		if !matches!(url.scheme(), "http" | "https") || url.cannot_be_a_base() {
			return Err(ConfigError::InvalidBaseUrl { url: self.base_url.clone() });
		}
		if !url.path().ends_with('/') {
			let path = format!("{}/", url.path());

			url.set_path(&path);
		}

		Ok(url)
	}
}
impl Default for ClientConfig {
	fn default() -> Self {
		Self {
			base_url: PRODUCTION_URL.into(),
			organization_id: String::new(),
			user_agent: Self::default_user_agent(),
			accept_language: "en".into(),
			refresh_window: Duration::minutes(2),
			max_rate_limit_retries: None,
		}
	}
}

mod seconds {
	// self
	use crate::_prelude::*;

	pub fn serialize<S>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: serde::Serializer,
	{
		serializer.serialize_i64(value.whole_seconds())
	}

	pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
	where
		D: serde::Deserializer<'de>,
	{
		i64::deserialize(deserializer).map(Duration::seconds)
	}
}
