//! Fluent construction of [`Client`] values.

// self
use crate::{
	_prelude::*,
	auth::{TokenSecret, TokenStore, TokenVerifier},
	client::{Client, ClientConfig, TEST_URL},
	http::HttpTransport,
};
#[cfg(feature = "reqwest")] use crate::http::ReqwestTransport;

/// Builder for [`Client`] values.
#[derive(Debug)]
pub struct ClientBuilder {
	/// Configuration the client will be built with.
	pub config: ClientConfig,
	/// Verifier applied to every token the API hands out.
	pub verifier: TokenVerifier,
	/// Access key used to mint the first token lazily.
	pub access_key: Option<TokenSecret>,
}
impl ClientBuilder {
	/// Creates a builder for `organization_id` with default configuration.
	pub fn new(organization_id: impl Into<String>, verifier: TokenVerifier) -> Self {
		Self { config: ClientConfig::new(organization_id), verifier, access_key: None }
	}

	/// Replaces the whole configuration.
	pub fn config(mut self, config: ClientConfig) -> Self {
		self.config = config;

		self
	}

	/// Overrides the API root.
	pub fn base_url(mut self, url: impl Into<String>) -> Self {
		self.config.base_url = url.into();

		self
	}

	/// Targets the test environment instead of production.
	pub fn test_environment(self) -> Self {
		self.base_url(TEST_URL)
	}

	/// Sets the access key used to mint tokens on demand.
	pub fn access_key(mut self, access_key: impl Into<TokenSecret>) -> Self {
		self.access_key = Some(access_key.into());

		self
	}

	/// Overrides the `User-Agent` header.
	pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
		self.config.user_agent = user_agent.into();

		self
	}

	/// Overrides the `Accept-Language` header.
	pub fn accept_language(mut self, language: impl Into<String>) -> Self {
		self.config.accept_language = language.into();

		self
	}

	/// Overrides how long before expiry tokens are refreshed.
	pub fn refresh_window(mut self, window: Duration) -> Self {
		self.config.refresh_window = window;

		self
	}

	/// Caps consecutive 429 retries per call.
	pub fn max_rate_limit_retries(mut self, retries: u32) -> Self {
		self.config.max_rate_limit_retries = Some(retries);

		self
	}

	/// Builds a client backed by the bundled reqwest transport.
	#[cfg(feature = "reqwest")]
	pub fn build(self) -> Result<Client<ReqwestTransport>> {
		let transport = ReqwestTransport::new()?;

		self.build_with_transport(Arc::new(transport))
	}

	/// Builds a client backed by `transport`.
	pub fn build_with_transport<T>(self, transport: Arc<T>) -> Result<Client<T>>
	where
		T: ?Sized + HttpTransport,
	{
		let base_url = self.config.validate()?;
		let mut tokens =
			TokenStore::new(self.verifier).with_refresh_window(self.config.refresh_window);

		if let Some(access_key) = self.access_key {
			tokens = tokens.with_access_key(access_key);
		}

		Ok(Client::from_parts(transport, self.config, base_url, tokens))
	}
}
