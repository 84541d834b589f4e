//! API client facade tying the token store, rate gate, and transport together.

pub mod builder;
pub mod config;

mod executor;
mod token;

pub use builder::*;
pub use config::*;

// self
use crate::{
	_prelude::*,
	auth::{Claims, TokenMetrics, TokenSecret, TokenStore, TokenVerifier},
	context::Context,
	http::HttpTransport,
	rate_gate::RateGate,
};
#[cfg(feature = "reqwest")] use crate::http::ReqwestTransport;

#[cfg(feature = "reqwest")]
/// Client specialized for the crate's default reqwest transport.
pub type DefaultClient = Client<ReqwestTransport>;

/// Authenticated client for a single organisation.
///
/// The client owns the transport, the token store, and the rate gate. Clones share all three,
/// so every clone observes the same token and the same rate-limit deadline. Use
/// [`Client::builder`] to construct one.
pub struct Client<T>
where
	T: ?Sized + HttpTransport,
{
	transport: Arc<T>,
	config: Arc<ClientConfig>,
	base_url: Url,
	tokens: Arc<TokenStore>,
	rate_gate: Arc<RateGate>,
}
impl Client<dyn HttpTransport> {
	/// Starts building a client for `organization_id` whose tokens are checked by `verifier`.
	pub fn builder(organization_id: impl Into<String>, verifier: TokenVerifier) -> ClientBuilder {
		ClientBuilder::new(organization_id, verifier)
	}
}
impl<T> Client<T>
where
	T: ?Sized + HttpTransport,
{
	/// Returns the static configuration.
	pub fn config(&self) -> &ClientConfig {
		&self.config
	}

	/// Returns the validated API root.
	pub fn base_url(&self) -> &Url {
		&self.base_url
	}

	/// Returns the underlying transport.
	pub fn transport(&self) -> &Arc<T> {
		&self.transport
	}

	/// Returns the token store shared by every clone of this client.
	pub fn token_store(&self) -> &TokenStore {
		&self.tokens
	}

	/// Returns counters for token exchanges performed so far.
	pub fn token_metrics(&self) -> &TokenMetrics {
		self.tokens.metrics()
	}

	/// Returns the rate gate shared by every clone of this client.
	pub fn rate_gate(&self) -> &RateGate {
		&self.rate_gate
	}

	/// Exchanges `access_key` for a new token pair and replaces the stored session.
	pub async fn create_token(
		&self,
		ctx: &Context,
		access_key: impl Into<TokenSecret>,
	) -> Result<Claims> {
		self.tokens.issue(self, ctx, &access_key.into()).await
	}

	/// Makes sure a valid bearer token is held, refreshing it if it expires soon.
	pub async fn refresh_token(&self, ctx: &Context) -> Result<TokenSecret> {
		self.tokens.ensure_valid(self, ctx).await
	}

	/// Parses and verifies `token` without storing it.
	pub fn validate_token(&self, token: &str) -> Result<Claims> {
		self.tokens.validate(token)
	}

	/// Returns the claims of the current token, if one has been issued.
	pub async fn claims(&self) -> Option<Claims> {
		self.tokens.claims().await
	}

	fn from_parts(transport: Arc<T>, config: ClientConfig, base_url: Url, tokens: TokenStore) -> Self {
		Self {
			transport,
			config: Arc::new(config),
			base_url,
			tokens: Arc::new(tokens),
			rate_gate: Default::default(),
		}
	}
}
impl<T> Clone for Client<T>
where
	T: ?Sized + HttpTransport,
{
	fn clone(&self) -> Self {
		Self {
			transport: self.transport.clone(),
			config: self.config.clone(),
			base_url: self.base_url.clone(),
			tokens: self.tokens.clone(),
			rate_gate: self.rate_gate.clone(),
		}
	}
}
impl<T> Debug for Client<T>
where
	T: ?Sized + HttpTransport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Client")
			.field("base_url", &self.base_url.as_str())
			.field("organization_id", &self.config.organization_id)
			.field("tokens", &self.tokens)
			.field("rate_gate", &self.rate_gate)
			.finish()
	}
}
