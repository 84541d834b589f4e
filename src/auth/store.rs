//! Per-client token store with a single-critical-section refresh.
//!
//! One async lock covers the whole "inspect expiry → exchange → verify → replace" sequence.
//! The first caller that finds the token near expiry performs the network exchange while every
//! other caller waits on the lock and then observes the refreshed token, so at most one exchange
//! is ever in flight per store. A failed exchange or a token that does not verify leaves the
//! previous session untouched.

// self
use crate::{
	_prelude::*,
	auth::{Claims, TokenMetrics, TokenSecret, TokenVerifier},
	context::Context,
	obs::{self, Operation, OperationSpan, Outcome},
};

/// Boxed future returned by [`TokenExchange`] calls.
pub type ExchangeFuture<'a> = Pin<Box<dyn Future<Output = Result<TokenPair>> + 'a + Send>>;

/// Network side of the token lifecycle.
///
/// The client implements this against the API's auth endpoints; tests substitute scripted
/// exchanges.
pub trait TokenExchange
where
	Self: Send + Sync,
{
	/// Exchanges an access key for a fresh token pair.
	fn create<'a>(&'a self, ctx: &'a Context, access_key: &'a TokenSecret) -> ExchangeFuture<'a>;

	/// Exchanges a refresh token for a fresh token pair.
	fn refresh<'a>(&'a self, ctx: &'a Context, refresh_token: &'a TokenSecret)
	-> ExchangeFuture<'a>;
}

/// Token pair returned by the auth endpoints.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TokenPair {
	/// Signed bearer token.
	pub token: TokenSecret,
	/// Refresh token, when the API issued one.
	#[serde(default)]
	pub refresh_token: Option<TokenSecret>,
}

/// Verified token state held by a [`TokenStore`].
#[derive(Clone, Debug)]
pub struct Session {
	/// Current bearer token.
	pub token: TokenSecret,
	/// Current refresh token, if any.
	pub refresh_token: Option<TokenSecret>,
	/// Claims verified from `token`.
	pub claims: Claims,
}

/// Owns the current bearer token, its refresh token, and the verified claims.
pub struct TokenStore {
	verifier: TokenVerifier,
	access_key: Option<TokenSecret>,
	refresh_window: Duration,
	session: AsyncMutex<Option<Session>>,
	metrics: TokenMetrics,
}
impl TokenStore {
	/// Refresh tokens this long before they expire.
	pub const DEFAULT_REFRESH_WINDOW: Duration = Duration::minutes(2);

	/// Creates an empty store that verifies tokens with `verifier`.
	pub fn new(verifier: TokenVerifier) -> Self {
		Self {
			verifier,
			access_key: None,
			refresh_window: Self::DEFAULT_REFRESH_WINDOW,
			session: AsyncMutex::new(None),
			metrics: TokenMetrics::default(),
		}
	}

	/// Configures the access key used to lazily mint the first token.
	pub fn with_access_key(mut self, access_key: impl Into<TokenSecret>) -> Self {
		let access_key = access_key.into();

		self.access_key = if access_key.is_empty() { None } else { Some(access_key) };

		self
	}

	/// Overrides the refresh window (defaults to two minutes); negative values clamp to zero.
	pub fn with_refresh_window(mut self, window: Duration) -> Self {
		self.refresh_window = if window.is_negative() { Duration::ZERO } else { window };

		self
	}

	/// Returns the exchange counters.
	pub fn metrics(&self) -> &TokenMetrics {
		&self.metrics
	}

	/// Returns the verifier used for new tokens.
	pub fn verifier(&self) -> &TokenVerifier {
		&self.verifier
	}

	/// Returns `true` when an access key is configured.
	pub fn has_access_key(&self) -> bool {
		self.access_key.is_some()
	}

	/// Parses and verifies `token` without touching the stored session.
	///
	/// This is pure and therefore does not take the session lock.
	pub fn validate(&self, token: &str) -> Result<Claims> {
		self.verifier.verify(token)
	}

	/// Returns a snapshot of the current session.
	pub async fn session(&self) -> Option<Session> {
		self.session.lock().await.clone()
	}

	/// Returns the claims of the current token.
	pub async fn claims(&self) -> Option<Claims> {
		self.session.lock().await.as_ref().map(|session| session.claims.clone())
	}

	/// Drops the current session so the next call re-issues from the access key.
	pub async fn clear(&self) {
		*self.session.lock().await = None;
	}

	/// Exchanges `access_key` for a new token pair and replaces the session.
	pub async fn issue<E>(
		&self,
		exchange: &E,
		ctx: &Context,
		access_key: &TokenSecret,
	) -> Result<Claims>
	where
		E: ?Sized + TokenExchange,
	{
		let mut session = self.lock(ctx).await?;

		self.issue_locked(&mut session, exchange, ctx, access_key).await
	}

	/// Makes sure a token valid beyond the refresh window is held and returns it.
	pub async fn ensure_valid<E>(&self, exchange: &E, ctx: &Context) -> Result<TokenSecret>
	where
		E: ?Sized + TokenExchange,
	{
		self.ensure_valid_with(exchange, ctx, OffsetDateTime::now_utc).await
	}

	// The clock is read only once the lock is held, so a caller that queued behind a refresh
	// judges expiry at the moment it gets its turn.
	async fn ensure_valid_with<E, C>(
		&self,
		exchange: &E,
		ctx: &Context,
		clock: C,
	) -> Result<TokenSecret>
	where
		E: ?Sized + TokenExchange,
		C: FnOnce() -> OffsetDateTime,
	{
		let mut session = self.lock(ctx).await?;
		let now = clock();

		if session.is_none() {
			let access_key = self.access_key.clone().ok_or(Error::MissingCredential)?;

			self.issue_locked(&mut session, exchange, ctx, &access_key).await?;
		} else if let Some(current) = session
			.as_ref()
			.filter(|current| current.claims.expires_within(now, self.refresh_window))
		{
			let refresh_token = current.refresh_token.clone().ok_or(Error::MissingRefreshToken)?;

			self.refresh_locked(&mut session, exchange, ctx, &refresh_token).await?;
		}

		session.as_ref().map(|current| current.token.clone()).ok_or(Error::MissingCredential)
	}

	async fn lock(&self, ctx: &Context) -> Result<async_lock::MutexGuard<'_, Option<Session>>> {
		ctx.run(async { Ok(self.session.lock().await) }).await
	}

	async fn issue_locked<E>(
		&self,
		session: &mut Option<Session>,
		exchange: &E,
		ctx: &Context,
		access_key: &TokenSecret,
	) -> Result<Claims>
	where
		E: ?Sized + TokenExchange,
	{
		const OPERATION: Operation = Operation::TokenCreate;

		if access_key.is_empty() {
			return Err(Error::MissingCredential);
		}

		let span = OperationSpan::new(OPERATION, "issue");

		obs::record_outcome(OPERATION, Outcome::Attempt);
		self.metrics.record_issue();

		let result = span
			.instrument(async {
				let pair = ctx.run(exchange.create(ctx, access_key)).await?;

				self.replace(session, pair)
			})
			.await
			.inspect_err(|_| self.metrics.record_failure());

		obs::record_result(OPERATION, &result);

		result
	}

	async fn refresh_locked<E>(
		&self,
		session: &mut Option<Session>,
		exchange: &E,
		ctx: &Context,
		refresh_token: &TokenSecret,
	) -> Result<Claims>
	where
		E: ?Sized + TokenExchange,
	{
		const OPERATION: Operation = Operation::TokenRefresh;

		let span = OperationSpan::new(OPERATION, "refresh");

		obs::record_outcome(OPERATION, Outcome::Attempt);
		self.metrics.record_refresh();

		let result = span
			.instrument(async {
				let pair = ctx.run(exchange.refresh(ctx, refresh_token)).await?;

				self.replace(session, pair)
			})
			.await
			.inspect_err(|_| self.metrics.record_failure());

		obs::record_result(OPERATION, &result);

		result
	}

	// Verification happens before assignment so a rejected token never reaches the session.
	fn replace(&self, session: &mut Option<Session>, pair: TokenPair) -> Result<Claims> {
		let claims = self.verifier.verify(pair.token.expose())?;

		*session = Some(Session {
			token: pair.token,
			refresh_token: pair.refresh_token.filter(|secret| !secret.is_empty()),
			claims: claims.clone(),
		});

		Ok(claims)
	}
}
impl Debug for TokenStore {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenStore")
			.field("verifier", &self.verifier)
			.field("access_key_set", &self.access_key.is_some())
			.field("refresh_window", &self.refresh_window)
			.finish()
	}
}
