//! Request executor: rate gate, bearer token, dispatch, and 429 replay.
//!
//! Every authenticated call runs the same loop. It waits until the shared rate gate opens, makes
//! sure the token store holds a valid bearer token, builds and dispatches the request, and
//! classifies the status. A 429 arms the gate from the response header, rewinds the body, and
//! goes around again; any other non-2xx status is returned to the caller untouched.

// crates.io
use http::{
	HeaderValue, Method, StatusCode,
	header::{ACCEPT_LANGUAGE, AUTHORIZATION, CONTENT_TYPE, USER_AGENT},
};
// self
use crate::{
	_prelude::*,
	auth::TokenSecret,
	client::Client,
	context::Context,
	envelope,
	error::ConfigError,
	http::{HttpRequest, HttpResponse, HttpTransport, RequestBody},
	obs::{self, Operation, OperationSpan, Outcome},
	rate_gate::RETRY_AFTER_HEADER,
};

impl<T> Client<T>
where
	T: ?Sized + HttpTransport,
{
	/// Executes an authenticated request and returns the raw 2xx response.
	///
	/// `path` is appended segment by segment to the base URL (absolute URLs are rejected) and
	/// `query` is appended to whatever query string `path` already carries. HTTP 429 responses
	/// are retried after the server-declared deadline for as long as the body can be rewound,
	/// the context stays live, and the optional retry ceiling allows. Other non-2xx statuses
	/// fail with [`Error::UnexpectedStatus`].
	pub async fn execute(
		&self,
		ctx: &Context,
		method: Method,
		path: &str,
		query: &[(&str, String)],
		body: RequestBody,
	) -> Result<HttpResponse> {
		const OPERATION: Operation = Operation::Request;

		let span = OperationSpan::new(OPERATION, "execute");

		obs::record_outcome(OPERATION, Outcome::Attempt);

		let result = span.instrument(self.execute_with_retry(ctx, method, path, query, body)).await;

		obs::record_result(OPERATION, &result);

		result
	}

	/// Executes a request and decodes the envelope payload of the response.
	pub async fn execute_json<R>(
		&self,
		ctx: &Context,
		method: Method,
		path: &str,
		query: &[(&str, String)],
		body: RequestBody,
	) -> Result<R>
	where
		R: DeserializeOwned,
	{
		let response = self.execute(ctx, method, path, query, body).await?;

		envelope::decode(response.body())
	}

	/// Issues a `GET` and decodes the envelope payload.
	pub async fn get_json<R>(&self, ctx: &Context, path: &str, query: &[(&str, String)]) -> Result<R>
	where
		R: DeserializeOwned,
	{
		self.execute_json(ctx, Method::GET, path, query, RequestBody::Empty).await
	}

	/// Issues a `POST` with a JSON body and decodes the envelope payload.
	pub async fn post_json<B, R>(&self, ctx: &Context, path: &str, body: &B) -> Result<R>
	where
		B: ?Sized + Serialize,
		R: DeserializeOwned,
	{
		self.execute_json(ctx, Method::POST, path, &[], RequestBody::json(body)?).await
	}

	async fn execute_with_retry(
		&self,
		ctx: &Context,
		method: Method,
		path: &str,
		query: &[(&str, String)],
		mut body: RequestBody,
	) -> Result<HttpResponse> {
		let url = self.request_url(path, query)?;
		let mut rate_limited = 0_u32;

		loop {
			self.rate_gate.wait(ctx).await?;

			let bearer = self.tokens.ensure_valid(self, ctx).await?;
			let request = self.build_request(method.clone(), &url, Some(&bearer), body.take())?;
			let response = self.dispatch(ctx, request).await?;
			let status = response.status();

			if status == StatusCode::TOO_MANY_REQUESTS {
				rate_limited = rate_limited.saturating_add(1);

				obs::record_outcome(Operation::Request, Outcome::RateLimited);

				self.arm_rate_gate(&response).map_err(Error::rate_limited)?;

				if self.config.max_rate_limit_retries.is_some_and(|max| rate_limited > max) {
					return Err(Error::RetryLimitExceeded { attempts: rate_limited });
				}

				body.rewind().map_err(Error::rate_limited)?;

				continue;
			}
			if !status.is_success() {
				return Err(Error::unexpected_status(status));
			}

			return Ok(response);
		}
	}

	pub(crate) async fn dispatch(&self, ctx: &Context, request: HttpRequest) -> Result<HttpResponse> {
		ctx.run(async { Ok(self.transport.send(request).await?) }).await
	}

	// `path` only ever extends the base path; its segments are escaped and `.`/`..` are dropped,
	// so the bearer token cannot leave the configured host.
	pub(crate) fn request_url(&self, path: &str, query: &[(&str, String)]) -> Result<Url> {
		if Url::parse(path).is_ok_and(|url| url.has_host()) {
			return Err(ConfigError::AbsoluteRequestPath { path: path.into() }.into());
		}

		let (path, inline_query) = match path.split_once('?') {
			Some((path, inline_query)) => (path, Some(inline_query)),
			None => (path, None),
		};
		let mut url = self.base_url.clone();

		url.path_segments_mut()
			.map_err(|_| ConfigError::InvalidBaseUrl { url: self.base_url.to_string() })?
			.pop_if_empty()
			.extend(path.split('/').filter(|segment| !segment.is_empty()));
		url.set_query(inline_query);

		if !query.is_empty() {
			let mut pairs = url.query_pairs_mut();

			for (key, value) in query {
				pairs.append_pair(key, value);
			}
		}

		Ok(url)
	}

	pub(crate) fn build_request(
		&self,
		method: Method,
		url: &Url,
		bearer: Option<&TokenSecret>,
		body: Vec<u8>,
	) -> Result<HttpRequest> {
		let mut builder = http::Request::builder()
			.method(method)
			.uri(url.as_str())
			.header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
			.header(ACCEPT_LANGUAGE, header_value("Accept-Language", &self.config.accept_language)?)
			.header(USER_AGENT, header_value("User-Agent", &self.config.user_agent)?);

		if let Some(bearer) = bearer {
			let mut value = header_value("Authorization", &format!("Bearer {}", bearer.expose()))?;

			value.set_sensitive(true);

			builder = builder.header(AUTHORIZATION, value);
		}

		Ok(builder.body(body).map_err(ConfigError::from)?)
	}

	fn arm_rate_gate(&self, response: &HttpResponse) -> Result<OffsetDateTime> {
		let header = response
			.headers()
			.get(RETRY_AFTER_HEADER)
			.map(|value| {
				value.to_str().map_err(|e| Error::InvalidRateLimitSignal {
					reason: format!("non-ASCII {RETRY_AFTER_HEADER} header: {e}"),
				})
			})
			.transpose()?;

		self.rate_gate.arm(header)
	}
}

fn header_value(name: &'static str, value: &str) -> Result<HeaderValue> {
	HeaderValue::from_str(value).map_err(|_| ConfigError::InvalidHeader { name }.into())
}
