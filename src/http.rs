//! Transport primitives for API requests.
//!
//! The module exposes [`HttpTransport`], the client's only dependency on an HTTP stack, and
//! [`RequestBody`], which tracks whether an outgoing payload can be replayed after a 429.
//! [`ReqwestTransport`] is the bundled implementation; tests and embedding applications can
//! provide their own.

// std
#[cfg(feature = "reqwest")] use std::ops::Deref;
// crates.io
use http::{HeaderMap, StatusCode};
// self
use crate::{_prelude::*, error::TransportError};

/// Outgoing HTTP request with a fully buffered body.
pub type HttpRequest = http::Request<Vec<u8>>;
/// Incoming HTTP response with a fully buffered body.
pub type HttpResponse = http::Response<Vec<u8>>;
/// Boxed future returned by [`HttpTransport::send`].
pub type TransportFuture<'a> =
	Pin<Box<dyn Future<Output = Result<HttpResponse, TransportError>> + 'a + Send>>;

/// Abstraction over HTTP stacks able to dispatch API requests.
///
/// Implementations must be `Send + Sync + 'static` so a single transport can be shared by every
/// clone of a client. Transports report connection, TLS, and timeout failures as
/// [`TransportError`]; any HTTP status (including 4xx/5xx) is a successful dispatch and is
/// classified by the executor.
pub trait HttpTransport
where
	Self: 'static + Send + Sync,
{
	/// Dispatches `request` and buffers the response body.
	fn send(&self, request: HttpRequest) -> TransportFuture<'_>;
}
impl<T> HttpTransport for Arc<T>
where
	T: ?Sized + HttpTransport,
{
	fn send(&self, request: HttpRequest) -> TransportFuture<'_> {
		self.as_ref().send(request)
	}
}

/// Outgoing request payload with an explicit replay policy.
///
/// JSON bodies built by the client are [`Replayable`](RequestBody::Replayable). A
/// [`OneShot`](RequestBody::OneShot) body is handed to the transport once; rewinding it fails
/// with [`Error::NonRewindableBody`] so a retry never resends a drained payload.
#[derive(Clone, PartialEq, Eq, Default)]
pub enum RequestBody {
	/// No payload.
	#[default]
	Empty,
	/// Buffered payload that can be resent byte-for-byte.
	Replayable(Vec<u8>),
	/// Payload that can be sent exactly once; `None` once consumed.
	OneShot(Option<Vec<u8>>),
}
impl RequestBody {
	/// Serializes `value` into a replayable JSON body.
	pub fn json<T>(value: &T) -> Result<Self>
	where
		T: ?Sized + Serialize,
	{
		serde_json::to_vec(value)
			.map(Self::Replayable)
			.map_err(|source| crate::error::ConfigError::Encode { source }.into())
	}

	/// Wraps bytes that must not be replayed.
	pub fn one_shot(bytes: impl Into<Vec<u8>>) -> Self {
		Self::OneShot(Some(bytes.into()))
	}

	/// Returns `true` when there is no payload.
	pub fn is_empty(&self) -> bool {
		matches!(self, Self::Empty)
	}

	/// Produces the bytes for the next dispatch.
	///
	/// Replayable bodies are copied, one-shot bodies are drained.
	pub fn take(&mut self) -> Vec<u8> {
		match self {
			Self::Empty => Vec::new(),
			Self::Replayable(bytes) => bytes.clone(),
			Self::OneShot(bytes) => bytes.take().unwrap_or_default(),
		}
	}

	/// Prepares the body to be sent again.
	pub fn rewind(&mut self) -> Result<()> {
		match self {
			Self::Empty | Self::Replayable(_) => Ok(()),
			Self::OneShot(_) => Err(Error::NonRewindableBody),
		}
	}
}
impl From<Vec<u8>> for RequestBody {
	fn from(bytes: Vec<u8>) -> Self {
		if bytes.is_empty() { Self::Empty } else { Self::Replayable(bytes) }
	}
}
impl Debug for RequestBody {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		match self {
			Self::Empty => f.write_str("RequestBody::Empty"),
			Self::Replayable(bytes) => write!(f, "RequestBody::Replayable({} bytes)", bytes.len()),
			Self::OneShot(Some(bytes)) => write!(f, "RequestBody::OneShot({} bytes)", bytes.len()),
			Self::OneShot(None) => f.write_str("RequestBody::OneShot(consumed)"),
		}
	}
}

/// Thin wrapper around [`ReqwestClient`] so shared HTTP behavior lives in one place.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug)]
pub struct ReqwestTransport(pub ReqwestClient);
#[cfg(feature = "reqwest")]
impl ReqwestTransport {
	/// Default request timeout applied by [`ReqwestTransport::new`].
	pub const DEFAULT_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(30);

	/// Builds a transport with the default timeout.
	pub fn new() -> Result<Self> {
		let client = ReqwestClient::builder()
			.timeout(Self::DEFAULT_TIMEOUT)
			.build()
			.map_err(crate::error::ConfigError::from)?;

		Ok(Self(client))
	}

	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}
}
#[cfg(feature = "reqwest")]
impl AsRef<ReqwestClient> for ReqwestTransport {
	fn as_ref(&self) -> &ReqwestClient {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl Deref for ReqwestTransport {
	type Target = ReqwestClient;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl HttpTransport for ReqwestTransport {
	fn send(&self, request: HttpRequest) -> TransportFuture<'_> {
		Box::pin(async move {
			let request = reqwest::Request::try_from(request).map_err(TransportError::from)?;
			let response = self.0.execute(request).await?;
			let status = response.status();
			let headers = response.headers().to_owned();
			let body = response.bytes().await?.to_vec();

			Ok(build_response(status, headers, body))
		})
	}
}

/// Assembles a buffered [`HttpResponse`].
pub fn build_response(status: StatusCode, headers: HeaderMap, body: Vec<u8>) -> HttpResponse {
	let mut response = HttpResponse::new(body);

	*response.status_mut() = status;
	*response.headers_mut() = headers;

	response
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn replayable_body_survives_rewind() {
		let mut body = RequestBody::json(&serde_json::json!({ "refresh_token": "r-1" }))
			.expect("JSON body should encode.");
		let first = body.take();

		body.rewind().expect("Replayable body should rewind.");

		assert_eq!(body.take(), first);
		assert_eq!(first, br#"{"refresh_token":"r-1"}"#.to_vec());
	}

	#[test]
	fn one_shot_body_refuses_rewind() {
		let mut body = RequestBody::one_shot(b"stream".to_vec());

		assert_eq!(body.take(), b"stream".to_vec());
		assert!(body.take().is_empty());
		assert!(matches!(body.rewind(), Err(Error::NonRewindableBody)));
		assert_eq!(format!("{body:?}"), "RequestBody::OneShot(consumed)");
	}

	#[test]
	fn empty_body_rewinds_trivially() {
		let mut body = RequestBody::from(Vec::new());

		assert!(body.is_empty());
		assert!(body.rewind().is_ok());
		assert!(body.take().is_empty());
	}
}
