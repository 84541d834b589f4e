//! Helpers shared by the integration tests: token minting, envelopes, and client wiring.

#![allow(dead_code)]

// std
use std::{collections::VecDeque, sync::Arc};
// crates.io
use fairgate::{
	auth::{Claims, TokenVerifier},
	client::Client,
	error::TransportError,
	http::{HttpRequest, HttpResponse, HttpTransport, ReqwestTransport, TransportFuture},
	http_types::{HeaderMap, HeaderValue, Method, StatusCode},
	jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header},
	rate_gate::RETRY_AFTER_HEADER,
	reqwest,
};
use httpmock::MockServer;
use parking_lot::Mutex;
use serde_json::json;
use time::{Duration, OffsetDateTime};

/// Organisation every test client is built for.
pub const ORGANIZATION_ID: &str = "org-test";
/// Access key every test client is built with.
pub const ACCESS_KEY: &str = "access-key-test";
/// Path of the token creation endpoint for [`ORGANIZATION_ID`].
pub const CREATE_PATH: &str = "/fsa/v1.1/auth/create/org-test/token";
/// Path of the token refresh endpoint for [`ORGANIZATION_ID`].
pub const REFRESH_PATH: &str = "/fsa/v1.1/auth/refresh/org-test/token";

const SECRET: &[u8] = b"fairgate-integration-secret";

/// Builds a verifier for tokens minted by [`sign_token`].
pub fn verifier() -> TokenVerifier {
	TokenVerifier::new(DecodingKey::from_secret(SECRET), Algorithm::HS256)
}

/// Mints a token that expires `expires_in` from now.
pub fn sign_token(expires_in: Duration, uniq_id: &str) -> String {
	let mut claims = Claims::expiring_at(OffsetDateTime::now_utc() + expires_in);

	claims.fsa_id = Some("fsa-test".into());
	claims.uniq_id = Some(uniq_id.into());

	fairgate::jsonwebtoken::encode(
		&Header::new(Algorithm::HS256),
		&claims,
		&EncodingKey::from_secret(SECRET),
	)
	.expect("Test token should sign.")
}

/// Wraps a token pair in a successful envelope.
pub fn token_envelope(token: &str, refresh_token: &str) -> serde_json::Value {
	json!({
		"success": true,
		"code": 200,
		"message": "",
		"data": { "token": token, "refresh_token": refresh_token }
	})
}

/// Wraps `data` in a successful envelope.
pub fn ok_envelope(data: serde_json::Value) -> serde_json::Value {
	json!({ "success": true, "code": 200, "message": "", "data": data })
}

/// Builds a reqwest-backed client pointed at `server`.
pub fn reqwest_client(server: &MockServer) -> Client<ReqwestTransport> {
	let http = reqwest::Client::builder()
		.danger_accept_invalid_certs(true)
		.build()
		.expect("Test reqwest client should build.");

	Client::builder(ORGANIZATION_ID, verifier())
		.base_url(server.base_url())
		.access_key(ACCESS_KEY)
		.build_with_transport(Arc::new(ReqwestTransport::with_client(http)))
		.expect("Test client should build.")
}

/// Request observed by a [`ScriptedTransport`].
#[derive(Clone, Debug)]
pub struct RecordedRequest {
	/// HTTP method.
	pub method: Method,
	/// Full request URI.
	pub uri: String,
	/// Request headers.
	pub headers: HeaderMap,
	/// Request body bytes.
	pub body: Vec<u8>,
}

/// In-process transport answering from a queue of canned responses.
#[derive(Default)]
pub struct ScriptedTransport {
	responses: Mutex<VecDeque<HttpResponse>>,
	requests: Mutex<Vec<RecordedRequest>>,
}
impl ScriptedTransport {
	/// Queues a response.
	pub fn push(&self, status: StatusCode, headers: &[(&'static str, String)], body: &str) {
		let mut map = HeaderMap::new();

		for (name, value) in headers {
			map.insert(*name, HeaderValue::from_str(value).expect("Header should be valid."));
		}

		self.responses.lock().push_back(fairgate::http::build_response(
			status,
			map,
			body.as_bytes().to_vec(),
		));
	}

	/// Queues a JSON response.
	pub fn push_json(&self, status: StatusCode, body: serde_json::Value) {
		self.push(status, &[], &body.to_string());
	}

	/// Queues a 429 carrying `retry_after` in the rate-limit header.
	pub fn push_rate_limited(&self, retry_after: impl Into<String>) {
		self.push(StatusCode::TOO_MANY_REQUESTS, &[(RETRY_AFTER_HEADER, retry_after.into())], "");
	}

	/// Returns every request seen so far.
	pub fn requests(&self) -> Vec<RecordedRequest> {
		self.requests.lock().clone()
	}

	/// Returns requests whose URI ends with `path`.
	pub fn requests_to(&self, path: &str) -> Vec<RecordedRequest> {
		self.requests().into_iter().filter(|request| request.uri.ends_with(path)).collect()
	}
}
impl HttpTransport for ScriptedTransport {
	fn send(&self, request: HttpRequest) -> TransportFuture<'_> {
		let (parts, body) = request.into_parts();

		self.requests.lock().push(RecordedRequest {
			method: parts.method,
			uri: parts.uri.to_string(),
			headers: parts.headers,
			body,
		});

		let next = self.responses.lock().pop_front();

		Box::pin(async move {
			next.ok_or_else(|| TransportError::Io(std::io::Error::other("no scripted response")))
		})
	}
}

/// Builds a client over a fresh [`ScriptedTransport`].
pub fn scripted_client() -> (Client<ScriptedTransport>, Arc<ScriptedTransport>) {
	let transport = Arc::new(ScriptedTransport::default());
	let client = Client::builder(ORGANIZATION_ID, verifier())
		.base_url("https://fsa.test/")
		.access_key(ACCESS_KEY)
		.build_with_transport(transport.clone())
		.expect("Scripted client should build.");

	(client, transport)
}

/// Header value for an epoch a few seconds in the past, so the gate opens immediately.
pub fn elapsed_retry_after() -> String {
	(OffsetDateTime::now_utc() - Duration::seconds(5)).unix_timestamp().to_string()
}
