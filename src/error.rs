//! Client-level error types shared by the token store, rate gate, executor, and decoders.

// self
use crate::{_prelude::*, envelope::ApiError};

/// Client-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical client error exposed by public APIs.
///
/// Every variant is scoped to the failing call. Only HTTP 429 responses are retried inside the
/// client; everything else is surfaced to the caller as-is.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Transport failure (DNS, TCP, TLS, timeouts).
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// Remote API answered with `success: false`.
	#[error(transparent)]
	Api(#[from] ApiError),

	/// No access key is available to mint a token.
	#[error("No access key is available to create a token.")]
	MissingCredential,
	/// A refresh is due but the store holds no refresh token.
	#[error("No refresh token is available.")]
	MissingRefreshToken,
	/// Token failed signature, algorithm, expiry, or format checks.
	#[error("Token could not be verified.")]
	InvalidToken {
		/// Verification failure reported by the JWT parser.
		#[source]
		source: jsonwebtoken::errors::Error,
	},
	/// Rate-limit header was absent or unparsable.
	#[error("Rate-limit signal is invalid: {reason}.")]
	InvalidRateLimitSignal {
		/// Why the header was rejected.
		reason: String,
	},
	/// Request body cannot be replayed for a retry.
	#[error("Request body cannot be rewound for a retry.")]
	NonRewindableBody,
	/// HTTP status outside the 2xx range (other than 429).
	#[error("{status_text}: {code}.")]
	UnexpectedStatus {
		/// Numeric HTTP status code.
		code: u16,
		/// Canonical reason phrase for the status.
		status_text: String,
	},
	/// Response body is not a valid envelope or payload.
	#[error("Response body could not be decoded.")]
	Decode {
		/// Structured parsing failure including the JSON path.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
	/// A 429 response could not be retried.
	#[error("Rate limit exceeded; retry aborted: {source}")]
	RateLimited {
		/// Failure that prevented the retry.
		#[source]
		source: Box<Error>,
	},
	/// The configured ceiling of consecutive 429 retries was reached.
	#[error("Rate limit exceeded after {attempts} attempts.")]
	RetryLimitExceeded {
		/// Number of rate-limited responses observed by the call.
		attempts: u32,
	},
	/// Caller cancelled the operation.
	#[error("Operation was cancelled.")]
	Cancelled,
	/// Caller deadline elapsed before the operation completed.
	#[error("Operation deadline exceeded.")]
	DeadlineExceeded,
}
impl Error {
	/// Wraps a retry-blocking failure with the rate-limit condition.
	pub fn rate_limited(source: Error) -> Self {
		Self::RateLimited { source: Box::new(source) }
	}

	/// Builds [`Error::UnexpectedStatus`] from an HTTP status code.
	pub fn unexpected_status(status: ::http::StatusCode) -> Self {
		Self::UnexpectedStatus {
			code: status.as_u16(),
			status_text: status.canonical_reason().unwrap_or("Unknown Status").into(),
		}
	}

	/// Returns `true` when the error was caused by caller cancellation or deadline.
	pub fn is_cancellation(&self) -> bool {
		matches!(self, Self::Cancelled | Self::DeadlineExceeded)
	}
}
impl From<jsonwebtoken::errors::Error> for Error {
	fn from(source: jsonwebtoken::errors::Error) -> Self {
		Self::InvalidToken { source }
	}
}
impl From<serde_path_to_error::Error<serde_json::Error>> for Error {
	fn from(source: serde_path_to_error::Error<serde_json::Error>) -> Self {
		Self::Decode { source }
	}
}

/// Configuration and request-construction failures raised by the client.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// Organisation identifier is required to address the auth endpoints.
	#[error("Organisation identifier must not be empty.")]
	MissingOrganizationId,
	/// Base URL is not an absolute HTTP(S) URL.
	#[error("Base URL must be an absolute http or https URL: {url}.")]
	InvalidBaseUrl {
		/// Rejected URL.
		url: String,
	},
	/// HTTP request construction failed.
	#[error(transparent)]
	HttpRequest(#[from] ::http::Error),
	/// Header value contains characters HTTP does not allow.
	#[error("Header `{name}` has an invalid value.")]
	InvalidHeader {
		/// Header name.
		name: &'static str,
	},
	/// Request path names its own host instead of extending the base URL.
	#[error("Request path must be relative to the base URL: {path}.")]
	AbsoluteRequestPath {
		/// Rejected path.
		path: String,
	},
	/// Base URL cannot be parsed.
	#[error("Request URL is invalid.")]
	InvalidUrl {
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Request payload could not be encoded as JSON.
	#[error("Request body could not be encoded.")]
	Encode {
		/// Underlying serialization failure.
		#[source]
		source: serde_json::Error,
	},
	/// Verification key cannot be parsed.
	#[error("Token verification key is invalid.")]
	InvalidVerificationKey {
		/// Underlying key parsing failure.
		#[source]
		source: jsonwebtoken::errors::Error,
	},
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Transport-level failures (network, IO).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the API.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Underlying HTTP client gave up waiting for the response.
	#[error("Request timed out while calling the API.")]
	Timeout {
		/// Transport-specific timeout error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while calling the API.")]
	Io(#[from] std::io::Error),
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}

	/// Wraps a transport-specific timeout error.
	pub fn timeout(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Timeout { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		if e.is_timeout() { Self::timeout(e) } else { Self::network(e) }
	}
}
