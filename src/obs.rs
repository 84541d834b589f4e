//! Optional observability helpers for the request pipeline.
//!
//! # Feature Flags
//!
//! - Enable `tracing` to emit structured spans named `fairgate.operation` with the `operation`
//!   and `stage` (call site) fields, plus a `warn` event whenever a 429 arms the rate gate.
//! - Enable `metrics` to increment the `fairgate_operation_total` counter for every
//!   attempt/success/failure/rate-limit, labeled by `operation` + `outcome`.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Pipeline operations observed by the client.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operation {
	/// Access-key exchange for a fresh token pair.
	TokenCreate,
	/// Refresh-token exchange.
	TokenRefresh,
	/// Authenticated API request.
	Request,
}
impl Operation {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Operation::TokenCreate => "token_create",
			Operation::TokenRefresh => "token_refresh",
			Operation::Request => "request",
		}
	}
}
impl Display for Operation {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Outcome {
	/// Entry to a pipeline operation.
	Attempt,
	/// Successful completion.
	Success,
	/// Failure propagated back to the caller.
	Failure,
	/// HTTP 429 observed; the request is retried after the gate opens.
	RateLimited,
}
impl Outcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Outcome::Attempt => "attempt",
			Outcome::Success => "success",
			Outcome::Failure => "failure",
			Outcome::RateLimited => "rate_limited",
		}
	}
}
impl Display for Outcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Records the terminal outcome of `result` for `operation`.
pub(crate) fn record_result<T>(operation: Operation, result: &Result<T>) {
	match result {
		Ok(_) => record_outcome(operation, Outcome::Success),
		Err(_) => record_outcome(operation, Outcome::Failure),
	}
}
