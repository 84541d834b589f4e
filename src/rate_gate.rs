//! Shared "retry-not-before" gate armed by HTTP 429 responses.
//!
//! The server declares the earliest retry instant as an absolute Unix timestamp in the
//! [`RETRY_AFTER_HEADER`] header. The gate only ever moves that instant forward, so a stale or
//! racing 429 cannot shorten an already-armed wait. Waiting happens outside the lock so
//! concurrent callers only serialize on the timestamp update itself.

// self
use crate::{_prelude::*, context::Context, obs};

/// Header carrying the earliest retry instant as integer epoch seconds.
pub const RETRY_AFTER_HEADER: &str = "x-ratelimit-retry-after";

/// Per-client rate-limit deadline shared by every outgoing request.
#[derive(Debug, Default)]
pub struct RateGate {
	not_before: Mutex<Option<OffsetDateTime>>,
}
impl RateGate {
	/// Creates an unarmed gate.
	pub fn new() -> Self {
		Self::default()
	}

	/// Returns the currently armed deadline, if any.
	pub fn deadline(&self) -> Option<OffsetDateTime> {
		*self.not_before.lock()
	}

	/// Parses a rate-limit header value and ratchets the deadline forward.
	///
	/// Returns the deadline in effect after the update, which may be a later instant armed by a
	/// concurrent response.
	pub fn arm(&self, header: Option<&str>) -> Result<OffsetDateTime> {
		let deadline = parse_retry_after(header)?;

		self.arm_at(deadline);

		let effective = self.deadline().unwrap_or(deadline);

		obs::record_rate_limit(effective);

		Ok(effective)
	}

	/// Moves the deadline to `deadline` if it is strictly later than the armed one.
	///
	/// Returns `true` when the deadline changed.
	pub fn arm_at(&self, deadline: OffsetDateTime) -> bool {
		let mut not_before = self.not_before.lock();

		match *not_before {
			Some(current) if current >= deadline => false,
			_ => {
				*not_before = Some(deadline);

				true
			},
		}
	}

	/// Returns how long a request issued at `now` has to wait.
	pub fn remaining_at(&self, now: OffsetDateTime) -> Duration {
		match self.deadline() {
			Some(deadline) if deadline > now => deadline - now,
			_ => Duration::ZERO,
		}
	}

	/// Suspends until the armed deadline passes or `ctx` is cancelled.
	///
	/// Returns immediately when the deadline already lies in the past.
	pub async fn wait(&self, ctx: &Context) -> Result<()> {
		let remaining = self.remaining_at(OffsetDateTime::now_utc());

		if remaining.is_zero() {
			return ctx.check();
		}

		let sleep = std::time::Duration::try_from(remaining).unwrap_or_default();

		ctx.run(async {
			tokio::time::sleep(sleep).await;

			Ok(())
		})
		.await
	}
}

fn parse_retry_after(header: Option<&str>) -> Result<OffsetDateTime> {
	let raw = match header {
		Some(value) if !value.is_empty() => value,
		_ =>
			return Err(Error::InvalidRateLimitSignal {
				reason: format!("missing {RETRY_AFTER_HEADER} header"),
			}),
	};
	let seconds = raw.parse::<i64>().map_err(|e| Error::InvalidRateLimitSignal {
		reason: format!("invalid {RETRY_AFTER_HEADER} header `{raw}`: {e}"),
	})?;

	OffsetDateTime::from_unix_timestamp(seconds).map_err(|e| Error::InvalidRateLimitSignal {
		reason: format!("invalid {RETRY_AFTER_HEADER} header `{raw}`: {e}"),
	})
}
