//! Cancellation and deadline context threaded through every suspending client step.
//!
//! Rate-gate waits, token exchanges, and transport dispatch all run through
//! [`Context::run`], so a cancelled or expired context unblocks them promptly and surfaces
//! [`Error::Cancelled`] or [`Error::DeadlineExceeded`] instead of silently dropping the work.

// crates.io
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
// self
use crate::_prelude::*;

/// Cancellable, deadline-aware context for a single logical operation.
///
/// Cloning shares the cancellation token; [`Context::child`] derives a context that is
/// cancelled together with its parent but can also be cancelled on its own.
#[derive(Clone, Debug, Default)]
pub struct Context {
	cancel: CancellationToken,
	deadline: Option<Instant>,
}
impl Context {
	/// Creates a context that is never cancelled and has no deadline.
	pub fn new() -> Self {
		Self::default()
	}

	/// Wraps an existing cancellation token.
	pub fn with_cancellation(token: CancellationToken) -> Self {
		Self { cancel: token, deadline: None }
	}

	/// Sets the deadline, keeping an earlier existing one.
	pub fn with_deadline(mut self, deadline: Instant) -> Self {
		self.deadline = Some(match self.deadline {
			Some(current) if current <= deadline => current,
			_ => deadline,
		});

		self
	}

	/// Sets the deadline relative to now.
	pub fn with_timeout(self, timeout: std::time::Duration) -> Self {
		self.with_deadline(Instant::now() + timeout)
	}

	/// Derives a child context sharing the deadline and parent cancellation.
	pub fn child(&self) -> Self {
		Self { cancel: self.cancel.child_token(), deadline: self.deadline }
	}

	/// Returns the underlying cancellation token.
	pub fn cancellation_token(&self) -> &CancellationToken {
		&self.cancel
	}

	/// Returns the deadline, if any.
	pub fn deadline(&self) -> Option<Instant> {
		self.deadline
	}

	/// Cancels this context and all of its children.
	pub fn cancel(&self) {
		self.cancel.cancel();
	}

	/// Fails fast when the context is already cancelled or past its deadline.
	pub fn check(&self) -> Result<()> {
		if self.cancel.is_cancelled() {
			return Err(Error::Cancelled);
		}
		if self.deadline.is_some_and(|deadline| deadline <= Instant::now()) {
			return Err(Error::DeadlineExceeded);
		}

		Ok(())
	}

	/// Drives `fut` to completion unless the context is cancelled or its deadline passes first.
	pub async fn run<F, T>(&self, fut: F) -> Result<T>
	where
		F: Future<Output = Result<T>>,
	{
		self.check()?;

		let deadline = async {
			match self.deadline {
				Some(deadline) => tokio::time::sleep_until(deadline).await,
				None => std::future::pending::<()>().await,
			}
		};

		tokio::select! {
			biased;
			_ = self.cancel.cancelled() => Err(Error::Cancelled),
			_ = deadline => Err(Error::DeadlineExceeded),
			output = fut => output,
		}
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[tokio::test]
	async fn run_returns_future_output() {
		let ctx = Context::new();
		let value = ctx.run(async { Ok(7) }).await.expect("Uncancelled context should succeed.");

		assert_eq!(value, 7);
	}

	#[tokio::test]
	async fn cancelled_context_fails_before_polling() {
		let ctx = Context::new();

		ctx.cancel();

		let err = ctx
			.run(std::future::pending::<Result<()>>())
			.await
			.expect_err("Cancelled context should fail.");

		assert!(matches!(err, Error::Cancelled));
	}

	#[tokio::test(start_paused = true)]
	async fn deadline_interrupts_pending_future() {
		let ctx = Context::new().with_timeout(std::time::Duration::from_secs(5));
		let err = ctx
			.run(std::future::pending::<Result<()>>())
			.await
			.expect_err("Deadline should interrupt a pending future.");

		assert!(matches!(err, Error::DeadlineExceeded));
	}

	#[tokio::test]
	async fn child_follows_parent_cancellation() {
		let parent = Context::new();
		let child = parent.child();

		parent.cancel();

		assert!(matches!(child.check(), Err(Error::Cancelled)));
	}

	#[test]
	fn earlier_deadline_wins() {
		let now = Instant::now();
		let ctx = Context::new()
			.with_deadline(now + std::time::Duration::from_secs(1))
			.with_deadline(now + std::time::Duration::from_secs(10));

		assert_eq!(ctx.deadline(), Some(now + std::time::Duration::from_secs(1)));
	}
}
