//! In-process counters for token exchanges.

// std
use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters for token exchanges performed by a [`TokenStore`](super::TokenStore).
#[derive(Debug, Default)]
pub struct TokenMetrics {
	issues: AtomicU64,
	refreshes: AtomicU64,
	failures: AtomicU64,
}
impl TokenMetrics {
	/// Returns the number of access-key exchanges attempted.
	pub fn issues(&self) -> u64 {
		self.issues.load(Ordering::Relaxed)
	}

	/// Returns the number of refresh-token exchanges attempted.
	pub fn refreshes(&self) -> u64 {
		self.refreshes.load(Ordering::Relaxed)
	}

	/// Returns the number of exchanges that failed (network, API, or verification).
	pub fn failures(&self) -> u64 {
		self.failures.load(Ordering::Relaxed)
	}

	pub(crate) fn record_issue(&self) {
		self.issues.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_refresh(&self) {
		self.refreshes.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_failure(&self) {
		self.failures.fetch_add(1, Ordering::Relaxed);
	}
}
