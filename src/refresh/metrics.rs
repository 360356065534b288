// std
use std::sync::atomic::{AtomicU64, Ordering};
// self
use crate::obs::{self, RefreshOutcome};

/// Per-coordinator refresh counters, kept regardless of the `metrics` feature.
#[derive(Debug, Default)]
pub struct RefreshMetrics {
	counts: [AtomicU64; 4],
}
impl RefreshMetrics {
	/// Returns how often `outcome` has been recorded.
	pub fn count(&self, outcome: RefreshOutcome) -> u64 {
		self.counts[slot(outcome)].load(Ordering::Relaxed)
	}

	/// Refresh calls started.
	pub fn attempts(&self) -> u64 {
		self.count(RefreshOutcome::Attempt)
	}

	/// Requests parked behind an in-flight refresh.
	pub fn queued(&self) -> u64 {
		self.count(RefreshOutcome::Queued)
	}

	/// Refresh calls that produced a token.
	pub fn successes(&self) -> u64 {
		self.count(RefreshOutcome::Success)
	}

	/// Refresh calls that failed or were abandoned.
	pub fn failures(&self) -> u64 {
		self.count(RefreshOutcome::Failure)
	}

	// Bumps the local counter and forwards to the global recorder.
	pub(crate) fn record(&self, outcome: RefreshOutcome) {
		self.counts[slot(outcome)].fetch_add(1, Ordering::Relaxed);

		obs::record_refresh_outcome(outcome);
	}
}

fn slot(outcome: RefreshOutcome) -> usize {
	match outcome {
		RefreshOutcome::Attempt => 0,
		RefreshOutcome::Queued => 1,
		RefreshOutcome::Success => 2,
		RefreshOutcome::Failure => 3,
	}
}
