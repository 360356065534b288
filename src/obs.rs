//! Optional observability helpers for client requests and token refreshes.
//!
//! # Feature Flags
//!
//! - Enable `tracing` to emit structured spans named `lif_client.request` (with `method` and
//!   `path` fields) and `lif_client.refresh`, plus warn/debug events for refresh failures,
//!   fail-closed logouts, and storage problems.
//! - Enable `metrics` to increment the `lif_client_request_total` and `lif_client_refresh_total`
//!   counters, labeled by `outcome`.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Outcome labels recorded for each refresh coordination step.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RefreshOutcome {
	/// A new refresh call was started.
	Attempt,
	/// A request was queued behind an in-flight refresh.
	Queued,
	/// The refresh call produced a new token.
	Success,
	/// The refresh call failed or was abandoned.
	Failure,
}
impl RefreshOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			RefreshOutcome::Attempt => "attempt",
			RefreshOutcome::Queued => "queued",
			RefreshOutcome::Success => "success",
			RefreshOutcome::Failure => "failure",
		}
	}
}
impl Display for RefreshOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded once per request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RequestOutcome {
	/// The final response was 2xx.
	Success,
	/// The request ended in an error status or transport failure.
	Failure,
}
impl RequestOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			RequestOutcome::Success => "success",
			RequestOutcome::Failure => "failure",
		}
	}
}
impl Display for RequestOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
