// self
use crate::{_prelude::*, auth::ClaimsError, error::RefreshError, store::StoreError};

/// Type alias that resolves to an instrumented future when tracing is enabled.
#[cfg(feature = "tracing")]
pub type InstrumentedFuture<F> = tracing::instrument::Instrumented<F>;
/// Passthrough future type when tracing is disabled.
#[cfg(not(feature = "tracing"))]
pub type InstrumentedFuture<F> = F;

/// A span builder used by the request pipeline and the refresh coordinator.
#[derive(Clone, Debug)]
pub struct RequestSpan {
	#[cfg(feature = "tracing")]
	span: tracing::Span,
}
impl RequestSpan {
	/// Creates a span for one API request.
	pub fn request(method: &str, path: &str) -> Self {
		#[cfg(feature = "tracing")]
		{
			let span = tracing::info_span!("lif_client.request", method, path);

			Self { span }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = (method, path);

			Self {}
		}
	}

	/// Creates a span for one refresh call.
	pub fn refresh() -> Self {
		#[cfg(feature = "tracing")]
		{
			Self { span: tracing::info_span!("lif_client.refresh") }
		}
		#[cfg(not(feature = "tracing"))]
		{
			Self {}
		}
	}

	/// Instruments an async block without holding a guard across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> InstrumentedFuture<Fut>
	where
		Fut: Future,
	{
		#[cfg(feature = "tracing")]
		{
			use tracing::Instrument;

			fut.instrument(self.span.clone())
		}
		#[cfg(not(feature = "tracing"))]
		{
			fut
		}
	}
}

pub(crate) fn refresh_failed(error: &RefreshError, queued: usize) {
	#[cfg(feature = "tracing")]
	tracing::warn!(%error, queued, "Token refresh failed; rejecting queued requests.");
	#[cfg(not(feature = "tracing"))]
	let _ = (error, queued);
}

pub(crate) fn refresh_succeeded(queued: usize) {
	#[cfg(feature = "tracing")]
	tracing::debug!(queued, "Token refreshed; replaying queued requests.");
	#[cfg(not(feature = "tracing"))]
	let _ = queued;
}

pub(crate) fn session_expired(login_path: &str) {
	#[cfg(feature = "tracing")]
	tracing::warn!(login_path, "Unauthorized response was not resolved by refresh; logging out.");
	#[cfg(not(feature = "tracing"))]
	let _ = login_path;
}

pub(crate) fn storage_failure(operation: &'static str, error: &StoreError) {
	#[cfg(feature = "tracing")]
	tracing::warn!(operation, %error, "Token storage operation failed.");
	#[cfg(not(feature = "tracing"))]
	let _ = (operation, error);
}

pub(crate) fn detached_store_write(operation: &'static str) {
	#[cfg(feature = "tracing")]
	tracing::debug!(operation, "Ignoring token write outside a client execution context.");
	#[cfg(not(feature = "tracing"))]
	let _ = operation;
}

pub(crate) fn undecodable_token(error: &ClaimsError) {
	#[cfg(feature = "tracing")]
	tracing::debug!(%error, "Treating undecodable token as expired.");
	#[cfg(not(feature = "tracing"))]
	let _ = error;
}
