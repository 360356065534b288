//! Inbound stage that turns a first 401 into a coordinated token refresh and a single replay.

// self
use crate::{
	_prelude::*,
	http::HttpTransport,
	pipeline::{Exchange, InboundStage, StageFuture},
	refresh::{RefreshCoordinator, RefreshFailure, RefreshRole},
};

/// On a 401 for a request that has not been retried yet, marks it retried, asks the
/// [`RefreshCoordinator`] for a fresh token, and replays it once through the transport.
///
/// If the refresh fails, the caller that started it sees its original 401 (with the request
/// still marked retried), while callers that were queued behind it see the refresh error.
#[derive(Clone, Debug)]
pub struct RefreshOnUnauthorized {
	coordinator: Arc<RefreshCoordinator>,
}
impl RefreshOnUnauthorized {
	/// Creates the stage over a shared coordinator.
	pub fn new(coordinator: Arc<RefreshCoordinator>) -> Self {
		Self { coordinator }
	}
}
impl InboundStage for RefreshOnUnauthorized {
	fn on_exchange<'a>(
		&'a self,
		mut exchange: Exchange,
		transport: &'a dyn HttpTransport,
	) -> StageFuture<'a, Exchange> {
		Box::pin(async move {
			let unauthorized =
				matches!(&exchange.outcome, Ok(response) if response.is_unauthorized());

			if !unauthorized || exchange.request.retried {
				return exchange;
			}

			exchange.request.retried = true;

			match self.coordinator.try_refresh(exchange.request.clone()).await {
				Ok(replay) => {
					let outcome = transport.send(replay.clone()).await;

					Exchange { request: replay, outcome }
				},
				Err(RefreshFailure { role: RefreshRole::Leader, .. }) => exchange,
				Err(RefreshFailure { error, .. }) =>
					Exchange { request: exchange.request, outcome: Err(error.into()) },
			}
		})
	}
}
