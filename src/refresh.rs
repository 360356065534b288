//! Singleflight access-token refresh with queued request replay.
//!
//! [`RefreshCoordinator::try_refresh`] is the only entry point. The first caller to arrive while
//! the coordinator is idle becomes the leader and invokes the [`TokenRefresher`]; every caller
//! arriving while that refresh is in flight is parked in a queue. When the refresh settles the
//! coordinator persists the new token, returns to idle, and drains the whole queue in one step:
//! each parked request comes back with its `Authorization` header rewritten to the new token,
//! or with the refresh error. The leader's future is guarded so that dropping it mid-refresh
//! still returns the coordinator to idle and rejects the queue with
//! [`RefreshError::Abandoned`].

mod metrics;

pub use metrics::RefreshMetrics;

// std
use std::mem;
// crates.io
use futures::channel::oneshot;
// self
use crate::{
	_prelude::*,
	auth::AccessToken,
	error::RefreshError,
	http::ApiRequest,
	obs::{self, RefreshOutcome, RequestSpan},
	store::TokenStore,
};

/// Boxed future returned by [`TokenRefresher::refresh`].
pub type RefreshFuture<'a> =
	Pin<Box<dyn Future<Output = Result<AccessToken, RefreshError>> + 'a + Send>>;

/// Auth-service operation that exchanges the long-lived refresh credential for a new access
/// token. The credential itself (cookie, stored secret) is the implementation's concern.
pub trait TokenRefresher
where
	Self: Send + Sync,
{
	/// Requests a new access token.
	fn refresh(&self) -> RefreshFuture<'_>;
}

/// Refresher used when no auth service is wired in; always fails with
/// [`RefreshError::Unsupported`].
#[derive(Clone, Copy, Debug, Default)]
pub struct UnsupportedRefresher;
impl TokenRefresher for UnsupportedRefresher {
	fn refresh(&self) -> RefreshFuture<'_> {
		Box::pin(async { Err(RefreshError::Unsupported) })
	}
}

/// Coordinator phase.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RefreshPhase {
	/// No refresh in flight; the next 401 starts one.
	Idle,
	/// A refresh is in flight; further 401s are queued.
	Refreshing,
}

/// Whether a caller started the refresh or waited for another caller's refresh.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RefreshRole {
	/// The caller invoked the refresher.
	Leader,
	/// The caller was queued behind an in-flight refresh.
	Queued,
}

/// Failure returned by [`RefreshCoordinator::try_refresh`].
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
#[error("{error}")]
pub struct RefreshFailure {
	/// How the caller took part in the refresh.
	pub role: RefreshRole,
	/// The refresh error.
	#[source]
	pub error: RefreshError,
}

type Reply = Result<ApiRequest, RefreshError>;

struct Pending {
	request: ApiRequest,
	reply: oneshot::Sender<Reply>,
}

#[derive(Default)]
struct RefreshState {
	refreshing: bool,
	queue: Vec<Pending>,
}

enum Entry {
	Lead(ApiRequest),
	Wait(oneshot::Receiver<Reply>),
}

/// Serializes refresh attempts and parks 401'd requests while one is in flight.
pub struct RefreshCoordinator {
	refresher: Arc<dyn TokenRefresher>,
	store: TokenStore,
	state: Mutex<RefreshState>,
	metrics: RefreshMetrics,
}
impl RefreshCoordinator {
	/// Creates an idle coordinator that persists refreshed tokens into `store`.
	pub fn new(refresher: Arc<dyn TokenRefresher>, store: TokenStore) -> Self {
		Self { refresher, store, state: Default::default(), metrics: Default::default() }
	}

	/// Returns the current phase.
	pub fn phase(&self) -> RefreshPhase {
		if self.state.lock().refreshing { RefreshPhase::Refreshing } else { RefreshPhase::Idle }
	}

	/// Returns the number of requests parked behind the in-flight refresh.
	pub fn pending(&self) -> usize {
		self.state.lock().queue.len()
	}

	/// Returns the coordinator's counters.
	pub fn metrics(&self) -> &RefreshMetrics {
		&self.metrics
	}

	/// Refreshes the access token, or waits for the in-flight refresh, and returns `failed`
	/// with its `Authorization` header rewritten to the new token.
	pub async fn try_refresh(&self, failed: ApiRequest) -> Result<ApiRequest, RefreshFailure> {
		match self.enter(failed) {
			Entry::Lead(request) => self.lead(request).await,
			Entry::Wait(reply) => {
				let queued = |error| RefreshFailure { role: RefreshRole::Queued, error };

				match reply.await {
					Ok(Ok(request)) => Ok(request),
					Ok(Err(error)) => Err(queued(error)),
					Err(oneshot::Canceled) => Err(queued(RefreshError::Abandoned)),
				}
			},
		}
	}

	// Check-and-update under one lock acquisition; nothing may suspend in between.
	fn enter(&self, failed: ApiRequest) -> Entry {
		let mut state = self.state.lock();

		if state.refreshing {
			let (reply, receiver) = oneshot::channel();

			state.queue.push(Pending { request: failed, reply });
			drop(state);

			self.metrics.record(RefreshOutcome::Queued);

			Entry::Wait(receiver)
		} else {
			state.refreshing = true;

			Entry::Lead(failed)
		}
	}

	async fn lead(&self, mut failed: ApiRequest) -> Result<ApiRequest, RefreshFailure> {
		let mut guard = LeaderGuard { coordinator: self, settled: false };

		self.metrics.record(RefreshOutcome::Attempt);

		let outcome = RequestSpan::refresh().instrument(self.refresher.refresh()).await;

		match outcome {
			Ok(token) => {
				if let Err(e) = self.store.set_token(&token) {
					obs::storage_failure("set_token", &e);
				}

				let queue = guard.settle();

				self.metrics.record(RefreshOutcome::Success);
				obs::refresh_succeeded(queue.len());

				for Pending { mut request, reply } in queue {
					request.set_bearer(&token);

					let _ = reply.send(Ok(request));
				}

				failed.set_bearer(&token);

				Ok(failed)
			},
			Err(error) => {
				let queue = guard.settle();

				self.reject(queue, &error);

				Err(RefreshFailure { role: RefreshRole::Leader, error })
			},
		}
	}

	fn settle(&self) -> Vec<Pending> {
		let mut state = self.state.lock();

		state.refreshing = false;

		mem::take(&mut state.queue)
	}

	fn reject(&self, queue: Vec<Pending>, error: &RefreshError) {
		self.metrics.record(RefreshOutcome::Failure);
		obs::refresh_failed(error, queue.len());

		for pending in queue {
			let _ = pending.reply.send(Err(error.clone()));
		}
	}
}
impl Debug for RefreshCoordinator {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("RefreshCoordinator")
			.field("phase", &self.phase())
			.field("pending", &self.pending())
			.field("metrics", &self.metrics)
			.finish()
	}
}

// Returns the coordinator to idle even if the leading future is dropped mid-refresh.
struct LeaderGuard<'a> {
	coordinator: &'a RefreshCoordinator,
	settled: bool,
}
impl LeaderGuard<'_> {
	fn settle(&mut self) -> Vec<Pending> {
		self.settled = true;

		self.coordinator.settle()
	}
}
impl Drop for LeaderGuard<'_> {
	fn drop(&mut self) {
		if !self.settled {
			let queue = self.settle();

			self.coordinator.reject(queue, &RefreshError::Abandoned);
		}
	}
}
