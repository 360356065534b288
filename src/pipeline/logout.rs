//! Inbound stage enforcing the fail-closed logout policy.

// self
use crate::{
	_prelude::*,
	http::HttpTransport,
	obs,
	pipeline::{Exchange, InboundStage, StageFuture},
	routes,
	store::TokenStore,
};

/// Reacts to a session that can no longer be authenticated.
///
/// UI shells typically navigate to `login_path`; closures implement the trait directly.
pub trait SessionExpiredHandler
where
	Self: Send + Sync,
{
	/// Called after the stored token has been cleared.
	fn session_expired(&self, login_path: &str);
}
impl<F> SessionExpiredHandler for F
where
	F: Fn(&str) + Send + Sync,
{
	fn session_expired(&self, login_path: &str) {
		self(login_path)
	}
}

/// Clears the stored token and notifies the handler whenever an exchange still ends
/// unauthorized after the refresh stage had its chance.
#[derive(Clone)]
pub struct FailClosedLogout {
	store: TokenStore,
	handler: Arc<dyn SessionExpiredHandler>,
	login_path: String,
}
impl FailClosedLogout {
	/// Creates the stage redirecting to the default login path.
	pub fn new(store: TokenStore, handler: Arc<dyn SessionExpiredHandler>) -> Self {
		Self { store, handler, login_path: routes::LOGIN_PATH.to_owned() }
	}

	/// Overrides the login path passed to the handler.
	pub fn with_login_path(mut self, login_path: impl Into<String>) -> Self {
		self.login_path = login_path.into();

		self
	}
}
impl InboundStage for FailClosedLogout {
	fn on_exchange<'a>(
		&'a self,
		exchange: Exchange,
		_transport: &'a dyn HttpTransport,
	) -> StageFuture<'a, Exchange> {
		Box::pin(async move {
			if exchange.is_unauthorized() {
				if let Err(e) = self.store.remove_token() {
					obs::storage_failure("remove_token", &e);
				}

				obs::session_expired(&self.login_path);
				self.handler.session_expired(&self.login_path);
			}

			exchange
		})
	}
}
impl Debug for FailClosedLogout {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("FailClosedLogout")
			.field("store", &self.store)
			.field("login_path", &self.login_path)
			.finish()
	}
}
