//! Outbound stage attaching the current session's bearer token.

// self
use crate::{
	_prelude::*,
	auth::SessionProvider,
	http::ApiRequest,
	pipeline::{OutboundStage, StageFuture},
};

/// Sets `Authorization: Bearer <token>` when the resolved session carries an access token.
///
/// Requests without a session or token proceed unauthenticated.
#[derive(Clone)]
pub struct BearerAuth {
	sessions: Arc<dyn SessionProvider>,
}
impl BearerAuth {
	/// Creates the stage over a session provider.
	pub fn new(sessions: Arc<dyn SessionProvider>) -> Self {
		Self { sessions }
	}
}
impl OutboundStage for BearerAuth {
	fn on_request<'a>(&'a self, request: &'a mut ApiRequest) -> StageFuture<'a, Result<()>> {
		Box::pin(async move {
			let token = self.sessions.session().await.and_then(|session| session.access_token);

			if let Some(token) = token {
				request.set_bearer(&token);
			}

			Ok(())
		})
	}
}
impl Debug for BearerAuth {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("BearerAuth(..)")
	}
}
