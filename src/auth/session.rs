//! Session contract consulted by the outbound bearer stage.

// self
use crate::{_prelude::*, auth::AccessToken};

/// Boxed future returned by [`SessionProvider::session`].
pub type SessionFuture<'a> = Pin<Box<dyn Future<Output = Option<Session>> + 'a + Send>>;

/// Source of the current authenticated session.
///
/// Resolution may suspend (for example to read a cookie jar or ask a session service), and a
/// missing session is not an error: requests simply go out unauthenticated.
pub trait SessionProvider
where
	Self: Send + Sync,
{
	/// Resolves the current session, if any.
	fn session(&self) -> SessionFuture<'_>;
}

/// Authenticated session snapshot.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Session {
	/// Access token carried by the session, if one was issued.
	pub access_token: Option<AccessToken>,
}
impl Session {
	/// Creates a session carrying the provided access token.
	pub fn with_access_token(token: impl Into<AccessToken>) -> Self {
		Self { access_token: Some(token.into()) }
	}
}

/// Provider that always yields the same session; useful for service accounts and tests.
#[derive(Clone, Debug, Default)]
pub struct StaticSession(pub Option<Session>);
impl SessionProvider for StaticSession {
	fn session(&self) -> SessionFuture<'_> {
		let session = self.0.clone();

		Box::pin(async move { session })
	}
}
