//! Persistent access-token storage and the key-value backends behind it.

pub mod file;
pub mod memory;

pub use file::FileStorage;
pub use memory::MemoryStorage;

// self
use crate::{
	_prelude::*,
	auth::{self, AccessToken, Session, SessionFuture, SessionProvider},
	obs,
};

/// Fixed storage key holding the access token.
pub const ACCESS_TOKEN_KEY: &str = "access_token";

/// String key-value storage scoped to one client execution context.
pub trait KeyValueStorage
where
	Self: Send + Sync,
{
	/// Reads the value stored under `key`.
	fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

	/// Writes `value` under `key`, replacing any previous value.
	fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

	/// Removes `key`; removing a missing key is not an error.
	fn remove(&self, key: &str) -> Result<(), StoreError>;
}

/// Error type produced by [`KeyValueStorage`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum StoreError {
	/// Serialization failures surfaced by the backend.
	#[error("Serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure for the storage engine.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}

/// Reads and writes the bearer access token.
///
/// A store built with [`TokenStore::detached`] models code running outside a client execution
/// context: reads yield `None` and writes are dropped.
#[derive(Clone)]
pub struct TokenStore {
	backend: Option<Arc<dyn KeyValueStorage>>,
}
impl TokenStore {
	/// Creates a store persisting into `backend`.
	pub fn new(backend: Arc<dyn KeyValueStorage>) -> Self {
		Self { backend: Some(backend) }
	}

	/// Creates a store with no backing storage.
	pub fn detached() -> Self {
		Self { backend: None }
	}

	/// Returns `true` when the store has no backing storage.
	pub fn is_detached(&self) -> bool {
		self.backend.is_none()
	}

	/// Persists `token` under [`ACCESS_TOKEN_KEY`].
	pub fn set_token(&self, token: &AccessToken) -> Result<(), StoreError> {
		let Some(backend) = &self.backend else {
			obs::detached_store_write("set_token");

			return Ok(());
		};

		backend.set(ACCESS_TOKEN_KEY, token.expose())
	}

	/// Returns the persisted token, or `None` when unset, detached, or unreadable.
	pub fn get_token(&self) -> Option<AccessToken> {
		let backend = self.backend.as_ref()?;

		match backend.get(ACCESS_TOKEN_KEY) {
			Ok(value) => value.filter(|v| !v.is_empty()).map(AccessToken::new),
			Err(e) => {
				obs::storage_failure("get_token", &e);

				None
			},
		}
	}

	/// Clears the persisted token.
	pub fn remove_token(&self) -> Result<(), StoreError> {
		let Some(backend) = &self.backend else {
			obs::detached_store_write("remove_token");

			return Ok(());
		};

		backend.remove(ACCESS_TOKEN_KEY)
	}

	/// Returns `true` when `token` is absent, undecodable, or past its `exp` claim.
	pub fn is_expired(&self, token: Option<&AccessToken>) -> bool {
		auth::is_expired(token.map(AccessToken::expose))
	}
}
impl Debug for TokenStore {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenStore").field("detached", &self.is_detached()).finish()
	}
}
impl SessionProvider for TokenStore {
	fn session(&self) -> SessionFuture<'_> {
		Box::pin(async move { self.get_token().map(Session::with_access_token) })
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::_preludet::{memory_token_store, unsigned_token};

	struct BrokenStorage;
	impl KeyValueStorage for BrokenStorage {
		fn get(&self, _key: &str) -> Result<Option<String>, StoreError> {
			Err(StoreError::Backend { message: "disk unplugged".into() })
		}

		fn set(&self, _key: &str, _value: &str) -> Result<(), StoreError> {
			Err(StoreError::Backend { message: "disk unplugged".into() })
		}

		fn remove(&self, _key: &str) -> Result<(), StoreError> {
			Err(StoreError::Backend { message: "disk unplugged".into() })
		}
	}

	#[test]
	fn store_round_trips_token() {
		let store = memory_token_store();

		assert_eq!(store.get_token(), None);

		store.set_token(&AccessToken::new("t1")).expect("Memory storage writes should succeed.");

		assert_eq!(store.get_token().as_ref().map(AccessToken::expose), Some("t1"));

		store.remove_token().expect("Memory storage removals should succeed.");

		assert_eq!(store.get_token(), None);
	}

	#[test]
	fn detached_store_reads_none_and_ignores_writes() {
		let store = TokenStore::detached();

		assert!(store.is_detached());
		assert!(store.set_token(&AccessToken::new("t1")).is_ok());
		assert_eq!(store.get_token(), None);
		assert!(store.remove_token().is_ok());
	}

	#[test]
	fn unreadable_backend_yields_none() {
		let store = TokenStore::new(Arc::new(BrokenStorage));

		assert_eq!(store.get_token(), None);
		assert!(matches!(
			store.set_token(&AccessToken::new("t1")),
			Err(StoreError::Backend { .. })
		));
	}

	#[test]
	fn store_error_converts_into_client_error_with_source() {
		let store_error = StoreError::Backend { message: "database unreachable".into() };
		let client_error: Error = store_error.clone().into();

		assert!(matches!(client_error, Error::Storage(_)));
		assert!(client_error.to_string().contains("database unreachable"));

		let source = StdError::source(&client_error)
			.expect("Client error should expose the original store error as its source.");

		assert_eq!(source.to_string(), store_error.to_string());
	}

	#[test]
	fn expiry_check_treats_missing_token_as_expired() {
		let store = TokenStore::detached();

		assert!(store.is_expired(None));
		assert!(store.is_expired(Some(&AccessToken::new("garbage"))));
	}

	#[test]
	fn expiry_check_reads_the_stored_token() {
		let store = memory_token_store();
		let now = OffsetDateTime::now_utc().unix_timestamp();

		store
			.set_token(&AccessToken::new(unsigned_token(now + 3_600)))
			.expect("Memory storage writes should succeed.");

		assert!(!store.is_expired(store.get_token().as_ref()));

		store
			.set_token(&AccessToken::new(unsigned_token(now - 1)))
			.expect("Memory storage writes should succeed.");

		assert!(store.is_expired(store.get_token().as_ref()));
	}

	#[tokio::test]
	async fn store_backs_the_session() {
		let store = TokenStore::new(Arc::new(MemoryStorage::default()));

		assert_eq!(store.session().await, None);

		store.set_token(&AccessToken::new("t1")).expect("Memory storage writes should succeed.");

		let session = store.session().await.expect("Stored token should produce a session.");

		assert_eq!(session.access_token.as_ref().map(AccessToken::expose), Some("t1"));
	}
}
