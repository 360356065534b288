//! Presentation-layer wrapper that exposes a `loading` flag around the typed helpers.

// std
use std::sync::atomic::{AtomicBool, Ordering};
// self
use crate::{_prelude::*, client::ApiClient, error::ApiError};

/// Shared `loading` flag observed by UI code.
#[derive(Clone, Debug, Default)]
pub struct LoadingFlag(Arc<AtomicBool>);
impl LoadingFlag {
	/// Returns `true` while a call issued through the owning [`ApiHook`] is in flight.
	pub fn is_loading(&self) -> bool {
		self.0.load(Ordering::Acquire)
	}

	fn raise(&self) -> LoadingGuard<'_> {
		self.0.store(true, Ordering::Release);

		LoadingGuard(self)
	}
}

// Lowers the flag on every exit path, including errors and cancellation.
struct LoadingGuard<'a>(&'a LoadingFlag);
impl Drop for LoadingGuard<'_> {
	fn drop(&mut self) {
		(self.0).0.store(false, Ordering::Release);
	}
}

/// Wraps an [`ApiClient`] so every helper call toggles a [`LoadingFlag`].
///
/// The flag is a plain boolean: with overlapping calls, the first call to settle lowers it.
#[derive(Clone, Debug)]
pub struct ApiHook {
	client: ApiClient,
	loading: LoadingFlag,
}
impl ApiHook {
	/// Creates a hook with its own idle flag.
	pub fn new(client: ApiClient) -> Self {
		Self { client, loading: LoadingFlag::default() }
	}

	/// Returns `true` while a call is in flight.
	pub fn loading(&self) -> bool {
		self.loading.is_loading()
	}

	/// Returns a handle to the flag that outlives borrows of the hook.
	pub fn loading_flag(&self) -> LoadingFlag {
		self.loading.clone()
	}

	/// Returns the wrapped client.
	pub fn client(&self) -> &ApiClient {
		&self.client
	}

	/// See [`ApiClient::get`].
	pub async fn get<T>(&self, path: &str) -> Result<T, ApiError>
	where
		T: DeserializeOwned,
	{
		let _guard = self.loading.raise();

		self.client.get(path).await
	}

	/// See [`ApiClient::post`].
	pub async fn post<T, B>(&self, path: &str, body: &B) -> Result<T, ApiError>
	where
		T: DeserializeOwned,
		B: ?Sized + Serialize,
	{
		let _guard = self.loading.raise();

		self.client.post(path, body).await
	}

	/// See [`ApiClient::put`].
	pub async fn put<T, B>(&self, path: &str, body: &B) -> Result<T, ApiError>
	where
		T: DeserializeOwned,
		B: ?Sized + Serialize,
	{
		let _guard = self.loading.raise();

		self.client.put(path, body).await
	}

	/// See [`ApiClient::patch`].
	pub async fn patch<T, B>(&self, path: &str, body: &B) -> Result<T, ApiError>
	where
		T: DeserializeOwned,
		B: ?Sized + Serialize,
	{
		let _guard = self.loading.raise();

		self.client.patch(path, body).await
	}

	/// See [`ApiClient::delete`].
	pub async fn delete<T>(&self, path: &str) -> Result<T, ApiError>
	where
		T: DeserializeOwned,
	{
		let _guard = self.loading.raise();

		self.client.delete(path).await
	}
}
