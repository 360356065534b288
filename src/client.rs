//! The authenticated API client and its typed request helpers.
//!
//! [`ApiClient`] wires the transport, the token store, and the refresh coordinator into one
//! pipeline: [`BearerAuth`] on the way out, then [`RefreshOnUnauthorized`] and
//! [`FailClosedLogout`] on the way back. The typed helpers unwrap the backend's
//! `{ "data": ..., "status": ... }` envelope and normalize every failure into [`ApiError`].

// self
use crate::{
	_prelude::*,
	auth::SessionProvider,
	config::ClientConfig,
	error::{ApiError, ConfigError},
	http::{ApiRequest, HttpTransport, RawResponse},
	obs::{self, RequestOutcome, RequestSpan},
	pipeline::{
		BearerAuth, FailClosedLogout, Pipeline, RefreshOnUnauthorized, SessionExpiredHandler,
	},
	refresh::{RefreshCoordinator, TokenRefresher, UnsupportedRefresher},
	routes,
	store::{MemoryStorage, TokenStore},
};

/// Standard response envelope returned by the backend.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Envelope<T> {
	/// Payload handed back to callers.
	pub data: T,
	/// Status echoed by the backend, if present.
	#[serde(default)]
	pub status: Option<u16>,
}
impl<T> Envelope<T>
where
	T: DeserializeOwned,
{
	/// Decodes the envelope carried by `response` and returns its payload.
	///
	/// An empty body is decoded as JSON `null`, so `()` and `Option<_>` payloads accept
	/// `204 No Content` responses.
	pub fn unwrap_response(response: &RawResponse) -> Result<T> {
		if response.body.iter().all(u8::is_ascii_whitespace) {
			return serde_path_to_error::deserialize(serde_json::Value::Null)
				.map_err(|source| Error::Decode { status: response.status, source });
		}

		response.json::<Envelope<T>>().map(|envelope| envelope.data)
	}
}

/// Authenticated API client.
///
/// Cloning is cheap and clones share the transport, token store, and refresh coordinator, so
/// concurrent 401s from any clone join the same refresh.
#[derive(Clone)]
pub struct ApiClient {
	transport: Arc<dyn HttpTransport>,
	pipeline: Arc<Pipeline>,
	coordinator: Arc<RefreshCoordinator>,
	store: TokenStore,
}
impl ApiClient {
	/// Starts building a client for `config`.
	pub fn builder(config: ClientConfig) -> ApiClientBuilder {
		ApiClientBuilder::new(config)
	}

	/// Returns the token store the client reads bearer tokens from.
	pub fn token_store(&self) -> &TokenStore {
		&self.store
	}

	/// Returns the shared refresh coordinator.
	pub fn refresh_coordinator(&self) -> &RefreshCoordinator {
		&self.coordinator
	}

	/// Sends `request` through the full pipeline and returns the raw 2xx response.
	///
	/// Non-2xx responses that survive the pipeline become [`Error::Status`].
	pub async fn execute(&self, request: ApiRequest) -> Result<RawResponse> {
		let span = RequestSpan::request(request.method.as_str(), &request.path);
		let exchange =
			span.instrument(self.pipeline.dispatch(self.transport.as_ref(), request)).await;
		let result = exchange.into_result();

		obs::record_request_outcome(if result.is_ok() {
			RequestOutcome::Success
		} else {
			RequestOutcome::Failure
		});

		result
	}

	/// Sends `request` and unwraps the response envelope into `T`.
	pub async fn send<T>(&self, request: ApiRequest) -> Result<T, ApiError>
	where
		T: DeserializeOwned,
	{
		let response = self.execute(request).await?;

		Ok(Envelope::unwrap_response(&response)?)
	}

	/// `GET path`.
	pub async fn get<T>(&self, path: &str) -> Result<T, ApiError>
	where
		T: DeserializeOwned,
	{
		self.send(ApiRequest::get(path)).await
	}

	/// `GET path?query`.
	pub async fn get_with<T, I, K, V>(&self, path: &str, query: I) -> Result<T, ApiError>
	where
		T: DeserializeOwned,
		I: IntoIterator<Item = (K, V)>,
		K: Into<String>,
		V: Into<String>,
	{
		self.send(ApiRequest::get(path).with_query(query)).await
	}

	/// `POST path` with a JSON body; a body serializing to `null` is omitted.
	pub async fn post<T, B>(&self, path: &str, body: &B) -> Result<T, ApiError>
	where
		T: DeserializeOwned,
		B: ?Sized + Serialize,
	{
		self.send(with_body(ApiRequest::post(path), body)?).await
	}

	/// `PUT path` with a JSON body; a body serializing to `null` is omitted.
	pub async fn put<T, B>(&self, path: &str, body: &B) -> Result<T, ApiError>
	where
		T: DeserializeOwned,
		B: ?Sized + Serialize,
	{
		self.send(with_body(ApiRequest::put(path), body)?).await
	}

	/// `PATCH path` with a JSON body; a body serializing to `null` is omitted.
	pub async fn patch<T, B>(&self, path: &str, body: &B) -> Result<T, ApiError>
	where
		T: DeserializeOwned,
		B: ?Sized + Serialize,
	{
		self.send(with_body(ApiRequest::patch(path), body)?).await
	}

	/// `DELETE path`.
	pub async fn delete<T>(&self, path: &str) -> Result<T, ApiError>
	where
		T: DeserializeOwned,
	{
		self.send(ApiRequest::delete(path)).await
	}
}
impl Debug for ApiClient {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ApiClient")
			.field("pipeline", &self.pipeline)
			.field("coordinator", &self.coordinator)
			.field("store", &self.store)
			.finish()
	}
}

fn with_body<B>(request: ApiRequest, body: &B) -> Result<ApiRequest, ApiError>
where
	B: ?Sized + Serialize,
{
	let mut request =
		request.with_json(body).map_err(|e| ApiError::from(Error::Config(e.into())))?;

	if request.body.as_ref().is_some_and(serde_json::Value::is_null) {
		request.body = None;
	}

	Ok(request)
}

/// Builder for [`ApiClient`].
pub struct ApiClientBuilder {
	config: ClientConfig,
	transport: Option<Arc<dyn HttpTransport>>,
	store: Option<TokenStore>,
	sessions: Option<Arc<dyn SessionProvider>>,
	refresher: Arc<dyn TokenRefresher>,
	handler: Arc<dyn SessionExpiredHandler>,
	login_path: String,
}
impl ApiClientBuilder {
	/// Creates a builder with an in-memory token store and no refresh support.
	pub fn new(config: ClientConfig) -> Self {
		Self {
			config,
			transport: None,
			store: None,
			sessions: None,
			refresher: Arc::new(UnsupportedRefresher),
			handler: Arc::new(|_login_path: &str| {}),
			login_path: routes::LOGIN_PATH.to_owned(),
		}
	}

	/// Uses a custom transport instead of the reqwest-backed default.
	pub fn transport(mut self, transport: Arc<dyn HttpTransport>) -> Self {
		self.transport = Some(transport);

		self
	}

	/// Uses `store` for bearer lookup, refresh persistence, and logout.
	pub fn token_store(mut self, store: TokenStore) -> Self {
		self.store = Some(store);

		self
	}

	/// Resolves bearer tokens from `sessions` instead of the token store.
	pub fn sessions(mut self, sessions: Arc<dyn SessionProvider>) -> Self {
		self.sessions = Some(sessions);

		self
	}

	/// Sets the operation used to obtain a new access token after a 401.
	pub fn refresher(mut self, refresher: Arc<dyn TokenRefresher>) -> Self {
		self.refresher = refresher;

		self
	}

	/// Sets the callback invoked after an unrecoverable 401 cleared the stored token.
	pub fn on_session_expired(mut self, handler: Arc<dyn SessionExpiredHandler>) -> Self {
		self.handler = handler;

		self
	}

	/// Overrides the login path handed to the session-expired callback.
	pub fn login_path(mut self, login_path: impl Into<String>) -> Self {
		self.login_path = login_path.into();

		self
	}

	/// Assembles the client.
	pub fn build(self) -> Result<ApiClient, ConfigError> {
		let transport = match self.transport {
			Some(transport) => transport,
			None => default_transport(self.config)?,
		};
		let store =
			self.store.unwrap_or_else(|| TokenStore::new(Arc::new(MemoryStorage::default())));
		let sessions = self.sessions.unwrap_or_else(|| Arc::new(store.clone()));
		let coordinator = Arc::new(RefreshCoordinator::new(self.refresher, store.clone()));
		let logout =
			FailClosedLogout::new(store.clone(), self.handler).with_login_path(self.login_path);
		let pipeline = Pipeline::new()
			.with_outbound(Arc::new(BearerAuth::new(sessions)))
			.with_inbound(Arc::new(RefreshOnUnauthorized::new(coordinator.clone())))
			.with_inbound(Arc::new(logout));

		Ok(ApiClient { transport, pipeline: Arc::new(pipeline), coordinator, store })
	}
}
impl Debug for ApiClientBuilder {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ApiClientBuilder")
			.field("config", &self.config)
			.field("custom_transport", &self.transport.is_some())
			.field("store", &self.store)
			.field("login_path", &self.login_path)
			.finish()
	}
}

#[cfg(feature = "reqwest")]
fn default_transport(config: ClientConfig) -> Result<Arc<dyn HttpTransport>, ConfigError> {
	Ok(Arc::new(crate::http::ReqwestTransport::new(config)?))
}

#[cfg(not(feature = "reqwest"))]
fn default_transport(_config: ClientConfig) -> Result<Arc<dyn HttpTransport>, ConfigError> {
	Err(ConfigError::MissingTransport)
}
