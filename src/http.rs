//! Transport primitives: the request/response values that flow through the pipeline and the
//! [`HttpTransport`] seam that actually puts them on the wire.
//!
//! The pipeline never talks to an HTTP stack directly. Callers provide an implementation of
//! [`HttpTransport`] (the crate ships [`ReqwestTransport`] behind the `reqwest` feature), and
//! every stage, including the refresh replay path, sends through it.

pub use ::http::Method;

// self
use crate::_prelude::*;
#[cfg(feature = "reqwest")]
use crate::{
	config::ClientConfig,
	error::{ConfigError, TransportError},
};

/// Boxed future returned by [`HttpTransport::send`].
pub type TransportFuture<'a> = Pin<Box<dyn Future<Output = Result<RawResponse>> + 'a + Send>>;

/// Abstraction over HTTP stacks capable of executing API requests.
///
/// Implementations resolve the request path against their base address, attach default
/// headers, and enforce their timeout. Any HTTP status, including 4xx/5xx, is a successful
/// transport outcome; only requests that could not be built or received no response fail.
pub trait HttpTransport
where
	Self: 'static + Send + Sync,
{
	/// Sends `request` and returns the raw response.
	fn send(&self, request: ApiRequest) -> TransportFuture<'_>;
}

/// A request as it travels through the pipeline.
#[derive(Clone, PartialEq)]
pub struct ApiRequest {
	/// HTTP method.
	pub method: Method,
	/// Path relative to the base address, or an absolute URL.
	pub path: String,
	/// Query parameters appended after path resolution.
	pub query: Vec<(String, String)>,
	/// Per-request headers; these win over the transport's defaults.
	pub headers: BTreeMap<String, String>,
	/// JSON body, if any.
	pub body: Option<serde_json::Value>,
	/// Set once the request has been replayed after a 401 so it is never replayed twice.
	pub retried: bool,
}
impl ApiRequest {
	/// Creates a request without query, headers, or body.
	pub fn new(method: Method, path: impl Into<String>) -> Self {
		Self {
			method,
			path: path.into(),
			query: Vec::new(),
			headers: BTreeMap::new(),
			body: None,
			retried: false,
		}
	}

	/// Shorthand for a `GET` request.
	pub fn get(path: impl Into<String>) -> Self {
		Self::new(Method::GET, path)
	}

	/// Shorthand for a `POST` request.
	pub fn post(path: impl Into<String>) -> Self {
		Self::new(Method::POST, path)
	}

	/// Shorthand for a `PUT` request.
	pub fn put(path: impl Into<String>) -> Self {
		Self::new(Method::PUT, path)
	}

	/// Shorthand for a `PATCH` request.
	pub fn patch(path: impl Into<String>) -> Self {
		Self::new(Method::PATCH, path)
	}

	/// Shorthand for a `DELETE` request.
	pub fn delete(path: impl Into<String>) -> Self {
		Self::new(Method::DELETE, path)
	}

	/// Appends query parameters.
	pub fn with_query<I, K, V>(mut self, pairs: I) -> Self
	where
		I: IntoIterator<Item = (K, V)>,
		K: Into<String>,
		V: Into<String>,
	{
		self.query.extend(pairs.into_iter().map(|(k, v)| (k.into(), v.into())));

		self
	}

	/// Serializes `body` as the JSON payload.
	pub fn with_json<B>(mut self, body: &B) -> Result<Self, serde_json::Error>
	where
		B: ?Sized + Serialize,
	{
		self.body = Some(serde_json::to_value(body)?);

		Ok(self)
	}

	/// Adds or replaces a header, matching existing names case-insensitively.
	pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.set_header(name, value);

		self
	}

	/// Adds or replaces a header, matching existing names case-insensitively.
	pub fn set_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
		let name = name.into();

		self.headers.retain(|existing, _| !existing.eq_ignore_ascii_case(&name));
		self.headers.insert(name, value.into());
	}

	/// Returns the value of a header, matching names case-insensitively.
	pub fn header(&self, name: &str) -> Option<&str> {
		self.headers
			.iter()
			.find(|(existing, _)| existing.eq_ignore_ascii_case(name))
			.map(|(_, value)| value.as_str())
	}

	/// Sets `Authorization: Bearer <token>`.
	pub fn set_bearer(&mut self, token: &crate::auth::AccessToken) {
		self.set_header(AUTHORIZATION, token.bearer());
	}

	/// Returns the `Authorization` header value, if any.
	pub fn authorization(&self) -> Option<&str> {
		self.header(AUTHORIZATION)
	}
}
impl Debug for ApiRequest {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		let headers: BTreeMap<&str, &str> = self
			.headers
			.iter()
			.map(|(name, value)| {
				if name.eq_ignore_ascii_case(AUTHORIZATION) {
					(name.as_str(), "<redacted>")
				} else {
					(name.as_str(), value.as_str())
				}
			})
			.collect();

		f.debug_struct("ApiRequest")
			.field("method", &self.method)
			.field("path", &self.path)
			.field("query", &self.query)
			.field("headers", &headers)
			.field("has_body", &self.body.is_some())
			.field("retried", &self.retried)
			.finish()
	}
}

/// Header carrying the bearer credential.
pub const AUTHORIZATION: &str = "Authorization";

/// Response as received from the transport, before envelope decoding.
#[derive(Clone, Debug, Default)]
pub struct RawResponse {
	/// HTTP status code.
	pub status: u16,
	/// Response headers with lossy string values.
	pub headers: BTreeMap<String, String>,
	/// Raw body bytes.
	pub body: Vec<u8>,
}
impl RawResponse {
	/// Creates a response with a status and body.
	pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
		Self { status, headers: BTreeMap::new(), body: body.into() }
	}

	/// Returns `true` for 2xx statuses.
	pub fn is_success(&self) -> bool {
		(200..300).contains(&self.status)
	}

	/// Returns `true` for 401 responses.
	pub fn is_unauthorized(&self) -> bool {
		self.status == 401
	}

	/// Decodes the body as JSON, reporting the failing path on mismatch.
	pub fn json<T>(&self) -> Result<T>
	where
		T: DeserializeOwned,
	{
		let de = &mut serde_json::Deserializer::from_slice(&self.body);

		serde_path_to_error::deserialize(de)
			.map_err(|source| Error::Decode { status: self.status, source })
	}

	/// Extracts a `message` string from a JSON error body.
	pub fn error_message(&self) -> Option<String> {
		#[derive(Deserialize)]
		struct ErrorBody {
			message: Option<String>,
		}

		serde_json::from_slice::<ErrorBody>(&self.body).ok().and_then(|body| body.message)
	}

	/// Converts non-2xx responses into [`Error::Status`].
	pub fn error_for_status(self) -> Result<Self> {
		if self.is_success() {
			Ok(self)
		} else {
			Err(Error::Status { status: self.status, message: self.error_message() })
		}
	}
}

/// [`HttpTransport`] backed by a shared reqwest client configured with the base address,
/// default headers, and timeout from [`ClientConfig`].
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug)]
pub struct ReqwestTransport {
	client: ReqwestClient,
	config: Arc<ClientConfig>,
}
#[cfg(feature = "reqwest")]
impl ReqwestTransport {
	/// Builds a reqwest client from `config`.
	pub fn new(config: ClientConfig) -> Result<Self, ConfigError> {
		Self::with_builder(ReqwestClient::builder(), config)
	}

	/// Finishes `builder` with the default headers and timeout from `config`.
	pub fn with_builder(
		builder: reqwest::ClientBuilder,
		config: ClientConfig,
	) -> Result<Self, ConfigError> {
		let mut headers = reqwest::header::HeaderMap::new();

		for (name, value) in &config.default_headers {
			let invalid = || ConfigError::InvalidHeader { name: name.clone() };
			let name = reqwest::header::HeaderName::from_bytes(name.as_bytes())
				.map_err(|_| invalid())?;
			let value =
				reqwest::header::HeaderValue::from_str(value).map_err(|_| invalid())?;

			headers.insert(name, value);
		}

		let client = builder.default_headers(headers).timeout(config.timeout).build()?;

		Ok(Self::with_client(client, config))
	}

	/// Wraps an existing reqwest client; `config` is only used for URL resolution.
	pub fn with_client(client: ReqwestClient, config: ClientConfig) -> Self {
		Self { client, config: Arc::new(config) }
	}

	/// Returns the configuration used for URL resolution.
	pub fn config(&self) -> &ClientConfig {
		&self.config
	}
}
#[cfg(feature = "reqwest")]
impl HttpTransport for ReqwestTransport {
	fn send(&self, request: ApiRequest) -> TransportFuture<'_> {
		Box::pin(async move {
			let mut url = self.config.resolve(&request.path)?;

			if !request.query.is_empty() {
				url.query_pairs_mut().extend_pairs(request.query.iter());
			}

			let mut builder = self.client.request(request.method.clone(), url);

			for (name, value) in &request.headers {
				builder = builder.header(name.as_str(), value.as_str());
			}
			if let Some(body) = &request.body {
				builder = builder.body(serde_json::to_vec(body).map_err(ConfigError::from)?);
			}

			let response = builder.send().await.map_err(TransportError::from)?;
			let status = response.status().as_u16();
			let headers = response
				.headers()
				.iter()
				.map(|(name, value)| {
					let value = String::from_utf8_lossy(value.as_bytes()).into_owned();

					(name.as_str().to_owned(), value)
				})
				.collect();
			let body =
				response.bytes().await.map_err(|e| TransportError::body(status, e))?.to_vec();

			Ok(RawResponse { status, headers, body })
		})
	}
}
