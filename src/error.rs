//! Client-level error types shared across the transport, pipeline, and refresh layers, plus
//! the normalized [`ApiError`] surfaced to UI callers.

// self
use crate::_prelude::*;

/// Client-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical client error exposed by the raw (non-normalized) APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Token storage failure.
	#[error("{0}")]
	Storage(
		#[from]
		#[source]
		crate::store::StoreError,
	),
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Transport failure (request never sent, or sent without a response).
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// Token refresh failed while the request was waiting for it.
	#[error(transparent)]
	Refresh(#[from] RefreshError),

	/// Backend answered with a non-2xx status.
	#[error("Server responded with status {status}.")]
	Status {
		/// HTTP status code.
		status: u16,
		/// `message` field extracted from the error body, if any.
		message: Option<String>,
	},
	/// Backend answered 2xx but the body did not match the response envelope.
	#[error("Response body did not match the expected envelope at `{}`.", source.path())]
	Decode {
		/// HTTP status code of the undecodable response.
		status: u16,
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
}
impl Error {
	/// Returns `true` when the error is a 401 response.
	pub fn is_unauthorized(&self) -> bool {
		matches!(self, Self::Status { status: 401, .. })
	}
}

/// Configuration and validation failures raised while assembling a client.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// Base URL cannot be parsed.
	#[error("Base URL `{value}` is invalid.")]
	InvalidBaseUrl {
		/// Raw configured value.
		value: String,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Request path cannot be resolved against the base URL.
	#[error("Request URL `{value}` is invalid.")]
	InvalidRequestUrl {
		/// Resolved URL string.
		value: String,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// A default header name or value is not valid HTTP.
	#[error("Header `{name}` is invalid.")]
	InvalidHeader {
		/// Offending header name.
		name: String,
	},
	/// No transport was configured and no default transport is compiled in.
	#[error("No HTTP transport is configured; enable the `reqwest` feature or provide one.")]
	MissingTransport,
	/// Request body could not be serialized to JSON.
	#[error("Request body could not be serialized.")]
	BodySerialize(#[from] serde_json::Error),
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}

/// Transport-level failures (network, IO, request construction).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// The request could not be built and was never sent.
	#[error("Request could not be built: {source}")]
	Build {
		/// Transport-specific construction error.
		#[source]
		source: BoxError,
	},
	/// The request was sent but no response arrived before the timeout elapsed.
	#[error("Request timed out before the server responded.")]
	Timeout,
	/// The request was sent but the connection failed before a response arrived.
	#[error("Network error occurred while calling the API.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// The status line arrived but the body could not be read.
	#[error("Response body could not be read.")]
	Body {
		/// HTTP status code that was received.
		status: u16,
		/// Transport-specific read error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while calling the API.")]
	Io(#[from] std::io::Error),
}
impl TransportError {
	/// Wraps a request-construction error.
	pub fn build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Build { source: Box::new(src) }
	}

	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}

	/// Wraps a failure to read the body of a response that carried `status`.
	pub fn body(status: u16, src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Body { status, source: Box::new(src) }
	}

	/// Returns `true` when the request left the client but no response was received.
	pub fn is_no_response(&self) -> bool {
		!matches!(self, Self::Build { .. } | Self::Body { .. })
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		if e.is_builder() {
			Self::build(e)
		} else if e.is_timeout() {
			Self::Timeout
		} else {
			Self::network(e)
		}
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Failure reported by a token refresh attempt.
///
/// The type is `Clone` because one failed refresh rejects every queued request with the same
/// value.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum RefreshError {
	/// No refresh operation is configured.
	#[error("Token refresh is not supported by this client.")]
	Unsupported,
	/// The auth service answered but refused to issue a new token.
	#[error("Auth service rejected the token refresh with status {status}.")]
	Rejected {
		/// HTTP status returned by the auth service.
		status: u16,
		/// Service-supplied message, if any.
		message: Option<String>,
	},
	/// The auth service could not be reached.
	#[error("Auth service could not be reached: {message}")]
	Network {
		/// Transport-supplied description.
		message: String,
	},
	/// The refreshing task was dropped before the refresh settled.
	#[error("Token refresh was abandoned before it settled.")]
	Abandoned,
}

/// Broad category of an [`ApiError`], matching the three source conditions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ApiErrorKind {
	/// The server responded with an error status.
	Server,
	/// The request was sent but no response was received.
	NoResponse,
	/// The request was never sent.
	RequestSetup,
}

/// Normalized error surfaced to UI callers of the typed helpers.
///
/// Only `message` and `status` travel over the wire; a deserialized error is classified by its
/// status alone.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
#[serde(from = "WireApiError")]
#[error("{message} (status {status})")]
pub struct ApiError {
	/// Human-readable message.
	pub message: String,
	/// HTTP status code, or `0` when no response was received.
	pub status: u16,
	#[serde(skip)]
	kind: ApiErrorKind,
}
impl ApiError {
	/// Fallback message for error responses without a `message` field.
	pub const SERVER_MESSAGE: &'static str = "Server error occurred.";
	/// Message used when the request was sent but no response arrived.
	pub const NO_RESPONSE_MESSAGE: &'static str =
		"No response from server. Check your network connection.";
	/// Fallback message for requests that could not be built.
	pub const REQUEST_SETUP_MESSAGE: &'static str = "Failed to build the request.";

	/// Creates a normalized error from its parts.
	///
	/// A non-zero status is a [`ApiErrorKind::Server`] error; `0` is a
	/// [`ApiErrorKind::RequestSetup`] error. Use [`ApiError::no_response`] for the third kind.
	pub fn new(message: impl Into<String>, status: u16) -> Self {
		let kind = if status == 0 { ApiErrorKind::RequestSetup } else { ApiErrorKind::Server };

		Self { message: message.into(), status, kind }
	}

	/// The error reported when the request was sent but no response arrived.
	pub fn no_response() -> Self {
		Self {
			message: Self::NO_RESPONSE_MESSAGE.to_owned(),
			status: 0,
			kind: ApiErrorKind::NoResponse,
		}
	}

	/// Returns the condition this error was built from.
	pub fn kind(&self) -> ApiErrorKind {
		self.kind
	}

	fn server(status: u16, message: Option<&str>) -> Self {
		let message = message.filter(|m| !m.trim().is_empty()).unwrap_or(Self::SERVER_MESSAGE);

		Self::new(message, status)
	}

	fn request_setup(message: String) -> Self {
		if message.trim().is_empty() {
			Self::new(Self::REQUEST_SETUP_MESSAGE, 0)
		} else {
			Self::new(message, 0)
		}
	}
}

#[derive(Deserialize)]
struct WireApiError {
	message: String,
	status: u16,
}
impl From<WireApiError> for ApiError {
	fn from(wire: WireApiError) -> Self {
		Self::new(wire.message, wire.status)
	}
}
impl From<&Error> for ApiError {
	fn from(err: &Error) -> Self {
		match err {
			Error::Status { status, message } => Self::server(*status, message.as_deref()),
			Error::Decode { status, .. } => Self::new(err.to_string(), *status),
			Error::Transport(inner @ TransportError::Body { status, .. }) =>
				Self::server(*status, Some(&inner.to_string())),
			Error::Transport(inner) if inner.is_no_response() => Self::no_response(),
			Error::Transport(inner) => Self::request_setup(inner.to_string()),
			Error::Refresh(RefreshError::Rejected { status, message }) =>
				Self::server(*status, message.as_deref()),
			Error::Refresh(RefreshError::Network { .. }) => Self::no_response(),
			Error::Refresh(inner) => Self::request_setup(inner.to_string()),
			Error::Config(inner) => Self::request_setup(inner.to_string()),
			Error::Storage(inner) => Self::request_setup(inner.to_string()),
		}
	}
}
impl From<Error> for ApiError {
	fn from(err: Error) -> Self {
		Self::from(&err)
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn decode_error() -> serde_path_to_error::Error<serde_json::Error> {
		let de = &mut serde_json::Deserializer::from_str("{\"data\":{\"id\":\"x\"}}");

		#[derive(Debug, Deserialize)]
		struct Inner {
			#[allow(dead_code)]
			id: u64,
		}
		#[derive(Debug, Deserialize)]
		struct Outer {
			#[allow(dead_code)]
			data: Inner,
		}

		serde_path_to_error::deserialize::<_, Outer>(de)
			.expect_err("Mismatched fixture should fail to decode.")
	}

	#[test]
	fn server_errors_prefer_body_message() {
		let err = Error::Status { status: 422, message: Some("Email already taken".into()) };
		let api = ApiError::from(&err);

		assert_eq!(api, ApiError::new("Email already taken", 422));
		assert_eq!(api.kind(), ApiErrorKind::Server);

		let err = Error::Status { status: 500, message: None };

		assert_eq!(ApiError::from(err), ApiError::new(ApiError::SERVER_MESSAGE, 500));
	}

	#[test]
	fn missing_responses_normalize_to_status_zero() {
		let api = ApiError::from(Error::Transport(TransportError::Timeout));

		assert_eq!(api, ApiError::no_response());
		assert_eq!(api.kind(), ApiErrorKind::NoResponse);

		let io = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset");

		assert_eq!(ApiError::from(Error::Transport(io.into())).kind(), ApiErrorKind::NoResponse);
	}

	#[test]
	fn unreadable_bodies_keep_the_received_status() {
		let io = std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "truncated");
		let api = ApiError::from(Error::Transport(TransportError::body(502, io)));

		assert_eq!(api, ApiError::new("Response body could not be read.", 502));
		assert_eq!(api.kind(), ApiErrorKind::Server);
	}

	#[test]
	fn kind_is_recorded_at_construction_not_read_from_the_message() {
		let setup = ApiError::from(Error::Config(ConfigError::InvalidHeader { name: "X".into() }));
		let mimic = ApiError::new(ApiError::NO_RESPONSE_MESSAGE, 0);

		assert_eq!(setup.kind(), ApiErrorKind::RequestSetup);
		assert_eq!(mimic.kind(), ApiErrorKind::RequestSetup);
		assert_ne!(mimic, ApiError::no_response());
		assert_eq!(ApiError::no_response().kind(), ApiErrorKind::NoResponse);
	}

	#[test]
	fn wire_form_carries_only_message_and_status() {
		let api = ApiError::no_response();
		let wire = serde_json::to_value(&api).expect("ApiError should serialize.");

		assert_eq!(
			wire,
			serde_json::json!({ "message": ApiError::NO_RESPONSE_MESSAGE, "status": 0 }),
		);

		let back: ApiError = serde_json::from_str(r#"{"message":"Conflict","status":409}"#)
			.expect("Wire error should deserialize.");

		assert_eq!(back, ApiError::new("Conflict", 409));
		assert_eq!(back.kind(), ApiErrorKind::Server);
	}

	#[test]
	fn unsent_requests_keep_the_underlying_message() {
		let err = Error::Config(ConfigError::InvalidHeader { name: "X Bad".into() });
		let api = ApiError::from(&err);

		assert_eq!(api.status, 0);
		assert_eq!(api.message, "Header `X Bad` is invalid.");
		assert_eq!(api.kind(), ApiErrorKind::RequestSetup);
	}

	#[test]
	fn refresh_failures_map_onto_the_three_kinds() {
		let rejected = RefreshError::Rejected { status: 403, message: None };

		assert_eq!(
			ApiError::from(Error::Refresh(rejected)),
			ApiError::new("Server error occurred.", 403),
		);
		assert_eq!(
			ApiError::from(Error::Refresh(RefreshError::Network { message: "refused".into() }))
				.kind(),
			ApiErrorKind::NoResponse,
		);
		assert_eq!(
			ApiError::from(Error::Refresh(RefreshError::Unsupported)).kind(),
			ApiErrorKind::RequestSetup,
		);
	}

	#[test]
	fn decode_errors_keep_status_and_path() {
		let api = ApiError::from(Error::Decode { status: 200, source: decode_error() });

		assert_eq!(api.status, 200);
		assert!(api.message.contains("data.id"), "unexpected message: {}", api.message);
	}
}
