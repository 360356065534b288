//! Authenticated API client for the LIF platform - bearer sessions, singleflight token refresh
//! with request replay, and normalized API errors for UI callers.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod hook;
pub mod http;
pub mod obs;
pub mod pipeline;
pub mod refresh;
pub mod routes;
pub mod store;
#[cfg(any(test, feature = "test"))]
pub mod _preludet {
	//! Convenience re-exports and fixtures for tests; enabled via `cfg(test)` or the `test`
	//! crate feature.

	pub use crate::_prelude::*;

	// crates.io
	use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
	// self
	#[cfg(feature = "reqwest")] use crate::{config::ClientConfig, http::ReqwestTransport};
	use crate::store::{MemoryStorage, TokenStore};

	/// Builds a reqwest client that accepts the self-signed certificates produced by `httpmock`
	/// during tests.
	#[cfg(feature = "reqwest")]
	pub fn test_reqwest_client() -> ReqwestClient {
		insecure_builder().build().expect("Failed to build insecure Reqwest client for tests.")
	}

	/// Builds a [`ReqwestTransport`] for `config` on top of the insecure test client settings.
	#[cfg(feature = "reqwest")]
	pub fn test_reqwest_transport(config: ClientConfig) -> Arc<ReqwestTransport> {
		let transport = ReqwestTransport::with_builder(insecure_builder(), config)
			.expect("Failed to build insecure Reqwest transport for tests.");

		Arc::new(transport)
	}

	#[cfg(feature = "reqwest")]
	fn insecure_builder() -> reqwest::ClientBuilder {
		ReqwestClient::builder()
			.danger_accept_invalid_certs(true)
			.danger_accept_invalid_hostnames(true)
	}

	/// Builds a token store backed by a fresh in-memory storage.
	pub fn memory_token_store() -> TokenStore {
		TokenStore::new(Arc::new(MemoryStorage::default()))
	}

	/// Builds an unsigned three-part token whose claims segment carries the provided `exp`.
	pub fn unsigned_token(exp: i64) -> String {
		let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none","typ":"JWT"}"#);
		let claims = URL_SAFE_NO_PAD.encode(format!("{{\"sub\":\"user-1\",\"exp\":{exp}}}"));

		format!("{header}.{claims}.signature")
	}
}

mod _prelude {
	pub use std::{
		collections::{BTreeMap, HashMap},
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		sync::Arc,
	};

	pub use parking_lot::{Mutex, RwLock};
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize, de::DeserializeOwned};
	pub use thiserror::Error as ThisError;
	pub use time::OffsetDateTime;
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(test)] use {color_eyre as _, httpmock as _};
