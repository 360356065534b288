//! Client configuration: base address, default headers, and timeout.

// std
use std::{env, time::Duration as StdDuration};
// self
use crate::{_prelude::*, error::ConfigError};

/// Connection settings shared by every request a client issues.
#[derive(Clone, Debug)]
pub struct ClientConfig {
	/// Base address that relative request paths are appended to.
	pub base_url: Url,
	/// Per-request timeout; the only automatic termination of an in-flight request.
	pub timeout: StdDuration,
	/// Headers attached to every request.
	pub default_headers: BTreeMap<String, String>,
}
impl ClientConfig {
	/// Environment variable holding the base address.
	pub const BASE_URL_ENV: &'static str = "LIF_API_URL";
	/// Base address used when the environment does not provide one.
	pub const DEFAULT_BASE_URL: &'static str = "http://localhost:8000/api";
	/// Default request timeout.
	pub const DEFAULT_TIMEOUT: StdDuration = StdDuration::from_millis(10_000);

	/// Creates a configuration for `base_url` with the JSON content type and default timeout.
	pub fn new(base_url: Url) -> Self {
		let mut default_headers = BTreeMap::new();

		default_headers.insert("Content-Type".into(), "application/json".into());

		Self { base_url, timeout: Self::DEFAULT_TIMEOUT, default_headers }
	}

	/// Builds a configuration from the process environment.
	pub fn from_env() -> Result<Self, ConfigError> {
		Self::from_lookup(|key| env::var(key).ok())
	}

	/// Builds a configuration from an arbitrary variable lookup.
	pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
	where
		F: Fn(&str) -> Option<String>,
	{
		let raw = lookup(Self::BASE_URL_ENV)
			.map(|v| v.trim().to_owned())
			.filter(|v| !v.is_empty())
			.unwrap_or_else(|| Self::DEFAULT_BASE_URL.to_owned());
		let base_url = Url::parse(&raw)
			.map_err(|source| ConfigError::InvalidBaseUrl { value: raw.clone(), source })?;

		Ok(Self::new(base_url))
	}

	/// Overrides the request timeout.
	pub fn with_timeout(mut self, timeout: StdDuration) -> Self {
		self.timeout = timeout;

		self
	}

	/// Adds or replaces a default header.
	pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.default_headers.insert(name.into(), value.into());

		self
	}

	/// Resolves a request path against the base address.
	///
	/// Absolute URLs are returned as-is. Relative paths keep the base's path prefix and are
	/// joined with exactly one `/`.
	pub fn resolve(&self, path: &str) -> Result<Url, ConfigError> {
		if let Ok(absolute) = Url::parse(path) {
			return Ok(absolute);
		}

		let base = self.base_url.as_str().trim_end_matches('/');
		let joined = if path.is_empty() {
			base.to_owned()
		} else {
			format!("{base}/{}", path.trim_start_matches('/'))
		};

		Url::parse(&joined)
			.map_err(|source| ConfigError::InvalidRequestUrl { value: joined, source })
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn config_for(base: &str) -> ClientConfig {
		ClientConfig::new(Url::parse(base).expect("Fixture base URL should parse."))
	}

	#[test]
	fn defaults_match_the_backend_contract() {
		let config =
			ClientConfig::from_lookup(|_| None).expect("Default base URL should parse.");

		assert_eq!(config.base_url.as_str(), "http://localhost:8000/api");
		assert_eq!(config.timeout, StdDuration::from_secs(10));
		assert_eq!(
			config.default_headers.get("Content-Type").map(String::as_str),
			Some("application/json"),
		);
	}

	#[test]
	fn lookup_overrides_base_url() {
		let config = ClientConfig::from_lookup(|key| {
			(key == ClientConfig::BASE_URL_ENV).then(|| "https://api.lif.example/v1/".to_owned())
		})
		.expect("Configured base URL should parse.");

		assert_eq!(config.base_url.as_str(), "https://api.lif.example/v1/");
	}

	#[test]
	fn invalid_base_url_is_rejected() {
		let err = ClientConfig::from_lookup(|_| Some("not a url".into()))
			.expect_err("Relative base URLs should be rejected.");

		assert!(matches!(err, ConfigError::InvalidBaseUrl { .. }));
	}

	#[test]
	fn relative_paths_keep_the_base_prefix() {
		let config = config_for("http://localhost:8000/api");

		assert_eq!(
			config.resolve("/users/1").expect("Path should resolve.").as_str(),
			"http://localhost:8000/api/users/1",
		);
		assert_eq!(
			config.resolve("users").expect("Path should resolve.").as_str(),
			"http://localhost:8000/api/users",
		);

		let config = config_for("http://localhost:8000/api/");

		assert_eq!(
			config.resolve("//users").expect("Path should resolve.").as_str(),
			"http://localhost:8000/api/users",
		);
	}

	#[test]
	fn absolute_urls_bypass_the_base() {
		let config = config_for("http://localhost:8000/api");

		assert_eq!(
			config
				.resolve("https://auth.lif.example/refresh")
				.expect("URL should resolve.")
				.as_str(),
			"https://auth.lif.example/refresh",
		);
	}

	#[test]
	fn builder_overrides_apply() {
		let config = config_for("http://localhost:8000/api")
			.with_timeout(StdDuration::from_secs(3))
			.with_header("X-Api-Version", "2");

		assert_eq!(config.timeout, StdDuration::from_secs(3));
		assert_eq!(config.default_headers.get("X-Api-Version").map(String::as_str), Some("2"));
	}
}
