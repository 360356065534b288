//! Static route rules served in front of the API client: CORS response headers for the public
//! embed prefix and the permanent `/login` redirect.

// self
use crate::_prelude::*;

/// Path of the login page that expired sessions are sent to.
pub const LOGIN_PATH: &str = "/auth/login";

/// Response headers attached to every path under a prefix.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorsRule {
	/// Path prefix; matches the prefix itself and anything below it.
	pub prefix: String,
	/// `Access-Control-Allow-Credentials`.
	pub allow_credentials: bool,
	/// `Access-Control-Allow-Origin`.
	pub allow_origin: String,
	/// `Access-Control-Allow-Methods`, in declaration order.
	pub allow_methods: Vec<String>,
	/// `Access-Control-Allow-Headers`, in declaration order.
	pub allow_headers: Vec<String>,
}
impl CorsRule {
	/// Returns `true` if `path` equals the prefix or lies below it.
	pub fn matches(&self, path: &str) -> bool {
		let prefix = self.prefix.trim_end_matches('/');
		let path = strip_query(path);

		path == prefix || path.strip_prefix(prefix).is_some_and(|rest| rest.starts_with('/'))
	}

	/// Renders the rule as header name/value pairs.
	pub fn headers(&self) -> Vec<(&'static str, String)> {
		vec![
			("Access-Control-Allow-Credentials", self.allow_credentials.to_string()),
			("Access-Control-Allow-Origin", self.allow_origin.clone()),
			("Access-Control-Allow-Methods", self.allow_methods.join(",")),
			("Access-Control-Allow-Headers", self.allow_headers.join(", ")),
		]
	}
}

/// Exact-path redirect.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Redirect {
	/// Path that triggers the redirect.
	pub source: String,
	/// Path the client is sent to.
	pub destination: String,
	/// Permanent redirects use 308, temporary ones 307.
	pub permanent: bool,
}
impl Redirect {
	/// Status code answered for the redirect.
	pub fn status(&self) -> u16 {
		if self.permanent { 308 } else { 307 }
	}

	/// Builds the `Location` value for `path`, carrying its query string over.
	pub fn location(&self, path: &str) -> String {
		match path.split_once('?') {
			Some((_, query)) if !query.is_empty() => format!("{}?{query}", self.destination),
			_ => self.destination.clone(),
		}
	}
}

/// The frontend's static header and redirect table.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteRules {
	/// CORS rules, evaluated in order; every matching rule contributes headers.
	pub cors: Vec<CorsRule>,
	/// Redirects, evaluated in order; the first match wins.
	pub redirects: Vec<Redirect>,
}
impl RouteRules {
	/// Collects the headers every matching CORS rule declares for `path`.
	pub fn headers_for(&self, path: &str) -> Vec<(&'static str, String)> {
		self.cors.iter().filter(|rule| rule.matches(path)).flat_map(CorsRule::headers).collect()
	}

	/// Returns the redirect that applies to `path`, if any.
	pub fn redirect_for(&self, path: &str) -> Option<&Redirect> {
		let path = strip_query(path);

		self.redirects.iter().find(|redirect| redirect.source == path)
	}
}
impl Default for RouteRules {
	fn default() -> Self {
		let cors = CorsRule {
			prefix: "/e".into(),
			allow_credentials: true,
			allow_origin: "*".into(),
			allow_methods: ["GET", "OPTIONS", "PATCH", "DELETE", "POST", "PUT"]
				.map(String::from)
				.to_vec(),
			allow_headers: [
				"X-CSRF-Token",
				"X-Requested-With",
				"Accept",
				"Accept-Version",
				"Content-Length",
				"Content-MD5",
				"Content-Type",
				"Date",
				"X-Api-Version",
			]
			.map(String::from)
			.to_vec(),
		};
		let login =
			Redirect { source: "/login".into(), destination: LOGIN_PATH.into(), permanent: true };

		Self { cors: vec![cors], redirects: vec![login] }
	}
}

fn strip_query(path: &str) -> &str {
	path.split_once('?').map_or(path, |(path, _)| path)
}
