//! Decoding of the claims segment embedded in three-part bearer tokens and expiry checks.
//!
//! Tokens are never verified here; the backend owns signature validation. The client only reads
//! the `exp` claim to decide whether a stored token is still worth sending.

// crates.io
use base64::{
	Engine,
	engine::general_purpose::{STANDARD_NO_PAD, URL_SAFE_NO_PAD},
};
// self
use crate::{_prelude::*, obs};

/// Claims read from a token's middle segment.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TokenClaims {
	/// Expiry instant in Unix seconds.
	pub exp: f64,
	/// Subject, if present.
	#[serde(default)]
	pub sub: Option<String>,
}
impl TokenClaims {
	/// Decodes the claims segment of a dot-separated three-part token.
	pub fn decode(token: &str) -> Result<Self, ClaimsError> {
		let mut parts = token.split('.');
		let (Some(_header), Some(payload), Some(_signature), None) =
			(parts.next(), parts.next(), parts.next(), parts.next())
		else {
			return Err(ClaimsError::Malformed);
		};
		let payload = payload.trim_end_matches('=');
		let bytes = if payload.contains(['+', '/']) {
			STANDARD_NO_PAD.decode(payload)
		} else {
			URL_SAFE_NO_PAD.decode(payload)
		}
		.map_err(|_| ClaimsError::Encoding)?;

		serde_json::from_slice(&bytes).map_err(|e| ClaimsError::Json { message: e.to_string() })
	}

	/// Returns `true` if `exp` is at or before `now`.
	pub fn is_expired_at(&self, now: OffsetDateTime) -> bool {
		!self.exp.is_finite() || self.exp <= now.unix_timestamp() as f64
	}
}

/// Reasons a token's claims could not be read.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum ClaimsError {
	/// Token is not made of exactly three dot-separated segments.
	#[error("Token is not a three-part token.")]
	Malformed,
	/// Claims segment is not valid base64.
	#[error("Token claims segment is not valid base64.")]
	Encoding,
	/// Claims segment is not a JSON object with a numeric `exp`.
	#[error("Token claims are invalid: {message}.")]
	Json {
		/// Parser-supplied message.
		message: String,
	},
}

/// Returns `true` when the token is absent, undecodable, or expired at the current instant.
pub fn is_expired(token: Option<&str>) -> bool {
	is_expired_at(token, OffsetDateTime::now_utc())
}

/// Same as [`is_expired`] but evaluated at `now`.
pub fn is_expired_at(token: Option<&str>, now: OffsetDateTime) -> bool {
	let Some(token) = token else {
		return true;
	};

	match TokenClaims::decode(token) {
		Ok(claims) => claims.is_expired_at(now),
		Err(e) => {
			obs::undecodable_token(&e);

			true
		},
	}
}
