//! Token endpoint response models.

// self
use crate::{
	_prelude::*,
	auth::TokenSecret,
	error::ParseError,
};

/// Access token issued by the token endpoint.
///
/// Instances are never mutated once issued; a refresh produces a new value that supersedes the
/// cached one.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessTokenResponse {
	/// Bearer credential presented to the resource server.
	pub access_token: TokenSecret,
	/// Lifetime in seconds reported by the endpoint; `None` means the token never expires.
	pub expires_in: Option<i64>,
	/// Refresh token, if the endpoint issued one.
	pub refresh_token: Option<TokenSecret>,
	/// Clock reading (Unix milliseconds) taken when the issuing request was sent.
	pub start_time_millis: i64,
}
impl AccessTokenResponse {
	/// Creates a response captured at `start_time_millis`.
	pub fn new(access_token: impl Into<TokenSecret>, start_time_millis: i64) -> Self {
		Self {
			access_token: access_token.into(),
			expires_in: None,
			refresh_token: None,
			start_time_millis,
		}
	}

	/// Sets the lifetime in seconds.
	pub fn with_expires_in(mut self, seconds: i64) -> Self {
		self.expires_in = Some(seconds);

		self
	}

	/// Sets the refresh token.
	pub fn with_refresh_token(mut self, token: impl Into<TokenSecret>) -> Self {
		self.refresh_token = Some(token.into());

		self
	}

	/// Absolute expiry in Unix milliseconds, or `None` for non-expiring tokens.
	pub fn expiry_millis(&self) -> Option<i64> {
		self.expires_in
			.map(|seconds| self.start_time_millis.saturating_add(seconds.saturating_mul(1_000)))
	}

	/// Value for an `Authorization` header using the Bearer scheme.
	pub fn bearer_header(&self) -> String {
		format!("Bearer {}", self.access_token.expose())
	}

	/// Parses a success body captured at `start_time_millis`.
	pub(crate) fn from_body(
		body: &[u8],
		status: u16,
		start_time_millis: i64,
	) -> Result<Self, ParseError> {
		let mut de = serde_json::Deserializer::from_slice(body);
		let wire: WireTokenResponse = serde_path_to_error::deserialize(&mut de)
			.map_err(|source| ParseError::TokenResponse { source: Arc::new(source), status })?;

		if wire.access_token.is_empty() {
			return Err(ParseError::EmptyAccessToken { status });
		}
		if let Some(value) = wire.expires_in.filter(|value| value.is_negative()) {
			return Err(ParseError::NegativeExpiresIn { value });
		}

		Ok(Self {
			access_token: TokenSecret::new(wire.access_token),
			expires_in: wire.expires_in,
			refresh_token: wire.refresh_token.filter(|t| !t.is_empty()).map(TokenSecret::new),
			start_time_millis,
		})
	}
}
impl Debug for AccessTokenResponse {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("AccessTokenResponse")
			.field("access_token", &"<redacted>")
			.field("expires_in", &self.expires_in)
			.field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
			.field("start_time_millis", &self.start_time_millis)
			.finish()
	}
}

#[derive(Deserialize)]
struct WireTokenResponse {
	access_token: String,
	#[serde(default)]
	expires_in: Option<i64>,
	#[serde(default)]
	refresh_token: Option<String>,
}

/// Error payload returned by the token endpoint on non-success statuses.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
	/// Server-side correlation identifier.
	#[serde(default)]
	pub error_id: Option<String>,
	/// HTTP status echoed in the body.
	#[serde(default)]
	pub http_status: Option<u16>,
	/// Service-specific error code.
	#[serde(default)]
	pub error_code: Option<i64>,
	/// Human-readable message.
	#[serde(default)]
	pub message: Option<String>,
}
impl Display for ErrorResponse {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.message.as_deref().unwrap_or("no message"))?;

		if let Some(code) = self.error_code {
			write!(f, " (code {code})")?;
		}
		if let Some(id) = &self.error_id {
			write!(f, " [error id {id}]")?;
		}

		Ok(())
	}
}
