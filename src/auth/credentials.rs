//! Long-lived client credentials validated at construction.

// self
use crate::{_prelude::*, auth::TokenSecret, error::ConfigError};

/// Immutable client credentials used to sign token requests.
///
/// Every field is required; [`Credentials::new`] and deserialization both reject empty values
/// so misconfiguration surfaces at startup instead of on the first token request.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawCredentials", into = "RawCredentials")]
pub struct Credentials {
	token_endpoint_url: Url,
	access_key_id: String,
	access_key_secret: TokenSecret,
}
impl Credentials {
	/// Validates and creates a credential set.
	pub fn new(
		token_endpoint_url: impl AsRef<str>,
		access_key_id: impl Into<String>,
		access_key_secret: impl Into<TokenSecret>,
	) -> Result<Self, ConfigError> {
		let url = token_endpoint_url.as_ref().trim();

		if url.is_empty() {
			return Err(ConfigError::MissingField { field: "token_endpoint_url" });
		}

		let token_endpoint_url =
			Url::parse(url).map_err(|source| ConfigError::InvalidEndpoint { source })?;

		if token_endpoint_url.cannot_be_a_base() {
			return Err(ConfigError::EndpointNotABase { url: token_endpoint_url.to_string() });
		}

		let access_key_id = access_key_id.into();

		if access_key_id.trim().is_empty() {
			return Err(ConfigError::MissingField { field: "access_key_id" });
		}

		let access_key_secret = access_key_secret.into();

		if access_key_secret.is_empty() {
			return Err(ConfigError::MissingField { field: "access_key_secret" });
		}

		Ok(Self { token_endpoint_url, access_key_id, access_key_secret })
	}

	/// Base URL of the token service.
	pub fn token_endpoint_url(&self) -> &Url {
		&self.token_endpoint_url
	}

	/// Public access-key identifier sent alongside every signature.
	pub fn access_key_id(&self) -> &str {
		&self.access_key_id
	}

	/// Shared signing secret.
	pub fn access_key_secret(&self) -> &TokenSecret {
		&self.access_key_secret
	}
}
impl Debug for Credentials {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Credentials")
			.field("token_endpoint_url", &self.token_endpoint_url.as_str())
			.field("access_key_id", &self.access_key_id)
			.field("access_key_secret", &"<redacted>")
			.finish()
	}
}
impl TryFrom<RawCredentials> for Credentials {
	type Error = ConfigError;

	fn try_from(raw: RawCredentials) -> Result<Self, Self::Error> {
		Self::new(raw.token_endpoint_url, raw.access_key_id, raw.access_key_secret)
	}
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawCredentials {
	token_endpoint_url: String,
	access_key_id: String,
	access_key_secret: String,
}
impl From<Credentials> for RawCredentials {
	fn from(value: Credentials) -> Self {
		Self {
			token_endpoint_url: value.token_endpoint_url.into(),
			access_key_id: value.access_key_id,
			access_key_secret: value.access_key_secret.expose().to_owned(),
		}
	}
}
