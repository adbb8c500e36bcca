//! Static token endpoint configuration.
//!
//! [`ClientCredentialsProvider`] bundles validated [`Credentials`] with the HTTP method, body
//! encoding, and token path used to reach the endpoint. It is the single input needed to build a
//! [`TokenClient`](crate::client::TokenClient) and its [`RequestSigner`].

// crates.io
use oauth2::http::Method;
// self
use crate::{
	_prelude::*,
	auth::{ContentType, Credentials},
	error::ConfigError,
	sign::RequestSigner,
};

/// Path appended to the credential's base URL to reach the token endpoint.
pub const DEFAULT_TOKEN_PATH: &str = "/oauth2/token";

/// Immutable token endpoint configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientCredentialsProvider {
	/// Credentials used to sign every request.
	pub credentials: Credentials,
	/// HTTP method used for token requests.
	pub method: Method,
	/// Body encoding for token requests.
	pub content_type: ContentType,
	token_endpoint: Url,
}
impl ClientCredentialsProvider {
	/// Creates a builder seeded with `credentials`.
	pub fn builder(credentials: Credentials) -> ClientCredentialsProviderBuilder {
		ClientCredentialsProviderBuilder::new(credentials)
	}

	/// Builds a provider with the default method, content type, and token path.
	pub fn new(credentials: Credentials) -> Result<Self, ConfigError> {
		Self::builder(credentials).build()
	}

	/// Fully resolved token endpoint URL.
	pub fn token_endpoint(&self) -> &Url {
		&self.token_endpoint
	}

	/// Builds the signer for this provider's credentials.
	pub fn signer(&self) -> Result<RequestSigner, ConfigError> {
		RequestSigner::from_credentials(&self.credentials)
	}
}

/// Builder for [`ClientCredentialsProvider`] values.
#[derive(Debug)]
pub struct ClientCredentialsProviderBuilder {
	/// Credentials used to sign every request.
	pub credentials: Credentials,
	/// HTTP method used for token requests.
	pub method: Method,
	/// Body encoding for token requests.
	pub content_type: ContentType,
	/// Path appended to the credential's base URL.
	pub token_path: String,
}
impl ClientCredentialsProviderBuilder {
	/// Creates a builder with `POST`, JSON bodies, and [`DEFAULT_TOKEN_PATH`].
	pub fn new(credentials: Credentials) -> Self {
		Self {
			credentials,
			method: Method::POST,
			content_type: ContentType::default(),
			token_path: DEFAULT_TOKEN_PATH.into(),
		}
	}

	/// Overrides the HTTP method.
	pub fn method(mut self, method: Method) -> Self {
		self.method = method;

		self
	}

	/// Overrides the body encoding.
	pub fn content_type(mut self, content_type: ContentType) -> Self {
		self.content_type = content_type;

		self
	}

	/// Overrides the token path.
	pub fn token_path(mut self, path: impl Into<String>) -> Self {
		self.token_path = path.into();

		self
	}

	/// Consumes the builder and resolves the token endpoint.
	pub fn build(self) -> Result<ClientCredentialsProvider, ConfigError> {
		let token_endpoint =
			join_token_path(self.credentials.token_endpoint_url(), &self.token_path)?;

		Ok(ClientCredentialsProvider {
			credentials: self.credentials,
			method: self.method,
			content_type: self.content_type,
			token_endpoint,
		})
	}
}

fn join_token_path(base: &Url, path: &str) -> Result<Url, ConfigError> {
	let path = path.trim();

	if path.trim_matches('/').is_empty() {
		return Err(ConfigError::MissingField { field: "token_path" });
	}

	let mut url = base.clone();
	let joined = format!("{}/{}", base.path().trim_end_matches('/'), path.trim_start_matches('/'));

	url.set_path(&joined);

	Ok(url)
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn credentials(base: &str) -> Credentials {
		Credentials::new(base, "id", "secret").expect("Credential fixture should be valid.")
	}

	#[test]
	fn appends_default_token_path() {
		let provider = ClientCredentialsProvider::new(credentials("https://auth.example.com"))
			.expect("Provider should build.");

		assert_eq!(provider.token_endpoint().as_str(), "https://auth.example.com/oauth2/token");
		assert_eq!(provider.method, Method::POST);
		assert_eq!(provider.content_type, ContentType::Json);
	}

	#[test]
	fn keeps_base_path_prefixes() {
		let provider = ClientCredentialsProvider::new(credentials("https://example.com/iam/"))
			.expect("Provider should build.");

		assert_eq!(provider.token_endpoint().as_str(), "https://example.com/iam/oauth2/token");
	}

	#[test]
	fn builder_overrides_apply() {
		let provider = ClientCredentialsProvider::builder(credentials("https://example.com"))
			.method(Method::PUT)
			.content_type(ContentType::Form)
			.token_path("v2/token")
			.build()
			.expect("Provider should build.");

		assert_eq!(provider.token_endpoint().as_str(), "https://example.com/v2/token");
		assert_eq!(provider.method, Method::PUT);
		assert_eq!(provider.content_type, ContentType::Form);
		assert!(provider.signer().is_ok());
	}

	#[test]
	fn empty_token_path_is_rejected() {
		let err = ClientCredentialsProvider::builder(credentials("https://example.com"))
			.token_path("/")
			.build()
			.expect_err("Empty token paths must be rejected.");

		assert!(matches!(err, ConfigError::MissingField { field: "token_path" }));
	}
}
