//! Bearer attachment for outgoing requests, independent of the HTTP client type.

// crates.io
use oauth2::http::{HeaderValue, header::AUTHORIZATION};
// self
use crate::{
	_prelude::*,
	auth::AccessTokenResponse,
	cache::{ExpiringTokenCache, TokenRefresher},
	error::ConfigError,
	http::HttpRequest,
};

/// Attaches an access token to a request using the Bearer scheme.
pub trait AttachBearer
where
	Self: Sized,
{
	/// Error raised when the token cannot be represented in the request.
	type Error: Into<Error>;

	/// Consumes the request and returns it with an `Authorization: Bearer ...` header.
	fn attach_bearer(self, token: &AccessTokenResponse) -> Result<Self, Self::Error>;
}
impl AttachBearer for HttpRequest {
	type Error = ConfigError;

	fn attach_bearer(mut self, token: &AccessTokenResponse) -> Result<Self, Self::Error> {
		let mut value = HeaderValue::try_from(token.bearer_header())
			.map_err(|e| ConfigError::HttpRequest { source: Arc::new(e) })?;

		value.set_sensitive(true);
		self.headers_mut().insert(AUTHORIZATION, value);

		Ok(self)
	}
}
#[cfg(feature = "reqwest")]
impl AttachBearer for reqwest::RequestBuilder {
	type Error = ConfigError;

	fn attach_bearer(self, token: &AccessTokenResponse) -> Result<Self, Self::Error> {
		Ok(self.bearer_auth(token.access_token.expose()))
	}
}

impl<R> ExpiringTokenCache<AccessTokenResponse, R>
where
	R: TokenRefresher<AccessTokenResponse>,
{
	/// Fetches a valid token (refreshing if needed) and attaches it to `request`.
	pub async fn authorize<Q>(&self, request: Q) -> Result<Q>
	where
		Q: AttachBearer,
	{
		let token = self.get_token().await?;

		request.attach_bearer(&token).map_err(Into::into)
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn http_requests_get_a_sensitive_bearer_header() {
		let token = AccessTokenResponse::new("abc", 0);
		let request = HttpRequest::new(Vec::new())
			.attach_bearer(&token)
			.expect("Bearer header should attach.");
		let header = request.headers().get(AUTHORIZATION).expect("Header should be present.");

		assert_eq!(header, "Bearer abc");
		assert!(header.is_sensitive());
	}

	#[test]
	fn control_characters_are_rejected() {
		let token = AccessTokenResponse::new("abc\ndef", 0);

		assert!(HttpRequest::new(Vec::new()).attach_bearer(&token).is_err());
	}

	#[cfg(feature = "reqwest")]
	#[test]
	fn reqwest_builders_get_a_bearer_header() {
		let token = AccessTokenResponse::new("abc", 0);
		let request = ReqwestClient::new()
			.get("https://api.example.com/resource")
			.attach_bearer(&token)
			.expect("Bearer header should attach.")
			.build()
			.expect("Request should build.");

		assert_eq!(
			request.headers().get(AUTHORIZATION).map(|value| value.as_bytes()),
			Some(b"Bearer abc".as_slice())
		);
	}
}
