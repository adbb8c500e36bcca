//! Signed token endpoint client.
//!
//! [`TokenClient::sign_in`] turns a [`GrantRequest`] into an [`AccessTokenResponse`]: it encodes
//! the body for the configured content type, signs every attempt with a fresh timestamp and
//! nonce, runs the transport under the [`RetryExecutor`], and classifies the final status.

// crates.io
use oauth2::http::{
	HeaderValue, Request, StatusCode,
	header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
};
// self
use crate::{
	_prelude::*,
	auth::{AccessTokenResponse, ErrorResponse, GrantRequest},
	clock::{Clock, SystemClock},
	error::{ConfigError, ErrorBody, HttpStatusError},
	http::{HttpRequest, HttpResponse, TokenHttpClient, TransportErrorMapper},
	obs::SignInSpan,
	provider::ClientCredentialsProvider,
	retry::{Attempt, ExponentialBackoffPolicy, RetryExecutor, RetryPolicy},
	sign::RequestSigner,
};
#[cfg(feature = "reqwest")]
use crate::http::{ReqwestHttpClient, ReqwestTransportErrorMapper};

#[cfg(feature = "reqwest")]
/// Client specialized for the crate's default reqwest transport stack.
pub type ReqwestTokenClient = TokenClient<ReqwestHttpClient, ReqwestTransportErrorMapper>;

/// Issues signed grant requests against a single token endpoint.
///
/// The client is immutable after construction and safe to share behind an [`Arc`]; caches hold
/// one and call [`TokenClient::sign_in`] from whichever task wins the refresh.
pub struct TokenClient<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Endpoint configuration and credentials.
	pub provider: ClientCredentialsProvider,
	/// HTTP client wrapper used for every token request.
	pub http_client: Arc<C>,
	/// Mapper applied to transport-layer errors before the retry policy sees them.
	pub transport_mapper: Arc<M>,
	signer: RequestSigner,
	executor: RetryExecutor,
	clock: Arc<dyn Clock>,
}
impl<C, M> TokenClient<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Creates a client that reuses the caller-provided transport + mapper pair.
	///
	/// Uses the system clock and the default [`ExponentialBackoffPolicy`].
	pub fn with_http_client(
		provider: ClientCredentialsProvider,
		http_client: impl Into<Arc<C>>,
		mapper: impl Into<Arc<M>>,
	) -> Result<Self> {
		let clock: Arc<dyn Clock> = Arc::new(SystemClock);
		let signer = provider.signer()?.with_clock(clock.clone());
		let executor =
			RetryExecutor::new(Arc::new(ExponentialBackoffPolicy::default()), clock.clone());

		Ok(Self {
			provider,
			http_client: http_client.into(),
			transport_mapper: mapper.into(),
			signer,
			executor,
			clock,
		})
	}

	/// Replaces the clock used for signing, response capture times, and retry sleeps.
	pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
		self.signer = self.signer.with_clock(clock.clone());
		self.executor = RetryExecutor::new(self.executor.policy().clone(), clock.clone());
		self.clock = clock;

		self
	}

	/// Replaces the retry policy.
	pub fn with_retry_policy(mut self, policy: Arc<dyn RetryPolicy>) -> Self {
		self.executor = RetryExecutor::new(policy, self.clock.clone());

		self
	}

	/// Clock shared by the signer and the retry executor.
	pub fn clock(&self) -> &Arc<dyn Clock> {
		&self.clock
	}

	/// Performs one logical grant call, retrying transient failures per the policy.
	pub async fn sign_in(&self, grant: &GrantRequest) -> Result<AccessTokenResponse> {
		let span = SignInSpan::new(grant.grant_type(), "sign_in");
		let result = span.instrument(self.sign_in_inner(grant, &span)).await;

		span.record_outcome(&result);

		result
	}

	async fn sign_in_inner(
		&self,
		grant: &GrantRequest,
		span: &SignInSpan,
	) -> Result<AccessTokenResponse> {
		let body = grant.encode(self.provider.content_type).map_err(ConfigError::from)?;
		let form_params = grant.form_params();
		let (this, body, form_params) = (self, body.as_slice(), &form_params);
		let outcome = self
			.executor
			.try_execute(move || async move {
				let request = this.build_request(body, form_params)?;
				let result = this
					.http_client
					.execute(request)
					.await
					.map_err(|e| this.transport_mapper.map_transport_error(e));

				Ok::<_, ConfigError>(Attempt::from(result))
			})
			.await?;

		span.record_retries(outcome.retry_count);

		interpret_response(outcome.result?, outcome.last_started_millis)
	}

	fn build_request(
		&self,
		body: &[u8],
		form_params: &BTreeMap<String, String>,
	) -> Result<HttpRequest, ConfigError> {
		let endpoint = self.provider.token_endpoint();
		let authorization = self.signer.authorize(&self.provider.method, endpoint, form_params)?;
		let request = Request::builder()
			.method(self.provider.method.clone())
			.uri(endpoint.as_str())
			.header(CONTENT_TYPE, HeaderValue::from_static(self.provider.content_type.mime()))
			.header(ACCEPT, HeaderValue::from_static("application/json"))
			.header(AUTHORIZATION, authorization)
			.body(body.to_vec())?;

		Ok(request)
	}
}
#[cfg(feature = "reqwest")]
impl TokenClient<ReqwestHttpClient, ReqwestTransportErrorMapper> {
	/// Creates a client that provisions its own reqwest-backed transport.
	pub fn new(provider: ClientCredentialsProvider) -> Result<Self> {
		Self::with_http_client(
			provider,
			ReqwestHttpClient::default(),
			Arc::new(ReqwestTransportErrorMapper),
		)
	}
}
impl<C, M> Debug for TokenClient<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenClient")
			.field("provider", &self.provider)
			.field("signer", &self.signer)
			.field("executor", &self.executor)
			.finish()
	}
}

fn interpret_response(response: HttpResponse, sent_at_millis: i64) -> Result<AccessTokenResponse> {
	let status = response.status();

	if matches!(status, StatusCode::OK | StatusCode::CREATED | StatusCode::NO_CONTENT) {
		let token =
			AccessTokenResponse::from_body(response.body(), status.as_u16(), sent_at_millis)?;

		return Ok(token);
	}

	let body = match serde_json::from_slice::<ErrorResponse>(response.body()) {
		Ok(parsed) => ErrorBody::Parsed(parsed),
		Err(_) => ErrorBody::Raw(String::from_utf8_lossy(response.body()).into_owned()),
	};
	let failure = HttpStatusError { status: status.as_u16(), body };

	if status.as_u16() >= 500 {
		Err(Error::Server(failure))
	} else {
		Err(Error::Authentication(failure))
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn response(status: u16, body: &str) -> HttpResponse {
		let mut response = HttpResponse::new(body.as_bytes().to_vec());

		*response.status_mut() =
			StatusCode::from_u16(status).expect("Test status code should be valid.");

		response
	}

	#[test]
	fn success_statuses_parse_tokens() {
		for status in [200, 201] {
			let token = interpret_response(
				response(status, r#"{"access_token":"abc","expires_in":60}"#),
				1_000,
			)
			.expect("Success statuses should parse.");

			assert_eq!(token.expiry_millis(), Some(61_000));
		}

		let err = interpret_response(response(204, ""), 0)
			.expect_err("An empty 204 body has no token to parse.");

		assert!(matches!(err, Error::Parse(_)));
	}

	#[test]
	fn client_errors_carry_the_parsed_body() {
		let body = r#"{"errorId":"e-1","httpStatus":401,"errorCode":1003,"message":"nope"}"#;
		let err = interpret_response(response(401, body), 0).expect_err("401 must fail.");

		assert!(err.is_authentication());
		assert_eq!(err.status(), Some(401));
		assert_eq!(err.error_response().and_then(|body| body.error_code), Some(1003));
	}

	#[test]
	fn unparseable_error_bodies_fall_back_to_raw_text() {
		let err = interpret_response(response(502, "<html>bad gateway</html>"), 0)
			.expect_err("502 must fail.");

		match err {
			Error::Server(HttpStatusError { status, body: ErrorBody::Raw(raw) }) => {
				assert_eq!(status, 502);
				assert_eq!(raw, "<html>bad gateway</html>");
			},
			other => panic!("Unexpected error: {other:?}."),
		}
	}

	#[test]
	fn redirects_are_authentication_failures() {
		let err = interpret_response(response(302, ""), 0).expect_err("302 must fail.");

		assert!(err.is_authentication());
		assert!(err.error_response().is_none());
	}
}
