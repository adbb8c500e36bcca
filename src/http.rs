//! Transport primitives for token endpoint calls.
//!
//! The acquirer's only dependency on an HTTP stack is [`TokenHttpClient`]: execute one request,
//! hand back the response with its status, headers, and body. [`TransportErrorMapper`]
//! classifies transport failures so the retry policy can tell a timeout or a reset connection
//! (retryable) from anything else (terminal).

// std
#[cfg(feature = "reqwest")] use std::ops::Deref;
// crates.io
pub use oauth2::{HttpClientError, HttpRequest, HttpResponse};
// self
use crate::{
	_prelude::*,
	error::{ConfigError, TransportError},
};

/// Boxed future returned by [`TokenHttpClient::execute`].
pub type TransportFuture<'a, E> =
	Pin<Box<dyn Future<Output = Result<HttpResponse, HttpClientError<E>>> + 'a + Send>>;

/// HTTP transport capable of executing signed token requests.
///
/// Implementations must be `Send + Sync + 'static` so a single transport can be shared by the
/// client and every cache that refreshes through it. The returned future must be `Send` so
/// refreshes can hop executors.
pub trait TokenHttpClient
where
	Self: 'static + Send + Sync,
{
	/// Concrete error emitted by the underlying transport.
	type TransportError: 'static + Send + Sync + StdError;

	/// Executes `request` and returns the full response regardless of its status.
	fn execute(&self, request: HttpRequest) -> TransportFuture<'_, Self::TransportError>;
}

/// Maps HTTP transport failures into [`TransportError`] values.
pub trait TransportErrorMapper<E>
where
	Self: 'static + Send + Sync,
	E: 'static + Send + Sync + StdError,
{
	/// Converts an [`HttpClientError`] emitted by the transport.
	fn map_transport_error(&self, error: HttpClientError<E>) -> TransportError;
}

/// Thin wrapper around [`ReqwestClient`] so shared HTTP behavior lives in one place.
///
/// Token requests should not follow redirects; configure any custom [`ReqwestClient`] with
/// `redirect::Policy::none()` before wrapping it.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug)]
pub struct ReqwestHttpClient(pub ReqwestClient);
#[cfg(feature = "reqwest")]
impl ReqwestHttpClient {
	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}

	/// Builds a client that never follows redirects and gives up after `timeout`.
	pub fn with_timeout(timeout: StdDuration) -> Result<Self, ConfigError> {
		let client = ReqwestClient::builder()
			.redirect(reqwest::redirect::Policy::none())
			.timeout(timeout)
			.build()?;

		Ok(Self(client))
	}
}
#[cfg(feature = "reqwest")]
impl Default for ReqwestHttpClient {
	fn default() -> Self {
		let client = ReqwestClient::builder()
			.redirect(reqwest::redirect::Policy::none())
			.build()
			.unwrap_or_default();

		Self(client)
	}
}
#[cfg(feature = "reqwest")]
impl AsRef<ReqwestClient> for ReqwestHttpClient {
	fn as_ref(&self) -> &ReqwestClient {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl Deref for ReqwestHttpClient {
	type Target = ReqwestClient;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl TokenHttpClient for ReqwestHttpClient {
	type TransportError = ReqwestError;

	fn execute(&self, request: HttpRequest) -> TransportFuture<'_, Self::TransportError> {
		let client = self.0.clone();

		Box::pin(async move {
			let response =
				client.execute(request.try_into().map_err(Box::new)?).await.map_err(Box::new)?;
			let status = response.status();
			let headers = response.headers().to_owned();
			let mut response_new =
				HttpResponse::new(response.bytes().await.map_err(Box::new)?.to_vec());

			*response_new.status_mut() = status;
			*response_new.headers_mut() = headers;

			Ok(response_new)
		})
	}
}

/// Default mapper for reqwest-backed transports.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug, Default)]
pub struct ReqwestTransportErrorMapper;
#[cfg(feature = "reqwest")]
impl TransportErrorMapper<ReqwestError> for ReqwestTransportErrorMapper {
	fn map_transport_error(&self, err: HttpClientError<ReqwestError>) -> TransportError {
		match err {
			HttpClientError::Reqwest(inner) => map_reqwest_error(*inner),
			HttpClientError::Io(inner) => TransportError::from(inner),
			other => map_generic_transport_error(other),
		}
	}
}

/// Mapper for transports whose errors carry no retry classification; only IO errors are
/// inspected, everything else becomes a terminal [`TransportError::Network`].
#[derive(Clone, Debug, Default)]
pub struct GenericTransportErrorMapper;
impl<E> TransportErrorMapper<E> for GenericTransportErrorMapper
where
	E: 'static + Send + Sync + StdError,
{
	fn map_transport_error(&self, err: HttpClientError<E>) -> TransportError {
		match err {
			HttpClientError::Io(inner) => TransportError::from(inner),
			other => map_generic_transport_error(other),
		}
	}
}

#[cfg(feature = "reqwest")]
fn map_reqwest_error(err: ReqwestError) -> TransportError {
	if err.is_timeout() {
		return TransportError::timeout(err);
	}
	if err.is_connect() || is_dropped_connection(&err) {
		return TransportError::connect(err);
	}

	TransportError::network(err)
}

/// Returns `true` when an established connection was reset or closed before the response
/// completed.
#[cfg(feature = "reqwest")]
fn is_dropped_connection(err: &ReqwestError) -> bool {
	use std::io::ErrorKind;

	let mut source = err.source();

	while let Some(current) = source {
		if current
			.downcast_ref::<hyper::Error>()
			.is_some_and(|e| e.is_incomplete_message() || e.is_closed() || e.is_canceled())
		{
			return true;
		}
		if let Some(e) = current.downcast_ref::<std::io::Error>() {
			return matches!(
				e.kind(),
				ErrorKind::ConnectionReset
					| ErrorKind::ConnectionAborted
					| ErrorKind::BrokenPipe
					| ErrorKind::UnexpectedEof
			);
		}

		source = current.source();
	}

	false
}

fn map_generic_transport_error<E>(err: HttpClientError<E>) -> TransportError
where
	E: 'static + Send + Sync + StdError,
{
	TransportError::network(err)
}
