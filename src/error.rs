//! Acquirer-level error types shared by the signer, retry executor, client, and cache.

// self
use crate::{_prelude::*, auth::ErrorResponse};

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type SharedError = Arc<dyn StdError + Send + Sync>;

/// Canonical error exposed by public APIs.
///
/// Every variant is cheap to clone so a failed single-flight refresh can be handed to all the
/// callers that were queued behind it.
#[derive(Clone, Debug, ThisError)]
pub enum Error {
	/// Local configuration problem detected at construction time.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Transport failure (DNS, TCP, TLS, timeout) that outlived the retry budget.
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// Token endpoint kept answering with a 5xx status after the retry budget.
	#[error("Token endpoint returned a server error.")]
	Server(#[source] HttpStatusError),
	/// Token endpoint rejected the request (any non-success status below 500).
	#[error("Token endpoint rejected the request.")]
	Authentication(#[source] HttpStatusError),
	/// A token endpoint response could not be understood.
	#[error(transparent)]
	Parse(#[from] ParseError),
}
impl Error {
	/// Returns the HTTP status attached to server or authentication failures.
	pub fn status(&self) -> Option<u16> {
		match self {
			Self::Server(e) | Self::Authentication(e) => Some(e.status),
			Self::Parse(e) => e.status(),
			_ => None,
		}
	}

	/// Returns the parsed error body attached to server or authentication failures.
	pub fn error_response(&self) -> Option<&ErrorResponse> {
		match self {
			Self::Server(e) | Self::Authentication(e) => e.body.parsed(),
			_ => None,
		}
	}

	/// Returns `true` when the failure originated from an explicit endpoint rejection.
	pub fn is_authentication(&self) -> bool {
		matches!(self, Self::Authentication(_))
	}
}

/// Configuration and validation failures raised while assembling the acquirer.
#[derive(Clone, Debug, ThisError)]
pub enum ConfigError {
	/// A required credential or provider field was empty.
	#[error("The `{field}` field is required and cannot be empty.")]
	MissingField {
		/// Name of the missing field.
		field: &'static str,
	},
	/// The token endpoint URL could not be parsed.
	#[error("Token endpoint URL is invalid.")]
	InvalidEndpoint {
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// The token endpoint URL cannot carry a path.
	#[error("Token endpoint URL `{url}` cannot be used as a base URL.")]
	EndpointNotABase {
		/// Offending URL.
		url: String,
	},
	/// The signing key was rejected by the MAC implementation.
	#[error("Signing key is invalid.")]
	InvalidSigningKey,
	/// A retry or cache setting is outside its supported range.
	#[error("Invalid {setting} value: {reason}.")]
	InvalidSetting {
		/// Setting name.
		setting: &'static str,
		/// Human-readable explanation.
		reason: String,
	},
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: SharedError,
	},
	/// HTTP request construction failed.
	#[error("HTTP request could not be constructed.")]
	HttpRequest {
		/// Underlying `http` crate failure.
		#[source]
		source: SharedError,
	},
	/// A grant body could not be encoded.
	#[error("Grant request body could not be encoded.")]
	BodyEncoding {
		/// Underlying JSON failure.
		#[source]
		source: SharedError,
	},
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + StdError) -> Self {
		Self::HttpClientBuild { source: Arc::new(src) }
	}
}
impl From<oauth2::http::Error> for ConfigError {
	fn from(e: oauth2::http::Error) -> Self {
		Self::HttpRequest { source: Arc::new(e) }
	}
}
impl From<serde_json::Error> for ConfigError {
	fn from(e: serde_json::Error) -> Self {
		Self::BodyEncoding { source: Arc::new(e) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Transport-level failures (network, IO).
#[derive(Clone, Debug, ThisError)]
pub enum TransportError {
	/// The request timed out before a response arrived.
	#[error("Request timed out while calling the token endpoint.")]
	Timeout {
		/// Transport-specific timeout error.
		#[source]
		source: SharedError,
	},
	/// The connection could not be established or was reset.
	#[error("Connection to the token endpoint failed.")]
	Connect {
		/// Transport-specific connection error.
		#[source]
		source: SharedError,
	},
	/// Underlying HTTP client reported any other network failure.
	#[error("Network error occurred while calling the token endpoint.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: SharedError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while calling the token endpoint.")]
	Io(#[source] Arc<std::io::Error>),
}
impl TransportError {
	/// Wraps a transport-specific timeout.
	pub fn timeout(src: impl 'static + Send + Sync + StdError) -> Self {
		Self::Timeout { source: Arc::new(src) }
	}

	/// Wraps a transport-specific connection failure.
	pub fn connect(src: impl 'static + Send + Sync + StdError) -> Self {
		Self::Connect { source: Arc::new(src) }
	}

	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + StdError) -> Self {
		Self::Network { source: Arc::new(src) }
	}

	/// Returns `true` for socket or connection timeouts and refused/reset connections.
	pub fn is_retryable(&self) -> bool {
		use std::io::ErrorKind;

		match self {
			Self::Timeout { .. } | Self::Connect { .. } => true,
			Self::Network { .. } => false,
			Self::Io(e) => matches!(
				e.kind(),
				ErrorKind::TimedOut
					| ErrorKind::ConnectionRefused
					| ErrorKind::ConnectionReset
					| ErrorKind::ConnectionAborted
			),
		}
	}
}
impl From<std::io::Error> for TransportError {
	fn from(e: std::io::Error) -> Self {
		Self::Io(Arc::new(e))
	}
}

/// Token endpoint answered with a non-success status.
#[derive(Clone, Debug, ThisError)]
#[error("Token endpoint responded with HTTP {status}: {body}.")]
pub struct HttpStatusError {
	/// HTTP status code.
	pub status: u16,
	/// Parsed error payload, or the raw body when it was not valid JSON.
	pub body: ErrorBody,
}

/// Error payload attached to [`HttpStatusError`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ErrorBody {
	/// The body matched the error response schema.
	Parsed(ErrorResponse),
	/// The body could not be parsed; kept verbatim (lossy UTF-8).
	Raw(String),
}
impl ErrorBody {
	/// Returns the parsed error response, if any.
	pub fn parsed(&self) -> Option<&ErrorResponse> {
		match self {
			Self::Parsed(response) => Some(response),
			Self::Raw(_) => None,
		}
	}
}
impl Display for ErrorBody {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		match self {
			Self::Parsed(response) => Display::fmt(response, f),
			Self::Raw(body) if body.is_empty() => f.write_str("<empty body>"),
			Self::Raw(body) => f.write_str(body),
		}
	}
}

/// Response parsing failures; never retried.
#[derive(Clone, Debug, ThisError)]
pub enum ParseError {
	/// Token endpoint responded with a success status but malformed JSON.
	#[error("Token endpoint returned a malformed token response.")]
	TokenResponse {
		/// Structured parsing failure including the offending path.
		#[source]
		source: Arc<serde_path_to_error::Error<serde_json::Error>>,
		/// HTTP status code of the response.
		status: u16,
	},
	/// The token response carried an empty `access_token`.
	#[error("Token endpoint returned an empty access token.")]
	EmptyAccessToken {
		/// HTTP status code of the response.
		status: u16,
	},
	/// The token response carried a negative `expires_in`.
	#[error("Token endpoint returned a negative expires_in value ({value}).")]
	NegativeExpiresIn {
		/// Value reported by the endpoint.
		value: i64,
	},
}
impl ParseError {
	/// Returns the HTTP status associated with the parse failure, when known.
	pub fn status(&self) -> Option<u16> {
		match self {
			Self::TokenResponse { status, .. } | Self::EmptyAccessToken { status } =>
				Some(*status),
			Self::NegativeExpiresIn { .. } => None,
		}
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn retryable_transport_errors_cover_timeouts_and_resets() {
		let reset = TransportError::from(std::io::Error::from(std::io::ErrorKind::ConnectionReset));
		let denied =
			TransportError::from(std::io::Error::from(std::io::ErrorKind::PermissionDenied));
		let timeout = TransportError::timeout(std::io::Error::from(std::io::ErrorKind::TimedOut));

		assert!(reset.is_retryable());
		assert!(timeout.is_retryable());
		assert!(!denied.is_retryable());
		assert!(!TransportError::network(std::fmt::Error).is_retryable());
	}

	#[test]
	fn status_errors_expose_status_and_body() {
		let body = ErrorResponse {
			error_id: Some("e-1".into()),
			http_status: Some(401),
			error_code: Some(40101),
			message: Some("bad signature".into()),
		};
		let err = Error::Authentication(HttpStatusError {
			status: 401,
			body: ErrorBody::Parsed(body.clone()),
		});

		assert_eq!(err.status(), Some(401));
		assert_eq!(err.error_response(), Some(&body));
		assert!(err.is_authentication());

		let source =
			StdError::source(&err).expect("Authentication errors should expose their source.");

		assert!(source.to_string().contains("bad signature"));
	}

	#[test]
	fn raw_bodies_render_verbatim() {
		let err = HttpStatusError { status: 502, body: ErrorBody::Raw("<html>".into()) };

		assert_eq!(err.to_string(), "Token endpoint responded with HTTP 502: <html>.");
		assert!(err.body.parsed().is_none());
	}

	#[test]
	fn errors_clone_with_shared_sources() {
		let err: Error = TransportError::network(std::fmt::Error).into();
		let cloned = err.clone();

		assert_eq!(err.to_string(), cloned.to_string());
	}
}
