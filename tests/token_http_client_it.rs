// std
use std::{
	error::Error as StdError,
	fmt::{Display, Formatter, Result as FmtResult},
	sync::{
		Arc,
		atomic::{AtomicUsize, Ordering},
	},
};
// crates.io
use oauth2::http::StatusCode;
// self
use token_acquirer::{
	auth::{Credentials, GrantRequest},
	client::TokenClient,
	clock::ManualClock,
	error::{Error, TransportError},
	http::{
		HttpClientError, HttpRequest, HttpResponse, TokenHttpClient, TransportErrorMapper,
		TransportFuture,
	},
	provider::ClientCredentialsProvider,
};

#[derive(Debug)]
enum FakeTransportError {
	Throttled,
	Refused,
}
impl Display for FakeTransportError {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		match self {
			Self::Throttled => write!(f, "Transport throttled."),
			Self::Refused => write!(f, "Transport refused the request."),
		}
	}
}
impl StdError for FakeTransportError {}

/// Throttles the first `throttled` calls, then issues a token.
#[derive(Default)]
struct FakeHttpClient {
	throttled: usize,
	refuse: bool,
	calls: AtomicUsize,
}
impl TokenHttpClient for FakeHttpClient {
	type TransportError = FakeTransportError;

	fn execute(&self, request: HttpRequest) -> TransportFuture<'_, Self::TransportError> {
		let call = self.calls.fetch_add(1, Ordering::SeqCst);
		let throttled = call < self.throttled;
		let refuse = self.refuse;

		Box::pin(async move {
			assert!(request.headers().contains_key("authorization"));

			if refuse {
				return Err(HttpClientError::Reqwest(Box::new(FakeTransportError::Refused)));
			}
			if throttled {
				return Err(HttpClientError::Reqwest(Box::new(FakeTransportError::Throttled)));
			}

			let mut response = HttpResponse::new(br#"{"access_token":"fake"}"#.to_vec());

			*response.status_mut() = StatusCode::OK;

			Ok(response)
		})
	}
}

/// Treats throttling as a timeout so the retry policy picks it up.
#[derive(Default)]
struct RecordingTransportErrorMapper {
	mapped: AtomicUsize,
}
impl TransportErrorMapper<FakeTransportError> for RecordingTransportErrorMapper {
	fn map_transport_error(&self, error: HttpClientError<FakeTransportError>) -> TransportError {
		self.mapped.fetch_add(1, Ordering::SeqCst);

		match error {
			HttpClientError::Reqwest(inner) => match *inner {
				FakeTransportError::Throttled =>
					TransportError::timeout(FakeTransportError::Throttled),
				FakeTransportError::Refused => TransportError::network(FakeTransportError::Refused),
			},
			other => TransportError::network(other),
		}
	}
}

fn client(
	transport: &Arc<FakeHttpClient>,
	mapper: &Arc<RecordingTransportErrorMapper>,
) -> TokenClient<FakeHttpClient, RecordingTransportErrorMapper> {
	let credentials = Credentials::new("https://auth.example.com", "key-id", "key-secret")
		.expect("Credential fixture should be valid.");
	let provider =
		ClientCredentialsProvider::new(credentials).expect("Provider fixture should build.");

	TokenClient::<FakeHttpClient, RecordingTransportErrorMapper>::with_http_client(
		provider,
		transport.clone(),
		mapper.clone(),
	)
	.expect("Client fixture should build.")
	.with_clock(Arc::new(ManualClock::new(0)))
}

#[tokio::test]
async fn custom_mapper_classifies_retryable_failures() {
	let transport = Arc::new(FakeHttpClient { throttled: 2, ..Default::default() });
	let mapper = Arc::new(RecordingTransportErrorMapper::default());
	let token = client(&transport, &mapper)
		.sign_in(&GrantRequest::ClientCredentials)
		.await
		.expect("Throttled attempts should be retried until success.");

	assert_eq!(token.access_token.expose(), "fake");
	assert_eq!(transport.calls.load(Ordering::SeqCst), 3);
	assert_eq!(mapper.mapped.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn custom_mapper_terminal_failures_surface_immediately() {
	let transport = Arc::new(FakeHttpClient { refuse: true, ..Default::default() });
	let mapper = Arc::new(RecordingTransportErrorMapper::default());
	let err = client(&transport, &mapper)
		.sign_in(&GrantRequest::ClientCredentials)
		.await
		.expect_err("Refused requests should not be retried.");

	assert!(matches!(err, Error::Transport(TransportError::Network { .. })));
	assert_eq!(
		err.to_string(),
		"Network error occurred while calling the token endpoint."
	);
	assert_eq!(transport.calls.load(Ordering::SeqCst), 1);
}
