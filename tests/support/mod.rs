#![allow(dead_code)]

// std
use std::{collections::VecDeque, io, sync::Arc, time::Duration as StdDuration};
// crates.io
use oauth2::http::{StatusCode, header::AUTHORIZATION};
use parking_lot::Mutex;
// self
use token_acquirer::{
	auth::Credentials,
	client::TokenClient,
	clock::ManualClock,
	http::{
		GenericTransportErrorMapper, HttpClientError, HttpRequest, HttpResponse, TokenHttpClient,
		TransportFuture,
	},
	provider::ClientCredentialsProvider,
	retry::{ExponentialBackoffPolicy, RetryConfig},
};

pub type ScriptedClient = TokenClient<ScriptedTransport, GenericTransportErrorMapper>;

/// One scripted transport outcome.
#[derive(Clone, Debug)]
pub enum Step {
	Respond(u16, &'static str),
	Fail(io::ErrorKind),
}

/// What the transport saw for one call.
#[derive(Clone, Debug)]
pub struct Seen {
	pub authorization: String,
	pub body: String,
}

/// Transport that replays a script; the last step repeats once the script runs out.
#[derive(Debug)]
pub struct ScriptedTransport {
	script: Mutex<VecDeque<Step>>,
	seen: Mutex<Vec<Seen>>,
	delay: StdDuration,
}
impl ScriptedTransport {
	pub fn new(steps: impl IntoIterator<Item = Step>) -> Self {
		Self {
			script: Mutex::new(steps.into_iter().collect()),
			seen: Default::default(),
			delay: StdDuration::ZERO,
		}
	}

	/// Holds every response for `delay` of real time so concurrent callers overlap.
	pub fn with_delay(mut self, delay: StdDuration) -> Self {
		self.delay = delay;

		self
	}

	pub fn calls(&self) -> usize {
		self.seen.lock().len()
	}

	pub fn seen(&self) -> Vec<Seen> {
		self.seen.lock().clone()
	}

	fn next_step(&self) -> Step {
		let mut script = self.script.lock();

		if script.len() > 1 {
			script.pop_front().expect("Script should not be empty.")
		} else {
			script.front().cloned().expect("Script needs at least one step.")
		}
	}
}
impl TokenHttpClient for ScriptedTransport {
	type TransportError = io::Error;

	fn execute(&self, request: HttpRequest) -> TransportFuture<'_, Self::TransportError> {
		let authorization = request
			.headers()
			.get(AUTHORIZATION)
			.and_then(|value| value.to_str().ok())
			.unwrap_or_default()
			.to_owned();
		let body = String::from_utf8_lossy(request.body()).into_owned();

		self.seen.lock().push(Seen { authorization, body });

		let step = self.next_step();
		let delay = self.delay;

		Box::pin(async move {
			if !delay.is_zero() {
				tokio::time::sleep(delay).await;
			}

			match step {
				Step::Respond(status, body) => {
					let mut response = HttpResponse::new(body.as_bytes().to_vec());

					*response.status_mut() =
						StatusCode::from_u16(status).expect("Scripted status should be valid.");

					Ok(response)
				},
				Step::Fail(kind) => Err(HttpClientError::Io(io::Error::from(kind))),
			}
		})
	}
}

pub fn provider() -> ClientCredentialsProvider {
	let credentials = Credentials::new("https://auth.example.com", "key-id", "key-secret")
		.expect("Credential fixture should be valid.");

	ClientCredentialsProvider::new(credentials).expect("Provider fixture should build.")
}

pub fn client(
	transport: &Arc<ScriptedTransport>,
	clock: &Arc<ManualClock>,
	max_number_of_retries: u32,
) -> ScriptedClient {
	let policy = ExponentialBackoffPolicy::new(RetryConfig {
		max_number_of_retries,
		base_interval_millis: 100,
		max_retry_factor: 8,
	})
	.expect("Retry policy fixture should be valid.");

	ScriptedClient::with_http_client(provider(), transport.clone(), GenericTransportErrorMapper)
		.expect("Client fixture should build.")
		.with_clock(clock.clone())
		.with_retry_policy(Arc::new(policy))
}
