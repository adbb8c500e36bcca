mod support;

// std
use std::{io::ErrorKind, sync::Arc};
// crates.io
use time::Duration;
// self
use support::{ScriptedTransport, Step};
use token_acquirer::{
	auth::GrantRequest,
	clock::{Clock, ManualClock},
	error::{Error, TransportError},
	retry::NeverRetry,
};

const TOKEN: &str = r#"{"access_token":"issued","expires_in":60}"#;

#[tokio::test]
async fn server_error_then_success_retries_once() {
	let transport = Arc::new(ScriptedTransport::new([
		Step::Respond(503, "unavailable"),
		Step::Respond(200, TOKEN),
	]));
	let clock = Arc::new(ManualClock::new(0));
	let client = support::client(&transport, &clock, 3);
	let token = client
		.sign_in(&GrantRequest::ClientCredentials)
		.await
		.expect("The retried call should succeed.");

	assert_eq!(token.access_token.expose(), "issued");
	assert_eq!(transport.calls(), 2);
	assert_eq!(clock.sleeps().len(), 1);
	assert!(clock.sleeps()[0] <= Duration::milliseconds(100 * 8));
}

#[tokio::test]
async fn timeouts_are_retried_until_success() {
	let transport = Arc::new(ScriptedTransport::new([
		Step::Fail(ErrorKind::TimedOut),
		Step::Fail(ErrorKind::ConnectionRefused),
		Step::Respond(200, TOKEN),
	]));
	let clock = Arc::new(ManualClock::new(1_000));
	let client = support::client(&transport, &clock, 3);
	let token = client
		.sign_in(&GrantRequest::ClientCredentials)
		.await
		.expect("Transient transport failures should be retried.");

	assert_eq!(transport.calls(), 3);
	// Captured when the successful attempt was sent, after the virtual backoff sleeps.
	assert_eq!(token.start_time_millis, clock.now_millis());
	assert_eq!(token.expiry_millis(), Some(clock.now_millis() + 60_000));
}

#[tokio::test]
async fn persistent_server_errors_surface_after_the_budget() {
	let transport = Arc::new(ScriptedTransport::new([Step::Respond(
		503,
		r#"{"errorId":"e-503","httpStatus":503,"message":"maintenance"}"#,
	)]));
	let clock = Arc::new(ManualClock::new(0));
	let client = support::client(&transport, &clock, 2);
	let err = client
		.sign_in(&GrantRequest::ClientCredentials)
		.await
		.expect_err("A persistent 503 must not be swallowed.");

	assert!(matches!(err, Error::Server(_)));
	assert_eq!(err.status(), Some(503));
	assert_eq!(
		err.error_response().and_then(|body| body.message.as_deref()),
		Some("maintenance")
	);
	assert_eq!(transport.calls(), 3);
	assert_eq!(clock.sleeps().len(), 2);
}

#[tokio::test]
async fn retryable_transport_errors_surface_after_the_budget() {
	let transport = Arc::new(ScriptedTransport::new([Step::Fail(ErrorKind::ConnectionReset)]));
	let clock = Arc::new(ManualClock::new(0));
	let client = support::client(&transport, &clock, 1);
	let err = client
		.sign_in(&GrantRequest::ClientCredentials)
		.await
		.expect_err("Exhausted transport retries must fail.");

	assert!(matches!(err, Error::Transport(TransportError::Io(_))));
	assert_eq!(transport.calls(), 2);
}

#[tokio::test]
async fn terminal_failures_are_not_retried() {
	let transport = Arc::new(ScriptedTransport::new([Step::Fail(ErrorKind::PermissionDenied)]));
	let clock = Arc::new(ManualClock::new(0));
	let client = support::client(&transport, &clock, 5);
	let err = client
		.sign_in(&GrantRequest::ClientCredentials)
		.await
		.expect_err("Non-retryable transport errors must fail.");

	assert!(matches!(err, Error::Transport(_)));
	assert_eq!(transport.calls(), 1);

	let transport = Arc::new(ScriptedTransport::new([
		Step::Respond(200, r#"{"access_token":"#),
		Step::Respond(200, TOKEN),
	]));
	let client = support::client(&transport, &clock, 5);
	let err = client
		.sign_in(&GrantRequest::ClientCredentials)
		.await
		.expect_err("Malformed success bodies must fail.");

	assert!(matches!(err, Error::Parse(_)));
	assert_eq!(err.status(), Some(200));
	assert_eq!(transport.calls(), 1);
	assert!(clock.sleeps().is_empty());
}

#[tokio::test]
async fn every_attempt_is_signed_again() {
	let transport = Arc::new(ScriptedTransport::new([
		Step::Respond(500, ""),
		Step::Respond(502, ""),
		Step::Respond(200, TOKEN),
	]));
	let clock = Arc::new(ManualClock::new(0));
	let client = support::client(&transport, &clock, 3);

	client.sign_in(&GrantRequest::ClientCredentials).await.expect("Third attempt should succeed.");

	let headers = transport.seen().into_iter().map(|seen| seen.authorization).collect::<Vec<_>>();

	assert_eq!(headers.len(), 3);
	assert!(headers.iter().all(|header| header.starts_with("HMAC-SHA256 Credential=key-id, ")));
	assert_ne!(headers[0], headers[1]);
	assert_ne!(headers[1], headers[2]);
}

#[tokio::test]
async fn never_retry_makes_a_single_call() {
	let transport = Arc::new(ScriptedTransport::new([Step::Respond(503, "")]));
	let clock = Arc::new(ManualClock::new(0));
	let client = support::client(&transport, &clock, 3).with_retry_policy(Arc::new(NeverRetry));
	let err = client
		.sign_in(&GrantRequest::ClientCredentials)
		.await
		.expect_err("503 should fail without retries.");

	assert!(matches!(err, Error::Server(_)));
	assert_eq!(transport.calls(), 1);
}
