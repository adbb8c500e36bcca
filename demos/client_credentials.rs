//! Demonstrates signing in with the client-credentials grant against a mock token endpoint and
//! reusing the cached token for outgoing requests.

// std
use std::sync::Arc;
// crates.io
use color_eyre::Result;
use httpmock::prelude::*;
// self
use token_acquirer::{
	auth::{Credentials, GrantRequest},
	cache::{CacheConfig, SignInCache},
	client::TokenClient,
	provider::ClientCredentialsProvider,
	reqwest::Client,
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let server = MockServer::start_async().await;
	let token_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/oauth2/token").header_exists("authorization");
			then.status(200)
				.header("content-type", "application/json")
				.body(r#"{"access_token":"demo-access","expires_in":900}"#);
		})
		.await;
	let api_mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/v1/resource").header("authorization", "Bearer demo-access");
			then.status(200).body("ok");
		})
		.await;
	let credentials = Credentials::new(server.base_url(), "demo-key-id", "demo-key-secret")?;
	let client = Arc::new(TokenClient::new(ClientCredentialsProvider::new(credentials)?)?);
	let cache = SignInCache::signing_in(
		client,
		GrantRequest::ClientCredentials,
		CacheConfig { safety_margin_millis: 60_000, ..Default::default() },
	)?;
	let http = Client::new();

	for _ in 0..3 {
		let request = cache.authorize(http.get(server.url("/v1/resource"))).await?;
		let response = request.send().await?;

		println!("Resource responded with {}.", response.status());
	}

	token_mock.assert_calls_async(1).await;
	api_mock.assert_calls_async(3).await;

	Ok(())
}
