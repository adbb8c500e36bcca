// self
use crate::{
	_prelude::*,
	auth::{AccessTokenResponse, GrantRequest},
	cache::{CacheConfig, ExpiringTokenCache, RefreshFuture, TokenRefresher},
	client::TokenClient,
	http::{TokenHttpClient, TransportErrorMapper},
	obs,
};

/// Cache of access tokens obtained through a [`TokenClient`].
pub type SignInCache<C, M> = ExpiringTokenCache<AccessTokenResponse, SignInRefresher<C, M>>;

/// Refresher that signs in through a [`TokenClient`].
///
/// When the stale token carries a refresh token, the `refresh_token` grant is tried first. An
/// authentication failure on that grant (revoked or expired refresh token) falls back to the
/// base grant; any other failure is returned as-is.
pub struct SignInRefresher<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	client: Arc<TokenClient<C, M>>,
	grant: GrantRequest,
	prefer_refresh_token: bool,
}
impl<C, M> SignInRefresher<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Creates a refresher that falls back to `grant`.
	pub fn new(client: Arc<TokenClient<C, M>>, grant: GrantRequest) -> Self {
		Self { client, grant, prefer_refresh_token: true }
	}

	/// Enables or disables the `refresh_token` grant (enabled by default).
	pub fn with_refresh_token_grant(mut self, enabled: bool) -> Self {
		self.prefer_refresh_token = enabled;

		self
	}

	/// Client used for every sign-in.
	pub fn client(&self) -> &Arc<TokenClient<C, M>> {
		&self.client
	}

	/// Grant used when no refresh token is available.
	pub fn grant(&self) -> &GrantRequest {
		&self.grant
	}

	async fn refresh_token(
		&self,
		current: Option<&AccessTokenResponse>,
	) -> Result<AccessTokenResponse> {
		let rotation = current
			.filter(|_| self.prefer_refresh_token)
			.and_then(|token| token.refresh_token.as_ref().map(|refresh| (token, refresh)));

		if let Some((token, refresh)) = rotation {
			let grant = GrantRequest::refresh_token(token.access_token.clone(), refresh.clone());

			match self.client.sign_in(&grant).await {
				Ok(mut issued) => {
					if issued.refresh_token.is_none() {
						issued.refresh_token = Some(refresh.clone());
					}

					return Ok(issued);
				},
				Err(e) if e.is_authentication() => obs::record_refresh_fallback(e.status()),
				Err(e) => return Err(e),
			}
		}

		self.client.sign_in(&self.grant).await
	}
}
impl<C, M> TokenRefresher<AccessTokenResponse> for SignInRefresher<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn refresh<'a>(
		&'a self,
		current: Option<&'a AccessTokenResponse>,
	) -> RefreshFuture<'a, AccessTokenResponse> {
		Box::pin(self.refresh_token(current))
	}
}
impl<C, M> Debug for SignInRefresher<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("SignInRefresher")
			.field("grant", &self.grant)
			.field("prefer_refresh_token", &self.prefer_refresh_token)
			.finish()
	}
}

impl<C, M> ExpiringTokenCache<AccessTokenResponse, SignInRefresher<C, M>>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Builds a cache that signs in with `grant` and shares the client's clock.
	pub fn signing_in(
		client: Arc<TokenClient<C, M>>,
		grant: GrantRequest,
		config: CacheConfig,
	) -> Result<Self> {
		let clock = client.clock().clone();
		let cache = Self::new(SignInRefresher::new(client, grant), config)?.with_clock(clock);

		Ok(cache)
	}
}
