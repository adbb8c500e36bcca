//! Expiring token cache with single-flight refreshes.
//!
//! [`ExpiringTokenCache::get_token`] serves the cached token while `now < expiry - margin` and
//! otherwise refreshes it through a [`TokenRefresher`]. At most one refresh runs at a time; tasks
//! that arrive during a refresh queue on the same guard and, once it completes, observe either
//! the new token or the failure that ended it. A failed refresh leaves the previous entry in
//! place and never falls back to serving it.

mod metrics;
mod refresher;

pub use metrics::CacheMetrics;
pub use refresher::*;

// self
use crate::{
	_prelude::*,
	auth::AccessTokenResponse,
	clock::{Clock, SystemClock},
	error::ConfigError,
	obs::{self, CacheEvent},
};

/// Boxed future returned by [`TokenRefresher::refresh`].
pub type RefreshFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + 'a + Send>>;

/// Value that knows when it stops being valid.
pub trait ExpiringToken
where
	Self: 'static + Clone + Send + Sync,
{
	/// Absolute expiry in Unix milliseconds; `None` means the value never expires.
	fn expiry_millis(&self) -> Option<i64>;
}
impl ExpiringToken for AccessTokenResponse {
	fn expiry_millis(&self) -> Option<i64> {
		AccessTokenResponse::expiry_millis(self)
	}
}

/// Produces a replacement token.
pub trait TokenRefresher<T>
where
	Self: Send + Sync,
{
	/// Fetches a new token; `current` is the stale entry, if any.
	fn refresh<'a>(&'a self, current: Option<&'a T>) -> RefreshFuture<'a, T>;
}

/// Serializable cache settings.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
	/// Tokens are treated as expired this long before their real expiry.
	pub safety_margin_millis: u64,
	/// When set, a refreshed token expires this long after its refresh started, regardless of
	/// the lifetime the endpoint reported.
	pub refresh_interval_millis: Option<u64>,
}
impl CacheConfig {
	fn validate(&self) -> Result<(), ConfigError> {
		if i64::try_from(self.safety_margin_millis).is_err() {
			return Err(ConfigError::InvalidSetting {
				setting: "safety_margin_millis",
				reason: "exceeds the supported range".into(),
			});
		}

		match self.refresh_interval_millis {
			Some(0) => Err(ConfigError::InvalidSetting {
				setting: "refresh_interval_millis",
				reason: "must be greater than zero".into(),
			}),
			Some(interval) if i64::try_from(interval).is_err() => Err(ConfigError::InvalidSetting {
				setting: "refresh_interval_millis",
				reason: "exceeds the supported range".into(),
			}),
			_ => Ok(()),
		}
	}

	fn margin(&self) -> i64 {
		i64::try_from(self.safety_margin_millis).unwrap_or(i64::MAX)
	}

	fn interval(&self) -> Option<i64> {
		self.refresh_interval_millis.map(|interval| i64::try_from(interval).unwrap_or(i64::MAX))
	}
}

#[derive(Debug)]
struct CachedEntry<T> {
	token: T,
	expiry_millis: Option<i64>,
}
impl<T> CachedEntry<T> {
	fn is_fresh(&self, now_millis: i64, margin_millis: i64) -> bool {
		match self.expiry_millis {
			None => true,
			Some(expiry) => now_millis < expiry.saturating_sub(margin_millis),
		}
	}
}

#[derive(Debug)]
struct CacheState<T> {
	entry: Option<CachedEntry<T>>,
	completed_refreshes: u64,
	last_failure: Option<Error>,
}
impl<T> CacheState<T>
where
	T: ExpiringToken,
{
	fn fresh_token(&self, now_millis: i64, margin_millis: i64) -> Option<T> {
		self.entry
			.as_ref()
			.filter(|entry| entry.is_fresh(now_millis, margin_millis))
			.map(|entry| entry.token.clone())
	}
}
impl<T> Default for CacheState<T> {
	fn default() -> Self {
		Self { entry: None, completed_refreshes: 0, last_failure: None }
	}
}

/// Thread-safe cache holding at most one token.
pub struct ExpiringTokenCache<T, R> {
	refresher: R,
	clock: Arc<dyn Clock>,
	config: CacheConfig,
	state: RwLock<CacheState<T>>,
	refresh_guard: AsyncMutex<()>,
	metrics: Arc<CacheMetrics>,
}
impl<T, R> ExpiringTokenCache<T, R>
where
	T: ExpiringToken,
	R: TokenRefresher<T>,
{
	/// Creates an empty cache using the system clock.
	pub fn new(refresher: R, config: CacheConfig) -> Result<Self, ConfigError> {
		config.validate()?;

		Ok(Self {
			refresher,
			clock: Arc::new(SystemClock),
			config,
			state: Default::default(),
			refresh_guard: AsyncMutex::new(()),
			metrics: Default::default(),
		})
	}

	/// Replaces the clock used for freshness checks and refresh start times.
	pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
		self.clock = clock;

		self
	}

	/// Settings backing this cache.
	pub fn config(&self) -> &CacheConfig {
		&self.config
	}

	/// Refresher used when the cached token is missing or stale.
	pub fn refresher(&self) -> &R {
		&self.refresher
	}

	/// Shared counters for this cache.
	pub fn metrics(&self) -> &Arc<CacheMetrics> {
		&self.metrics
	}

	/// Returns a valid token, refreshing it first when it is missing or stale.
	pub async fn get_token(&self) -> Result<T> {
		let margin = self.config.margin();
		let observed_refreshes = {
			let state = self.state.read();

			if let Some(token) = state.fresh_token(self.clock.now_millis(), margin) {
				self.record_hit();

				return Ok(token);
			}

			state.completed_refreshes
		};
		let _singleflight = self.refresh_guard.lock().await;
		let stale = {
			let state = self.state.read();

			// Another task may have finished a refresh while this one waited for the guard.
			if let Some(token) = state.fresh_token(self.clock.now_millis(), margin) {
				self.record_hit();

				return Ok(token);
			}
			// A refresh finished while this task queued: share its outcome, even when the new token
			// is already inside the safety margin.
			if state.completed_refreshes != observed_refreshes {
				if let Some(failure) = &state.last_failure {
					return Err(failure.clone());
				}
				if let Some(entry) = &state.entry {
					self.record_hit();

					return Ok(entry.token.clone());
				}
			}

			state.entry.as_ref().map(|entry| entry.token.clone())
		};
		let started_millis = self.clock.now_millis();
		let result = self.refresher.refresh(stale.as_ref()).await;
		let mut state = self.state.write();

		state.completed_refreshes = state.completed_refreshes.wrapping_add(1);

		match result {
			Ok(token) => {
				let expiry_millis = match self.config.interval() {
					Some(interval) => Some(started_millis.saturating_add(interval)),
					None => token.expiry_millis(),
				};

				state.entry = Some(CachedEntry { token: token.clone(), expiry_millis });
				state.last_failure = None;
				self.metrics.record_refresh();
				obs::record_cache_event(CacheEvent::Refresh);

				Ok(token)
			},
			Err(e) => {
				state.last_failure = Some(e.clone());
				self.metrics.record_failure();
				obs::record_cache_event(CacheEvent::Failure);

				Err(e)
			},
		}
	}

	/// Drops the cached token so the next [`get_token`](Self::get_token) refreshes.
	pub fn invalidate(&self) {
		self.state.write().entry = None;
	}

	/// Returns the cached token without checking its freshness.
	pub fn cached(&self) -> Option<T> {
		self.state.read().entry.as_ref().map(|entry| entry.token.clone())
	}

	/// Absolute expiry (Unix milliseconds) of the cached token, after any interval override.
	pub fn cached_expiry_millis(&self) -> Option<i64> {
		self.state.read().entry.as_ref().and_then(|entry| entry.expiry_millis)
	}

	/// Returns `true` while a refresh holds the single-flight guard.
	pub fn is_refreshing(&self) -> bool {
		self.refresh_guard.try_lock().is_none()
	}

	fn record_hit(&self) {
		self.metrics.record_hit();
		obs::record_cache_event(CacheEvent::Hit);
	}
}
impl<T, R> Debug for ExpiringTokenCache<T, R>
where
	T: Debug,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		let state = self.state.read();

		f.debug_struct("ExpiringTokenCache")
			.field("config", &self.config)
			.field("entry", &state.entry)
			.field("completed_refreshes", &state.completed_refreshes)
			.field("metrics", &self.metrics)
			.finish()
	}
}
