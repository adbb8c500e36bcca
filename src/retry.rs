//! Retry policies and the executor that drives one logical token-endpoint call.
//!
//! Each attempt records either a response or a transport error in a [`RetryContext`]; the policy
//! inspects it to decide whether to retry and how long to wait. Waiting goes through the
//! configured [`Clock`], so only the task that owns the retry sequence is suspended.

// std
use std::convert::Infallible;
// crates.io
use oauth2::HttpResponse;
use rand::Rng;
// self
use crate::{
	_prelude::*,
	clock::Clock,
	error::{ConfigError, TransportError},
	obs,
};

/// Largest exponent used when computing backoff factors.
pub const MAX_BACKOFF_EXPONENT: u32 = 30;

/// Outcome of the latest attempt.
#[derive(Debug)]
pub enum Attempt {
	/// The transport produced a response (any status).
	Response(HttpResponse),
	/// The transport failed before a response arrived.
	Error(TransportError),
}
impl From<Result<HttpResponse, TransportError>> for Attempt {
	fn from(result: Result<HttpResponse, TransportError>) -> Self {
		match result {
			Ok(response) => Self::Response(response),
			Err(error) => Self::Error(error),
		}
	}
}

/// Mutable state for one logical call; owned by [`RetryExecutor::execute`].
#[derive(Debug, Default)]
pub struct RetryContext {
	retry_count: u32,
	last: Option<Attempt>,
	last_started_millis: i64,
}
impl RetryContext {
	/// Number of retries performed so far (the first attempt is not a retry).
	pub fn retry_count(&self) -> u32 {
		self.retry_count
	}

	/// Response from the latest attempt, if it produced one.
	pub fn last_response(&self) -> Option<&HttpResponse> {
		match &self.last {
			Some(Attempt::Response(response)) => Some(response),
			_ => None,
		}
	}

	/// Transport error from the latest attempt, if it failed.
	pub fn last_error(&self) -> Option<&TransportError> {
		match &self.last {
			Some(Attempt::Error(error)) => Some(error),
			_ => None,
		}
	}

	/// Returns `true` when the latest outcome is a 5xx response or a retryable transport error.
	pub fn is_retryable(&self) -> bool {
		match &self.last {
			Some(Attempt::Response(response)) => response.status().as_u16() >= 500,
			Some(Attempt::Error(error)) => error.is_retryable(),
			None => false,
		}
	}

	/// Records a response, clearing any previous error.
	pub fn record_response(&mut self, response: HttpResponse) {
		self.last = Some(Attempt::Response(response));
	}

	/// Records a transport error, clearing any previous response.
	pub fn record_error(&mut self, error: TransportError) {
		self.last = Some(Attempt::Error(error));
	}

	fn finish(self) -> RetryOutcome {
		let result = match self.last {
			Some(Attempt::Response(response)) => Ok(response),
			Some(Attempt::Error(error)) => Err(error),
			None => Err(TransportError::from(std::io::Error::other("No attempt was executed."))),
		};

		RetryOutcome {
			retry_count: self.retry_count,
			last_started_millis: self.last_started_millis,
			result,
		}
	}
}

/// Final result of [`RetryExecutor::execute`].
#[derive(Debug)]
pub struct RetryOutcome {
	/// Retries performed before the sequence ended.
	pub retry_count: u32,
	/// Clock reading (Unix milliseconds) taken right before the final attempt ran.
	pub last_started_millis: i64,
	/// Last response (possibly a non-2xx status) or last transport error.
	pub result: Result<HttpResponse, TransportError>,
}

/// Decides whether and when to retry.
pub trait RetryPolicy
where
	Self: Send + Sync + Debug,
{
	/// Returns `true` when another attempt should be made.
	fn should_retry(&self, ctx: &RetryContext) -> bool;

	/// Delay before the next attempt.
	fn next_retry_interval(&self, ctx: &RetryContext) -> Duration;
}

/// Policy that never retries.
#[derive(Clone, Copy, Debug, Default)]
pub struct NeverRetry;
impl RetryPolicy for NeverRetry {
	fn should_retry(&self, _ctx: &RetryContext) -> bool {
		false
	}

	fn next_retry_interval(&self, _ctx: &RetryContext) -> Duration {
		Duration::ZERO
	}
}

/// Serializable settings for [`ExponentialBackoffPolicy`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
	/// Retries allowed after the first attempt.
	pub max_number_of_retries: u32,
	/// Unit interval multiplied by the jittered factor.
	pub base_interval_millis: u64,
	/// Upper bound for the backoff factor.
	pub max_retry_factor: u32,
}
impl Default for RetryConfig {
	fn default() -> Self {
		Self { max_number_of_retries: 3, base_interval_millis: 200, max_retry_factor: 32 }
	}
}

/// Exponential backoff with full jitter.
///
/// For retry count `n` the factor is `min(2^min(n, 30), max_retry_factor)` and the delay is
/// `base_interval * uniform(0..=factor)`, so every delay lies in
/// `[0, base_interval * max_retry_factor]`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExponentialBackoffPolicy {
	config: RetryConfig,
}
impl ExponentialBackoffPolicy {
	/// Validates `config` and builds the policy.
	pub fn new(config: RetryConfig) -> Result<Self, ConfigError> {
		if config.max_retry_factor == 0 {
			return Err(ConfigError::InvalidSetting {
				setting: "max_retry_factor",
				reason: "must be at least 1".into(),
			});
		}
		if i64::try_from(config.base_interval_millis).is_err() {
			return Err(ConfigError::InvalidSetting {
				setting: "base_interval_millis",
				reason: "exceeds the supported range".into(),
			});
		}

		Ok(Self { config })
	}

	/// Settings backing this policy.
	pub fn config(&self) -> &RetryConfig {
		&self.config
	}

	/// Backoff factor ceiling for the given retry count.
	pub fn max_factor(&self, retry_count: u32) -> u64 {
		let exponent = retry_count.min(MAX_BACKOFF_EXPONENT);

		(1_u64 << exponent).min(u64::from(self.config.max_retry_factor))
	}

	/// Jittered interval in milliseconds for the given retry count.
	pub fn interval_millis(&self, retry_count: u32) -> u64 {
		let factor = rand::rng().random_range(0..=self.max_factor(retry_count));

		self.config.base_interval_millis.saturating_mul(factor)
	}
}
impl Default for ExponentialBackoffPolicy {
	fn default() -> Self {
		Self { config: RetryConfig::default() }
	}
}
impl RetryPolicy for ExponentialBackoffPolicy {
	fn should_retry(&self, ctx: &RetryContext) -> bool {
		ctx.retry_count < self.config.max_number_of_retries && ctx.is_retryable()
	}

	fn next_retry_interval(&self, ctx: &RetryContext) -> Duration {
		let millis = self.interval_millis(ctx.retry_count);

		Duration::milliseconds(i64::try_from(millis).unwrap_or(i64::MAX))
	}
}

/// Runs an operation under a [`RetryPolicy`], sleeping on a [`Clock`] between attempts.
#[derive(Clone)]
pub struct RetryExecutor {
	policy: Arc<dyn RetryPolicy>,
	clock: Arc<dyn Clock>,
}
impl RetryExecutor {
	/// Creates an executor.
	pub fn new(policy: Arc<dyn RetryPolicy>, clock: Arc<dyn Clock>) -> Self {
		Self { policy, clock }
	}

	/// Policy consulted after each attempt.
	pub fn policy(&self) -> &Arc<dyn RetryPolicy> {
		&self.policy
	}

	/// Executes `attempt` until it succeeds, hits a terminal outcome, or exhausts the policy.
	///
	/// On exhaustion the last transport error is returned, or the last response as-is; mapping a
	/// persistent 5xx into a failure is left to the caller.
	pub async fn execute<F, Fut>(&self, mut attempt: F) -> RetryOutcome
	where
		F: FnMut() -> Fut,
		Fut: Future<Output = Result<HttpResponse, TransportError>>,
	{
		let outcome = self
			.try_execute(|| {
				let fut = attempt();

				async move { Ok::<_, Infallible>(Attempt::from(fut.await)) }
			})
			.await;

		match outcome {
			Ok(outcome) => outcome,
			Err(never) => match never {},
		}
	}

	/// Like [`execute`](Self::execute), but an attempt may abort the whole sequence with `Err`.
	///
	/// Aborts skip the policy entirely; the error is handed back without another attempt.
	pub async fn try_execute<F, Fut, E>(&self, mut attempt: F) -> Result<RetryOutcome, E>
	where
		F: FnMut() -> Fut,
		Fut: Future<Output = Result<Attempt, E>>,
	{
		let mut ctx = RetryContext::default();

		loop {
			ctx.last_started_millis = self.clock.now_millis();
			ctx.last = Some(attempt().await?);

			if !self.policy.should_retry(&ctx) {
				return Ok(ctx.finish());
			}

			let delay = self.policy.next_retry_interval(&ctx);

			obs::record_retry(ctx.retry_count + 1, delay, retry_reason(&ctx));
			self.clock.sleep(delay).await;

			ctx.retry_count += 1;
		}
	}
}
impl Debug for RetryExecutor {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("RetryExecutor").field("policy", &self.policy).finish()
	}
}

fn retry_reason(ctx: &RetryContext) -> String {
	match (ctx.last_response(), ctx.last_error()) {
		(Some(response), _) => format!("HTTP {}", response.status().as_u16()),
		(_, Some(error)) => error.to_string(),
		_ => String::new(),
	}
}
