// self
use crate::{
	_prelude::*,
	auth::GrantType,
	obs::{CacheEvent, SignInOutcome},
};

/// Records a sign-in outcome via the global metrics recorder (when enabled).
pub fn record_sign_in_outcome(grant: GrantType, outcome: SignInOutcome) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!(
			"token_acquirer_sign_in_total",
			"grant" => grant.as_str(),
			"outcome" => outcome.as_str()
		)
		.increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = (grant, outcome);
	}
}

/// Records a scheduled retry; `retry` is the 1-based retry number about to run.
pub fn record_retry(retry: u32, delay: Duration, reason: String) {
	#[cfg(feature = "tracing")]
	{
		tracing::debug!(
			retry,
			delay_ms = i64::try_from(delay.whole_milliseconds()).unwrap_or(i64::MAX),
			reason = reason.as_str(),
			"Retrying token request."
		);
	}
	#[cfg(feature = "metrics")]
	{
		metrics::counter!("token_acquirer_retry_total").increment(1);
	}

	#[cfg(not(feature = "tracing"))]
	{
		let _ = (retry, delay, reason);
	}
}

/// Records a rejected refresh token that forced a fresh sign-in with the base grant.
pub fn record_refresh_fallback(status: Option<u16>) {
	#[cfg(feature = "tracing")]
	{
		tracing::debug!(status, "Refresh token rejected; signing in with the base grant.");
	}
	#[cfg(feature = "metrics")]
	{
		metrics::counter!("token_acquirer_refresh_fallback_total").increment(1);
	}

	#[cfg(not(feature = "tracing"))]
	{
		let _ = status;
	}
}

/// Records a token cache event via the global metrics recorder (when enabled).
pub fn record_cache_event(event: CacheEvent) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!("token_acquirer_cache_total", "event" => event.as_str()).increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = event;
	}
}
