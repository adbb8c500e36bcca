//! Optional observability helpers for sign-in calls and the token cache.
//!
//! # Feature Flags
//!
//! - Enable `tracing` to emit structured spans named `token_acquirer.sign_in` with the `grant`
//!   and `stage` fields (`retries`, `outcome`, and `status` are filled in once the call settles),
//!   plus debug events for every scheduled retry.
//! - Enable `metrics` to increment `token_acquirer_sign_in_total` (labeled by `grant` +
//!   `outcome`), `token_acquirer_retry_total`, and `token_acquirer_cache_total` (labeled by
//!   `event`).

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Outcome labels recorded for each sign-in call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SignInOutcome {
	/// Entry to [`TokenClient::sign_in`](crate::client::TokenClient::sign_in).
	Attempt,
	/// A token was issued.
	Success,
	/// An error was returned to the caller.
	Failure,
}
impl SignInOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			SignInOutcome::Attempt => "attempt",
			SignInOutcome::Success => "success",
			SignInOutcome::Failure => "failure",
		}
	}
}
impl Display for SignInOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Token cache events.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CacheEvent {
	/// A fresh cached token was returned without refreshing.
	Hit,
	/// A refresh completed and replaced the cached token.
	Refresh,
	/// A refresh failed; the previous entry was kept.
	Failure,
}
impl CacheEvent {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			CacheEvent::Hit => "hit",
			CacheEvent::Refresh => "refresh",
			CacheEvent::Failure => "failure",
		}
	}
}
impl Display for CacheEvent {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
