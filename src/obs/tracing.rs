// self
use crate::{
	_prelude::*,
	auth::GrantType,
	obs::{self, SignInOutcome},
};

/// Type alias that resolves to an instrumented future when tracing is enabled.
#[cfg(feature = "tracing")]
pub type InstrumentedSignIn<F> = tracing::instrument::Instrumented<F>;
/// Passthrough future type when tracing is disabled.
#[cfg(not(feature = "tracing"))]
pub type InstrumentedSignIn<F> = F;

/// Span wrapping one logical sign-in call.
///
/// Opens with the `grant` and `stage` fields. `retries`, `outcome` and `status` stay empty until
/// the call settles. Opening the span counts an attempt; [`SignInSpan::record_outcome`] counts
/// the matching success or failure.
#[derive(Clone, Debug)]
pub struct SignInSpan {
	grant: GrantType,
	#[cfg(feature = "tracing")]
	span: tracing::Span,
}
impl SignInSpan {
	/// Opens a span for `grant` at `stage`.
	pub fn new(grant: GrantType, stage: &'static str) -> Self {
		obs::record_sign_in_outcome(grant, SignInOutcome::Attempt);

		#[cfg(feature = "tracing")]
		{
			use tracing::field::Empty;

			let span = tracing::info_span!(
				"token_acquirer.sign_in",
				grant = grant.as_str(),
				stage,
				retries = Empty,
				outcome = Empty,
				status = Empty
			);

			Self { grant, span }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = stage;

			Self { grant }
		}
	}

	/// Grant this span was opened for.
	pub fn grant(&self) -> GrantType {
		self.grant
	}

	/// Records how many retries ran before the final attempt.
	pub fn record_retries(&self, retries: u32) {
		#[cfg(feature = "tracing")]
		{
			self.span.record("retries", retries);
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = retries;
		}
	}

	/// Settles the call: tags the span with its outcome (and the HTTP status of status failures)
	/// and bumps the sign-in counter.
	pub fn record_outcome<T>(&self, result: &Result<T>) {
		let outcome = match result {
			Ok(_) => SignInOutcome::Success,
			Err(_) => SignInOutcome::Failure,
		};

		#[cfg(feature = "tracing")]
		{
			self.span.record("outcome", outcome.as_str());

			if let Some(status) = result.as_ref().err().and_then(Error::status) {
				self.span.record("status", status);
			}
		}

		obs::record_sign_in_outcome(self.grant, outcome);
	}

	/// Instruments an async block without holding a guard across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> InstrumentedSignIn<Fut>
	where
		Fut: Future,
	{
		#[cfg(feature = "tracing")]
		{
			use tracing::Instrument;

			fut.instrument(self.span.clone())
		}
		#[cfg(not(feature = "tracing"))]
		{
			fut
		}
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::error::{ErrorBody, HttpStatusError};

	#[tokio::test]
	async fn instrument_passes_the_output_through() {
		let span = SignInSpan::new(GrantType::RefreshToken, "instrument_passes_the_output_through");
		let value = span.instrument(async { 42 }).await;

		assert_eq!(value, 42);
		assert_eq!(span.grant(), GrantType::RefreshToken);
	}

	#[test]
	fn settling_accepts_both_outcomes() {
		let span = SignInSpan::new(GrantType::Password, "settle");
		let failure: Result<()> = Err(Error::Server(HttpStatusError {
			status: 503,
			body: ErrorBody::Raw(String::new()),
		}));

		span.record_retries(2);
		span.record_outcome(&failure);
		span.record_outcome(&Ok::<_, Error>(()));
	}
}
