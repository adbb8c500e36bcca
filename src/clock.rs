//! Time sources for signing, expiry checks, and retry scheduling.
//!
//! Components receive an explicit [`Clock`] instead of reading the system time directly, which
//! lets a [`DriftCorrectedClock`] shift signed timestamps and expiry checks together and lets
//! tests drive time with a [`ManualClock`].

// std
use std::sync::atomic::{AtomicI64, Ordering};
// crates.io
use time::format_description::well_known::Rfc2822;
// self
use crate::_prelude::*;

/// Boxed future returned by [`Clock::sleep`].
pub type SleepFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

/// Source of the current time plus a scheduling primitive.
pub trait Clock
where
	Self: Send + Sync,
{
	/// Current instant according to this clock.
	fn now(&self) -> OffsetDateTime;

	/// Suspends the calling task for `duration`.
	fn sleep(&self, duration: Duration) -> SleepFuture;

	/// Current instant as Unix milliseconds.
	fn now_millis(&self) -> i64 {
		unix_millis(self.now())
	}
}
impl<C> Clock for Arc<C>
where
	C: ?Sized + Clock,
{
	fn now(&self) -> OffsetDateTime {
		(**self).now()
	}

	fn sleep(&self, duration: Duration) -> SleepFuture {
		(**self).sleep(duration)
	}

	fn now_millis(&self) -> i64 {
		(**self).now_millis()
	}
}

/// Wall clock backed by the system time; sleeps on the tokio timer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SystemClock;
impl Clock for SystemClock {
	fn now(&self) -> OffsetDateTime {
		OffsetDateTime::now_utc()
	}

	fn sleep(&self, duration: Duration) -> SleepFuture {
		let duration = StdDuration::try_from(duration).unwrap_or(StdDuration::ZERO);

		Box::pin(tokio::time::sleep(duration))
	}
}

/// Decorator that adds a correctable offset to another clock.
///
/// The offset is shared by every reader and updated atomically, so a correction applied while
/// requests are in flight changes signed timestamps and expiry checks consistently.
#[derive(Debug, Default)]
pub struct DriftCorrectedClock<C = SystemClock> {
	inner: C,
	offset_millis: AtomicI64,
}
impl<C> DriftCorrectedClock<C>
where
	C: Clock,
{
	/// Wraps `inner` with a zero offset.
	pub fn new(inner: C) -> Self {
		Self { inner, offset_millis: AtomicI64::new(0) }
	}

	/// Offset currently applied on top of the inner clock.
	pub fn offset(&self) -> Duration {
		Duration::milliseconds(self.offset_millis.load(Ordering::Acquire))
	}

	/// Replaces the applied offset.
	pub fn set_offset(&self, offset: Duration) {
		let millis = i64::try_from(offset.whole_milliseconds()).unwrap_or(if offset.is_negative() {
			i64::MIN
		} else {
			i64::MAX
		});

		self.offset_millis.store(millis, Ordering::Release);
	}

	/// Aligns this clock with an authoritative reading (for example, a server's time).
	pub fn correct_to(&self, authoritative: OffsetDateTime) {
		self.set_offset(authoritative - self.inner.now());
	}

	/// Aligns this clock with an RFC 2822 `Date` header value.
	///
	/// Returns `false` and leaves the offset untouched when the value cannot be parsed.
	pub fn correct_from_http_date(&self, value: &str) -> bool {
		match OffsetDateTime::parse(value.trim(), &Rfc2822) {
			Ok(moment) => {
				self.correct_to(moment);

				true
			},
			Err(_) => false,
		}
	}
}
impl<C> Clock for DriftCorrectedClock<C>
where
	C: Clock,
{
	fn now(&self) -> OffsetDateTime {
		self.inner.now() + self.offset()
	}

	fn sleep(&self, duration: Duration) -> SleepFuture {
		self.inner.sleep(duration)
	}
}

/// Deterministic clock for tests; sleeping advances virtual time instantly.
#[derive(Debug, Default)]
pub struct ManualClock {
	now_millis: AtomicI64,
	sleeps: Mutex<Vec<Duration>>,
}
impl ManualClock {
	/// Creates a clock frozen at `now_millis` (Unix milliseconds).
	pub fn new(now_millis: i64) -> Self {
		Self { now_millis: AtomicI64::new(now_millis), sleeps: Default::default() }
	}

	/// Moves the clock to `now_millis`.
	pub fn set_millis(&self, now_millis: i64) {
		self.now_millis.store(now_millis, Ordering::Release);
	}

	/// Advances the clock by `duration`.
	pub fn advance(&self, duration: Duration) {
		self.now_millis.fetch_add(clamp_millis(duration), Ordering::AcqRel);
	}

	/// Durations passed to [`Clock::sleep`] so far, in call order.
	pub fn sleeps(&self) -> Vec<Duration> {
		self.sleeps.lock().clone()
	}
}
impl Clock for ManualClock {
	fn now(&self) -> OffsetDateTime {
		from_unix_millis(self.now_millis.load(Ordering::Acquire))
	}

	fn sleep(&self, duration: Duration) -> SleepFuture {
		self.sleeps.lock().push(duration);
		self.advance(duration);

		Box::pin(std::future::ready(()))
	}

	fn now_millis(&self) -> i64 {
		self.now_millis.load(Ordering::Acquire)
	}
}

/// Converts an instant into Unix milliseconds, saturating at the `i64` bounds.
pub fn unix_millis(instant: OffsetDateTime) -> i64 {
	let millis = instant.unix_timestamp_nanos() / 1_000_000;

	i64::try_from(millis).unwrap_or(if millis.is_negative() { i64::MIN } else { i64::MAX })
}

fn from_unix_millis(millis: i64) -> OffsetDateTime {
	OffsetDateTime::from_unix_timestamp_nanos(i128::from(millis) * 1_000_000)
		.unwrap_or(OffsetDateTime::UNIX_EPOCH)
}

fn clamp_millis(duration: Duration) -> i64 {
	i64::try_from(duration.whole_milliseconds()).unwrap_or(if duration.is_negative() {
		i64::MIN
	} else {
		i64::MAX
	})
}
