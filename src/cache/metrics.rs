// std
use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters for one token cache.
#[derive(Debug, Default)]
pub struct CacheMetrics {
	hits: AtomicU64,
	refreshes: AtomicU64,
	failures: AtomicU64,
}
impl CacheMetrics {
	/// Returns the number of calls served from the cache without refreshing.
	pub fn hits(&self) -> u64 {
		self.hits.load(Ordering::Relaxed)
	}

	/// Returns the number of refreshes that replaced the cached token.
	pub fn refreshes(&self) -> u64 {
		self.refreshes.load(Ordering::Relaxed)
	}

	/// Returns the number of failed refreshes.
	pub fn failures(&self) -> u64 {
		self.failures.load(Ordering::Relaxed)
	}

	pub(crate) fn record_hit(&self) {
		self.hits.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_refresh(&self) {
		self.refreshes.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_failure(&self) {
		self.failures.fetch_add(1, Ordering::Relaxed);
	}
}
