use crate::domain::{hex_key, OrderDigest};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::time::{Duration, Instant};
use tracing::debug;

/// Time-windowed set of digests that already have a fill in flight
///
/// A digest stays reserved for `window` after [`DedupTracker::try_reserve`]
/// succeeded, or until [`DedupTracker::release`] drops it after a failed fill.
///
/// Expired reservations are purged lazily on every reservation attempt. An
/// expired entry is treated as absent even before it is purged.
///
/// State is process-local. Two relayer processes sharing no store can both
/// fill the same order; run a single scheduler.
#[derive(Debug)]
pub struct DedupTracker {
    reservations: DashMap<OrderDigest, Instant>,
    window: Duration,
}

impl DedupTracker {
    pub fn new(window: Duration) -> Self {
        Self {
            reservations: DashMap::new(),
            window,
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Reserve `digest` for one fill attempt.
    ///
    /// Returns `true` when a live reservation already exists (do not proceed),
    /// `false` when this call took the reservation. The lookup and insert run
    /// under the digest's shard lock, so concurrent callers for the same digest
    /// cannot both get `false`.
    pub fn try_reserve(&self, digest: OrderDigest) -> bool {
        self.try_reserve_at(digest, Instant::now())
    }

    pub(crate) fn try_reserve_at(&self, digest: OrderDigest, now: Instant) -> bool {
        self.purge_expired(now);

        match self.reservations.entry(digest) {
            Entry::Occupied(mut entry) => {
                if self.is_live(*entry.get(), now) {
                    true
                } else {
                    entry.insert(now);
                    false
                }
            }
            Entry::Vacant(entry) => {
                entry.insert(now);
                false
            }
        }
    }

    /// Drop any reservation for `digest` so the next batch may retry it.
    pub fn release(&self, digest: OrderDigest) -> bool {
        let removed = self.reservations.remove(&digest).is_some();
        if removed {
            debug!(digest = %hex_key(&digest), "Released dedup reservation");
        }
        removed
    }

    pub fn is_reserved(&self, digest: OrderDigest) -> bool {
        self.is_reserved_at(digest, Instant::now())
    }

    pub(crate) fn is_reserved_at(&self, digest: OrderDigest, now: Instant) -> bool {
        self.reservations
            .get(&digest)
            .is_some_and(|reserved_at| self.is_live(*reserved_at, now))
    }

    /// Number of live reservations
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.reservations
            .iter()
            .filter(|entry| self.is_live(*entry.value(), now))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn purge_expired(&self, now: Instant) {
        self.reservations
            .retain(|_, reserved_at| self.is_live(*reserved_at, now));
    }

    // Live while reserved_at + window > now.
    fn is_live(&self, reserved_at: Instant, now: Instant) -> bool {
        now.saturating_duration_since(reserved_at) < self.window
    }
}

impl Default for DedupTracker {
    fn default() -> Self {
        Self::new(Duration::from_millis(crate::config::DEFAULT_DEDUP_WINDOW_MS))
    }
}
