use crate::model::{SeriesKind, Snapshot, Vehicle};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

type SnapshotKey = (Vehicle, SeriesKind);

/// Latest-snapshot-per-key cache, shared read-only across all assets.
///
/// `publish` atomically replaces the stored value; `get` hands out the
/// current `Arc` so readers never observe a partially written snapshot.
/// No history is retained beyond the latest snapshot per (vehicle, series).
#[derive(Default)]
pub struct SnapshotCache {
    inner: RwLock<HashMap<SnapshotKey, Arc<Snapshot>>>,
}

impl SnapshotCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the stored snapshot for (vehicle, series) with a new value.
    /// The series is derived from the snapshot payload.
    pub fn publish(&self, vehicle: Vehicle, snapshot: Snapshot) {
        let kind = snapshot.kind();
        let mut map = self.inner.write().unwrap_or_else(std::sync::PoisonError::into_inner);
        map.insert((vehicle, kind), Arc::new(snapshot));
    }

    /// Returns the latest snapshot for (vehicle, series), or `None` when no
    /// update has arrived yet. Never a default value.
    #[must_use]
    pub fn get(&self, vehicle: &Vehicle, kind: SeriesKind) -> Option<Arc<Snapshot>> {
        let map = self.inner.read().unwrap_or_else(std::sync::PoisonError::into_inner);
        map.get(&(vehicle.clone(), kind)).cloned()
    }

    /// Read-only lens scoped to one vehicle, handed to strategy evaluations.
    #[must_use]
    pub fn view<'a>(&'a self, vehicle: &'a Vehicle) -> SnapshotView<'a> {
        SnapshotView {
            cache: self,
            vehicle,
        }
    }
}

/// What one strategy evaluation is allowed to see: the latest snapshots for
/// its own vehicle. Strategies take this instead of the whole cache so they
/// cannot read global process state.
pub struct SnapshotView<'a> {
    cache: &'a SnapshotCache,
    vehicle: &'a Vehicle,
}

impl SnapshotView<'_> {
    #[must_use]
    pub fn vehicle(&self) -> &Vehicle {
        self.vehicle
    }

    #[must_use]
    pub fn quote(&self) -> Option<Arc<Snapshot>> {
        self.cache.get(self.vehicle, SeriesKind::Quote)
    }

    #[must_use]
    pub fn bars(&self) -> Option<Arc<Snapshot>> {
        self.cache.get(self.vehicle, SeriesKind::Bars)
    }

    #[must_use]
    pub fn option_chain(&self) -> Option<Arc<Snapshot>> {
        self.cache.get(self.vehicle, SeriesKind::OptionChain)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::QuoteSnapshot;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn quote(bid: rust_decimal::Decimal) -> Snapshot {
        Snapshot::quote(
            Utc::now(),
            QuoteSnapshot {
                bid,
                ask: bid + dec!(0.02),
                last: bid,
                mark: bid + dec!(0.01),
            },
        )
    }

    #[test]
    fn get_on_unknown_key_is_absent() {
        let cache = SnapshotCache::new();
        let spy = Vehicle::equity("SPY");
        assert!(cache.get(&spy, SeriesKind::Quote).is_none());
        assert!(cache.view(&spy).bars().is_none());
    }

    #[test]
    fn publish_replaces_latest_only() {
        let cache = SnapshotCache::new();
        let spy = Vehicle::equity("SPY");
        cache.publish(spy.clone(), quote(dec!(400)));
        cache.publish(spy.clone(), quote(dec!(401)));

        let latest = cache.get(&spy, SeriesKind::Quote).unwrap();
        assert_eq!(latest.as_quote().unwrap().bid, dec!(401));
    }

    #[test]
    fn series_are_independent_per_vehicle() {
        let cache = SnapshotCache::new();
        let spy = Vehicle::equity("SPY");
        let qqq = Vehicle::equity("QQQ");
        cache.publish(spy.clone(), quote(dec!(400)));
        cache.publish(qqq.clone(), Snapshot::bars(Utc::now(), Vec::new()));

        assert!(cache.get(&spy, SeriesKind::Quote).is_some());
        assert!(cache.get(&spy, SeriesKind::Bars).is_none());
        assert!(cache.get(&qqq, SeriesKind::Bars).is_some());
        assert!(cache.get(&qqq, SeriesKind::Quote).is_none());
    }

    #[test]
    fn published_snapshots_are_shared_not_copied() {
        let cache = SnapshotCache::new();
        let spy = Vehicle::equity("SPY");
        cache.publish(spy.clone(), quote(dec!(400)));
        let a = cache.get(&spy, SeriesKind::Quote).unwrap();
        let b = cache.get(&spy, SeriesKind::Quote).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }
}
