//! Immutable instrument snapshot with atomic replacement
//!
//! Adapters decode with the instrument definitions on their reader tasks while the
//! refresh timer swaps in a new set. Readers load an `Arc` of the current map and never
//! wait on the writer.

use std::sync::Arc;

use arc_swap::ArcSwap;
use common::{InstrumentId, Venue};
use model::instruments::{Instrument, InstrumentAny};
use rustc_hash::FxHashMap;
use tracing::debug;

type InstrumentMap = FxHashMap<InstrumentId, InstrumentAny>;

/// Shared, lock-free instrument lookup
#[derive(Debug, Default)]
pub struct InstrumentSnapshot {
    current: ArcSwap<InstrumentMap>,
}

impl InstrumentSnapshot {
    /// Creates an empty snapshot
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The current map. Later replacements do not affect the returned `Arc`.
    #[must_use]
    pub fn load(&self) -> Arc<InstrumentMap> {
        self.current.load_full()
    }

    #[must_use]
    pub fn get(&self, instrument_id: &InstrumentId) -> Option<InstrumentAny> {
        self.current.load().get(instrument_id).cloned()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.current.load().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.current.load().is_empty()
    }

    /// Replaces every instrument at once
    pub fn replace(&self, instruments: impl IntoIterator<Item = InstrumentAny>) {
        let map: InstrumentMap = instruments.into_iter().map(|i| (i.id(), i)).collect();
        debug!(count = map.len(), "Replacing instrument snapshot");
        self.current.store(Arc::new(map));
    }

    /// Replaces the instruments of one venue, keeping the others
    pub fn replace_venue(&self, venue: Venue, instruments: impl IntoIterator<Item = InstrumentAny>) {
        let fresh: Vec<InstrumentAny> = instruments.into_iter().collect();
        self.current.rcu(|current| {
            let mut map: InstrumentMap = current
                .iter()
                .filter(|(id, _)| id.venue != venue)
                .map(|(id, i)| (*id, i.clone()))
                .collect();
            map.extend(fresh.iter().map(|i| (i.id(), i.clone())));
            map
        });
    }

    /// Inserts one instrument unless a newer definition is already present.
    ///
    /// Returns whether the snapshot changed.
    pub fn upsert(&self, instrument: InstrumentAny) -> bool {
        let instrument_id = instrument.id();
        let mut changed = false;
        self.current.rcu(|current| {
            let newer_present = current
                .get(&instrument_id)
                .is_some_and(|existing| existing.ts_event() > instrument.ts_event());
            changed = !newer_present;
            if newer_present {
                return Arc::clone(current);
            }
            let mut map = InstrumentMap::clone(current);
            map.insert(instrument_id, instrument.clone());
            Arc::new(map)
        });
        changed
    }
}

#[cfg(test)]
mod tests {
    use common::UnixNanos;
    use model::instruments::stubs::{audusd_sim, btcusdt_binance, ethusdt_perp_binance};

    use super::*;

    #[test]
    fn test_readers_keep_their_snapshot() {
        let snapshot = InstrumentSnapshot::new();
        snapshot.replace([InstrumentAny::from(audusd_sim())]);
        let before = snapshot.load();

        snapshot.replace([
            InstrumentAny::from(btcusdt_binance()),
            InstrumentAny::from(ethusdt_perp_binance()),
        ]);

        assert_eq!(before.len(), 1);
        assert_eq!(snapshot.len(), 2);
        assert!(snapshot.get(&audusd_sim().id()).is_none());
    }

    #[test]
    fn test_replace_venue_keeps_other_venues() {
        let snapshot = InstrumentSnapshot::new();
        snapshot.replace([
            InstrumentAny::from(audusd_sim()),
            InstrumentAny::from(btcusdt_binance()),
        ]);

        snapshot.replace_venue(Venue::from("BINANCE"), [InstrumentAny::from(ethusdt_perp_binance())]);

        assert!(snapshot.get(&audusd_sim().id()).is_some());
        assert!(snapshot.get(&btcusdt_binance().id()).is_none());
        assert!(snapshot.get(&ethusdt_perp_binance().id()).is_some());
    }

    #[test]
    fn test_upsert_is_last_writer_wins_by_ts_event() {
        let snapshot = InstrumentSnapshot::new();
        let mut newer = audusd_sim();
        newer.core.ts_event = UnixNanos::from(10);
        let mut older = audusd_sim();
        older.core.ts_event = UnixNanos::from(5);

        assert!(snapshot.upsert(newer.into()));
        assert!(!snapshot.upsert(older.into()));
        assert_eq!(
            snapshot.get(&audusd_sim().id()).unwrap().ts_event(),
            UnixNanos::from(10)
        );
    }
}
